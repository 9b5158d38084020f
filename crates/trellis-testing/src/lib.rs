//! Testing utilities and harness for Trellis

mod commit;
mod frames;

use std::fmt::Write as _;
use std::rc::Rc;

use thiserror::Error;
use trellis_core::{
    find_descendant_of_type, run_with, App, AppNode, Committer, Component, ComponentType, RunConfig,
    Ui,
};

pub use commit::{committer, dump_commit, CommitCounts, TestCommit, TestCommitter};
pub use frames::ManualFrames;

pub mod prelude {
    pub use crate::{
        committer, create_ref, dump_commit, dump_tree, ManualFrames, RefBody, TestCommit,
        TestCommitter, TestTree,
    };
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HarnessError {
    #[error("there was no scheduled rebuild")]
    NoScheduledFrame,
    #[error("no node of component `{name}` in the tree")]
    NotFound { name: &'static str },
    #[error("the root committer has not committed yet")]
    NoCommit,
    #[error(transparent)]
    Pass(#[from] trellis_core::Error),
}

/// Lazily evaluated children of a ref component.
pub type RefBody = Rc<dyn Fn() -> Ui>;

/// A stateful pass-through component, for finding a subtree by type and
/// rebuilding it. Each call issues a new component type.
pub fn create_ref(name: &'static str) -> Component<RefBody> {
    Component::stateful(name, |cx, body: &RefBody| {
        cx.state(|| ())?;
        Ok(body())
    })
}

/// Renders the subtree as indented text. Nodes holding state are marked
/// with `*`; [`TestCommitter`] nodes show their last commit value.
pub fn dump_tree(node: &AppNode) -> String {
    let mut output = String::new();
    dump_node(node, 0, &mut output);
    output
}

fn dump_node(node: &AppNode, depth: usize, output: &mut String) {
    let indent = "  ".repeat(depth);
    let _ = write!(output, "{indent}{}", node.name());
    if node.has_state() {
        output.push('*');
    }
    if let Ok(Some(commit)) = node.commit_value::<TestCommit>() {
        let _ = write!(output, " = {}", commit.value());
    }
    output.push('\n');
    for child in node.children() {
        match child {
            Some(child) => dump_node(&child, depth + 1, output),
            None => {
                let _ = writeln!(output, "{indent}  -");
            }
        }
    }
}

/// A running tree whose passes only happen when the test steps a frame.
pub struct TestTree {
    root: AppNode,
    frames: ManualFrames,
}

impl TestTree {
    /// Runs the first pass synchronously, then installs [`ManualFrames`].
    pub fn new<C: Committer>(app: impl App, root_committer: C) -> Result<Self, HarnessError> {
        let frames = ManualFrames::new();
        let config = RunConfig::default().frames(frames.clone());
        let root = run_with(app, root_committer, config)?;
        Ok(Self { root, frames })
    }

    pub fn root(&self) -> &AppNode {
        &self.root
    }

    pub fn frames(&self) -> &ManualFrames {
        &self.frames
    }

    pub fn next_frame(&self) -> Result<(), HarnessError> {
        self.frames.next_frame()
    }

    pub fn find(&self, ty: ComponentType) -> Result<AppNode, HarnessError> {
        find_descendant_of_type(&self.root, ty).ok_or(HarnessError::NotFound { name: ty.name() })
    }

    /// Marks the first node of type `ty` for rebuilding.
    pub fn rebuild(&self, ty: ComponentType) -> Result<(), HarnessError> {
        self.find(ty)?.rebuild()?;
        Ok(())
    }

    /// The root committer's value, for roots built with a [`TestCommitter`].
    pub fn root_commit(&self) -> Result<TestCommit, HarnessError> {
        self.root
            .commit_value::<TestCommit>()?
            .ok_or(HarnessError::NoCommit)
    }

    pub fn dump_tree(&self) -> String {
        dump_tree(&self.root)
    }
}

impl std::fmt::Debug for TestTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestTree")
            .field("root", &self.root)
            .field("frames", &self.frames)
            .finish()
    }
}
