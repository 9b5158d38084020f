use crate::context::RenderCx;
use crate::error::Result;
use crate::instrumentation::BUILD_RATE;
use crate::node::{AppNode, DirtyState, Parent};
use crate::ui::Ui;

/// Brings `node`'s subtree up to date, visiting only what its dirty flags
/// ask for.
pub(crate) fn build(node: &AppNode) -> Result<()> {
    match node.dirty() {
        DirtyState::Clean => {
            BUILD_RATE.with(|rate| rate.skip());
            Ok(())
        }
        DirtyState::ChildrenOnly => {
            BUILD_RATE.with(|rate| rate.skip());
            node.set_dirty(DirtyState::Clean);
            for child in node.children().into_iter().flatten() {
                build(&child)?;
            }
            Ok(())
        }
        DirtyState::SelfAndChildren => force_build(node),
    }
}

fn force_build(node: &AppNode) -> Result<()> {
    BUILD_RATE.with(|rate| rate.hit());
    // Reset first: a rebuild requested while rendering belongs to the next pass.
    node.set_dirty(DirtyState::Clean);

    let descriptor = node.descriptor();
    let mut cx = RenderCx::new(node, &descriptor);
    let ui = descriptor.render(&mut cx)?;
    cx.finish()?;

    let produced = match &ui {
        Ui::Multi(items) => build_multi(node, items, 0)?,
        single => {
            build_child(node, 0, single)?;
            1
        }
    };
    node.truncate_children(produced);
    Ok(())
}

/// Lays nested sequences out flat in `node`'s children, starting at
/// `start_at`. Returns how many positions were filled.
fn build_multi(node: &AppNode, items: &[Ui], start_at: usize) -> Result<usize> {
    let mut traversed = 0;
    for item in items {
        match item {
            Ui::Multi(nested) => {
                traversed += build_multi(node, nested, start_at + traversed)?;
            }
            leaf => {
                build_child(node, start_at + traversed, leaf)?;
                traversed += 1;
            }
        }
    }
    Ok(traversed)
}

fn build_child(parent: &AppNode, index: usize, ui: &Ui) -> Result<()> {
    let descriptor = match ui {
        Ui::Single(descriptor) => descriptor,
        Ui::Empty | Ui::Multi(_) => {
            parent.set_child(index, None);
            return Ok(());
        }
    };

    match parent.child(index) {
        Some(existing) if existing.descriptor().is_same_type(descriptor) => {
            // An unchanged descriptor was passed through from above; leave the
            // child to its own dirty flag.
            if !existing.descriptor().ptr_eq(descriptor) {
                existing.set_descriptor(descriptor.clone());
                existing.needs_build();
            }
            build(&existing)
        }
        _ => {
            let child = AppNode::new_child(descriptor.clone(), parent);
            parent.set_child(index, Some(child.clone()));
            build(&child)
        }
    }
}

impl AppNode {
    /// Marks this node for a re-render and schedules a pass on its root.
    ///
    /// Ancestors are only marked as having dirty children, so nothing outside
    /// the path from the root to this node renders again. Calling this on a
    /// node that was discarded from the tree does nothing.
    pub fn rebuild(&self) -> Result<()> {
        if self.is_detached() {
            log::debug!("ignoring rebuild of detached `{}`", self.name());
            return Ok(());
        }
        self.needs_build();
        let mut current = self.clone();
        loop {
            match current.parent_link() {
                Parent::Root => return current.schedule_rebuild(),
                Parent::Node(parent) => {
                    parent.needs_children_build();
                    current = parent;
                }
                Parent::Detached => {
                    log::debug!(
                        "ignoring rebuild of `{}`: ancestor `{}` is detached",
                        self.name(),
                        current.name()
                    );
                    return Ok(());
                }
            }
        }
    }
}
