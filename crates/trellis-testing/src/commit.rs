use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use trellis_core::{ChildrenDiff, Committer, RenderCx, Result, Ui};
use trellis_macros::component;

struct TestCommitData {
    value: String,
    children: Vec<TestCommit>,
}

/// Commit value of [`TestCommitter`]. Amends patch it in place, so two
/// handles are equal exactly when they share the same value.
#[derive(Clone)]
pub struct TestCommit(Rc<RefCell<TestCommitData>>);

impl TestCommit {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Rc::new(RefCell::new(TestCommitData {
            value: value.into(),
            children: Vec::new(),
        })))
    }

    pub fn value(&self) -> String {
        self.0.borrow().value.clone()
    }

    /// The children recorded by the last `amend_children`.
    pub fn children(&self) -> Vec<TestCommit> {
        self.0.borrow().children.clone()
    }
}

impl PartialEq for TestCommit {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for TestCommit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();
        if data.children.is_empty() {
            write!(f, "{:?}", data.value)
        } else {
            f.debug_tuple(&data.value).field(&data.children).finish()
        }
    }
}

/// How often each [`Committer`] method ran.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CommitCounts {
    pub initial: u32,
    pub amend: u32,
    pub children: u32,
}

/// Committer whose values spell out their own history: `initial` commits the
/// data, every `amend` appends `|data` and every children update appends `*`.
#[derive(Debug)]
pub struct TestCommitter {
    data: String,
    last: Option<TestCommit>,
    counts: CommitCounts,
}

impl TestCommitter {
    pub fn new(data: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            last: None,
            counts: CommitCounts::default(),
        }
    }

    pub fn data(&self) -> &str {
        &self.data
    }

    pub fn set_data(&mut self, data: impl Into<String>) {
        self.data = data.into();
    }

    /// The value produced by the last completed commit.
    pub fn last_commit(&self) -> Option<TestCommit> {
        self.last.clone()
    }

    pub fn counts(&self) -> CommitCounts {
        self.counts
    }
}

impl Committer for TestCommitter {
    type Commit = TestCommit;

    fn initial(&mut self) -> Result<TestCommit> {
        self.counts.initial += 1;
        Ok(TestCommit::new(self.data.clone()))
    }

    fn amend(&mut self, last: TestCommit) -> Result<TestCommit> {
        self.counts.amend += 1;
        {
            let mut data = last.0.borrow_mut();
            data.value = format!("{}|{}", data.value, self.data);
        }
        Ok(last)
    }

    fn amend_children(&mut self, commit: TestCommit, diff: &ChildrenDiff<TestCommit>) -> Result<TestCommit> {
        self.counts.children += 1;
        {
            let mut data = commit.0.borrow_mut();
            data.value.push('*');
            data.children = diff.children().to_vec();
        }
        self.last = Some(commit.clone());
        Ok(commit)
    }
}

/// A [`TestCommitter`] node that renders `children` below itself. Every
/// render hands the committer `data` again and marks it for a recommit.
#[component(stateful)]
pub fn committer(cx: &mut RenderCx<'_>, data: &'static str, children: Ui) -> Result<Ui> {
    let handle = cx.committer(|| TestCommitter::new(data))?;
    handle.update(|committer| committer.set_data(data));
    Ok(children)
}

/// Renders `commit` as indented text, one value per line.
pub fn dump_commit(commit: &TestCommit) -> String {
    let mut output = String::new();
    dump_commit_into(commit, 0, &mut output);
    output
}

fn dump_commit_into(commit: &TestCommit, depth: usize, output: &mut String) {
    output.push_str(&"  ".repeat(depth));
    output.push_str(&commit.value());
    output.push('\n');
    for child in commit.children() {
        dump_commit_into(&child, depth + 1, output);
    }
}
