//! The commit tree: backend values derived from the build tree.
//!
//! Only nodes that own a committer take part. Build-only nodes in between are
//! walked through transparently, so a committer sees the commit values of its
//! nearest committer descendants as a flat, ordered child list.

use std::any::{self, Any};
use std::cell::{Cell, RefCell};
use std::fmt;

use crate::error::{Error, Result};
use crate::finders::find_ancestor;
use crate::instrumentation::COMMIT_RATE;
use crate::node::{AppNode, DirtyState};
use crate::owned::Owned;

/// Materializes one backend resource.
///
/// `Commit` is the backend's handle type. It is compared with `==` when
/// diffing children, so equality must mean "same resource" (arena ids,
/// pointer-equal `Rc`s).
pub trait Committer: 'static {
    type Commit: Clone + PartialEq + 'static;

    /// Builds a fresh value from the committer's current parameters.
    fn initial(&mut self) -> Result<Self::Commit>;

    /// Patches `last` in place, or returns a replacement when the change
    /// cannot be expressed as a patch.
    fn amend(&mut self, last: Self::Commit) -> Result<Self::Commit>;

    /// Applies the positional child diff to `commit`.
    fn amend_children(
        &mut self,
        commit: Self::Commit,
        diff: &ChildrenDiff<Self::Commit>,
    ) -> Result<Self::Commit>;
}

/// Committer for trees that only need the build phase.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopCommitter;

impl Committer for NoopCommitter {
    type Commit = ();

    fn initial(&mut self) -> Result<()> {
        Ok(())
    }

    fn amend(&mut self, _last: ()) -> Result<()> {
        Ok(())
    }

    fn amend_children(&mut self, _commit: (), _diff: &ChildrenDiff<()>) -> Result<()> {
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ChildOp<D> {
    /// The child at `index` changed.
    Replace { index: usize, child: D },
    Append(D),
    /// Everything from `len` onwards was removed.
    Truncate { len: usize },
}

/// Positional difference between the previous and the new child commit list.
///
/// This is not a keyed diff: a child that moved shows up as a replacement at
/// each affected index.
#[derive(Clone, Debug)]
pub struct ChildrenDiff<D> {
    ops: Vec<ChildOp<D>>,
    children: Vec<D>,
}

impl<D: Clone + PartialEq> ChildrenDiff<D> {
    pub fn between(previous: &[D], children: Vec<D>) -> Self {
        let mut ops = Vec::new();
        for (index, child) in children.iter().enumerate() {
            match previous.get(index) {
                Some(old) if old == child => {}
                Some(_) => ops.push(ChildOp::Replace {
                    index,
                    child: child.clone(),
                }),
                None => ops.push(ChildOp::Append(child.clone())),
            }
        }
        if previous.len() > children.len() {
            ops.push(ChildOp::Truncate {
                len: children.len(),
            });
        }
        Self { ops, children }
    }

    pub fn ops(&self) -> &[ChildOp<D>] {
        &self.ops
    }

    /// The complete new child list.
    pub fn children(&self) -> &[D] {
        &self.children
    }

    pub fn is_unchanged(&self) -> bool {
        self.ops.is_empty()
    }

    /// Replays the diff onto a plain list holding the previous children.
    pub fn apply_to(&self, target: &mut Vec<D>) {
        for op in &self.ops {
            match op {
                ChildOp::Replace { index, child } => {
                    if let Some(slot) = target.get_mut(*index) {
                        *slot = child.clone();
                    }
                }
                ChildOp::Append(child) => target.push(child.clone()),
                ChildOp::Truncate { len } => target.truncate(*len),
            }
        }
    }

    fn into_children(self) -> Vec<D> {
        self.children
    }
}

trait DynCommitter<D> {
    fn initial(&self) -> Result<D>;
    fn amend(&self, last: D) -> Result<D>;
    fn amend_children(&self, commit: D, diff: &ChildrenDiff<D>) -> Result<D>;
}

impl<C: Committer> DynCommitter<C::Commit> for Owned<C> {
    fn initial(&self) -> Result<C::Commit> {
        self.update(|committer| committer.initial())
    }

    fn amend(&self, last: C::Commit) -> Result<C::Commit> {
        self.update(|committer| committer.amend(last))
    }

    fn amend_children(&self, commit: C::Commit, diff: &ChildrenDiff<C::Commit>) -> Result<C::Commit> {
        self.update(|committer| committer.amend_children(commit, diff))
    }
}

struct CommitSlot<D> {
    committer: Box<dyn DynCommitter<D>>,
    last: Option<D>,
    last_children: Vec<D>,
}

/// A node's committer together with its own dirty flag and last commit.
pub(crate) struct CommitterCell {
    dirty: Cell<DirtyState>,
    committer_type: &'static str,
    // `Owned<C>`, handed out to the component through `CommitterHandle`.
    handle: Box<dyn Any>,
    // `CommitSlot<C::Commit>`.
    slot: RefCell<Box<dyn Any>>,
}

impl CommitterCell {
    pub(crate) fn new<C: Committer>(committer: Owned<C>) -> Self {
        let slot: CommitSlot<C::Commit> = CommitSlot {
            committer: Box::new(committer.clone()),
            last: None,
            last_children: Vec::new(),
        };
        Self {
            dirty: Cell::new(DirtyState::SelfAndChildren),
            committer_type: any::type_name::<C>(),
            handle: Box::new(committer),
            slot: RefCell::new(Box::new(slot)),
        }
    }

    pub(crate) fn handle<C: Committer>(&self) -> Option<Owned<C>> {
        self.handle.downcast_ref::<Owned<C>>().cloned()
    }

    pub(crate) fn dirty(&self) -> DirtyState {
        self.dirty.get()
    }

    pub(crate) fn needs_commit(&self) {
        self.dirty.set(DirtyState::SelfAndChildren);
    }

    pub(crate) fn needs_to_check_child_commits(&self) {
        if self.dirty.get() == DirtyState::Clean {
            self.dirty.set(DirtyState::ChildrenOnly);
        }
    }

    fn last_value<D: Clone + 'static>(&self, component: &'static str) -> Result<Option<D>> {
        let slot = self.slot.borrow();
        let slot = slot
            .downcast_ref::<CommitSlot<D>>()
            .ok_or(Error::CommitTypeMismatch {
                component,
                expected: any::type_name::<D>(),
            })?;
        Ok(slot.last.clone())
    }
}

impl fmt::Debug for CommitterCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitterCell")
            .field("dirty", &self.dirty.get())
            .field("committer", &self.committer_type)
            .finish()
    }
}

/// Commits `node`'s committer, recursing into descendants as needed.
pub(crate) fn commit<D: Clone + PartialEq + 'static>(node: &AppNode) -> Result<D> {
    let component = node.name();
    let cell = node.committer_cell().ok_or(Error::NoCommitter)?;
    let dirty = cell.dirty();
    if dirty == DirtyState::Clean {
        COMMIT_RATE.with(|rate| rate.skip());
        return cell
            .last_value::<D>(component)?
            .ok_or(Error::MissingCommit { component });
    }

    let mut children = Vec::new();
    gather_child_commits(node, &mut children)?;

    let mut slot = cell.slot.borrow_mut();
    let slot = slot
        .downcast_mut::<CommitSlot<D>>()
        .ok_or(Error::CommitTypeMismatch {
            component,
            expected: any::type_name::<D>(),
        })?;

    let previous = slot.last.take();
    let value = match (dirty, previous.clone()) {
        (DirtyState::SelfAndChildren, None) => {
            COMMIT_RATE.with(|rate| rate.hit());
            slot.committer.initial()?
        }
        (DirtyState::SelfAndChildren, Some(last)) => {
            COMMIT_RATE.with(|rate| rate.hit());
            slot.committer.amend(last)?
        }
        (_, Some(last)) => {
            COMMIT_RATE.with(|rate| rate.skip());
            last
        }
        (_, None) => return Err(Error::MissingCommit { component }),
    };

    // A replaced self value starts out without children.
    let diff = if previous.as_ref() == Some(&value) {
        ChildrenDiff::between(&slot.last_children, children)
    } else {
        ChildrenDiff::between(&[], children)
    };
    let value = slot.committer.amend_children(value, &diff)?;
    slot.last_children = diff.into_children();
    slot.last = Some(value.clone());
    cell.dirty.set(DirtyState::Clean);
    Ok(value)
}

/// Collects, in tree order, the commit values of the nearest committer
/// descendants of `node`.
fn gather_child_commits<D: Clone + PartialEq + 'static>(
    node: &AppNode,
    out: &mut Vec<D>,
) -> Result<()> {
    for child in node.children().into_iter().flatten() {
        if child.has_committer() {
            out.push(commit::<D>(&child)?);
        } else {
            gather_child_commits(&child, out)?;
        }
    }
    Ok(())
}

impl AppNode {
    /// The value produced by this node's committer at its last commit.
    pub fn commit_value<D: Clone + 'static>(&self) -> Result<Option<D>> {
        let cell = self.committer_cell().ok_or(Error::NoCommitter)?;
        cell.last_value::<D>(self.name())
    }

    /// Commits from the nearest committer at or above this node.
    pub fn recommit<D: Clone + PartialEq + 'static>(&self) -> Result<D> {
        let committable = find_ancestor(self, AppNode::has_committer).ok_or(Error::NoCommitter)?;
        commit::<D>(&committable)
    }

    /// Runs `f` with this node's committer if it is a `C`.
    pub fn with_committer<C: Committer, R>(&self, f: impl FnOnce(&C) -> R) -> Option<R> {
        self.committer_cell()?.handle::<C>().map(|committer| committer.with(f))
    }
}
