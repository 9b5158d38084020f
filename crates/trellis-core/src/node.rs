use std::any::{self, Any};
use std::cell::{Cell, RefCell};
use std::fmt;
use std::fmt::Write as _;
use std::rc::{Rc, Weak};

use once_cell::unsync::OnceCell;

use crate::commit::CommitterCell;
use crate::component::ComponentType;
use crate::error::{Error, Result};
use crate::owned::Owned;
use crate::run::RootState;
use crate::ui::Descriptor;

/// How much of a node's subtree the next build pass has to visit.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DirtyState {
    /// Nothing below (or at) this node needs rebuilding.
    Clean,
    /// The node's own output is valid, some descendant is dirty.
    ChildrenOnly,
    /// The node must re-run its render closure.
    #[default]
    SelfAndChildren,
}

pub(crate) trait NodeState: fmt::Debug {
    fn as_any(&self) -> &dyn Any;
}

impl<T: Any + fmt::Debug> NodeState for T {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

enum ParentLink {
    Root,
    Attached(Weak<NodeInner>),
    Detached,
}

pub(crate) enum Parent {
    Root,
    Node(AppNode),
    Detached,
}

pub(crate) struct NodeInner {
    dirty: Cell<DirtyState>,
    parent: RefCell<ParentLink>,
    // `None` marks a position that rendered nothing.
    children: RefCell<Vec<Option<AppNode>>>,
    ui: RefCell<Descriptor>,
    state: RefCell<Option<Box<dyn NodeState>>>,
    committer: OnceCell<CommitterCell>,
    root: OnceCell<RootState>,
}

/// Handle to a node of the persistent build tree.
///
/// Cloning the handle is cheap and shares the node. A node survives rebuilds
/// for as long as the descriptor rendered at its position keeps the same
/// [`ComponentType`].
#[derive(Clone)]
pub struct AppNode {
    inner: Rc<NodeInner>,
}

/// Non-owning handle, for callbacks that must not keep a discarded node alive.
#[derive(Clone)]
pub struct WeakNode {
    inner: Weak<NodeInner>,
}

impl WeakNode {
    pub fn upgrade(&self) -> Option<AppNode> {
        self.inner.upgrade().map(|inner| AppNode { inner })
    }
}

impl fmt::Debug for WeakNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.upgrade() {
            Some(node) => write!(f, "WeakNode({})", node.name()),
            None => f.write_str("WeakNode(dropped)"),
        }
    }
}

impl AppNode {
    fn with_link(ui: Descriptor, parent: ParentLink) -> Self {
        Self {
            inner: Rc::new(NodeInner {
                dirty: Cell::new(DirtyState::SelfAndChildren),
                parent: RefCell::new(parent),
                children: RefCell::new(Vec::new()),
                ui: RefCell::new(ui),
                state: RefCell::new(None),
                committer: OnceCell::new(),
                root: OnceCell::new(),
            }),
        }
    }

    pub(crate) fn new_root(ui: Descriptor) -> Self {
        Self::with_link(ui, ParentLink::Root)
    }

    pub(crate) fn new_child(ui: Descriptor, parent: &AppNode) -> Self {
        Self::with_link(ui, ParentLink::Attached(Rc::downgrade(&parent.inner)))
    }

    pub fn downgrade(&self) -> WeakNode {
        WeakNode {
            inner: Rc::downgrade(&self.inner),
        }
    }

    pub fn ptr_eq(&self, other: &AppNode) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn parent_link(&self) -> Parent {
        match &*self.inner.parent.borrow() {
            ParentLink::Root => Parent::Root,
            ParentLink::Attached(weak) => weak
                .upgrade()
                .map_or(Parent::Detached, |inner| Parent::Node(AppNode { inner })),
            ParentLink::Detached => Parent::Detached,
        }
    }

    pub fn parent(&self) -> Option<AppNode> {
        match self.parent_link() {
            Parent::Node(parent) => Some(parent),
            Parent::Root | Parent::Detached => None,
        }
    }

    pub fn is_root(&self) -> bool {
        matches!(self.parent_link(), Parent::Root)
    }

    /// True once the node has been discarded from the tree it was built in.
    pub fn is_detached(&self) -> bool {
        matches!(self.parent_link(), Parent::Detached)
    }

    /// Cuts the node and its subtree off the tree and drops their state.
    ///
    /// Handles kept elsewhere stay valid but every `rebuild` on them becomes a
    /// no-op. Dropping the state is what cancels pending suspensions.
    pub(crate) fn detach(&self) {
        *self.inner.parent.borrow_mut() = ParentLink::Detached;
        let state = self.inner.state.borrow_mut().take();
        drop(state);
        let children = std::mem::take(&mut *self.inner.children.borrow_mut());
        for child in children.into_iter().flatten() {
            child.detach();
        }
    }

    pub fn children(&self) -> Vec<Option<AppNode>> {
        self.inner.children.borrow().clone()
    }

    pub fn child(&self, index: usize) -> Option<AppNode> {
        self.inner.children.borrow().get(index).cloned().flatten()
    }

    pub fn child_count(&self) -> usize {
        self.inner.children.borrow().len()
    }

    pub(crate) fn set_child(&self, index: usize, child: Option<AppNode>) {
        let previous = {
            let mut children = self.inner.children.borrow_mut();
            if index >= children.len() {
                children.resize(index + 1, None);
            }
            std::mem::replace(&mut children[index], child)
        };
        if let Some(previous) = previous {
            previous.detach();
        }
    }

    pub(crate) fn truncate_children(&self, len: usize) {
        let removed: Vec<Option<AppNode>> = {
            let mut children = self.inner.children.borrow_mut();
            if children.len() <= len {
                return;
            }
            children.drain(len..).collect()
        };
        for node in removed.into_iter().flatten() {
            node.detach();
        }
    }

    pub fn dirty(&self) -> DirtyState {
        self.inner.dirty.get()
    }

    pub(crate) fn set_dirty(&self, dirty: DirtyState) {
        self.inner.dirty.set(dirty);
    }

    /// Forces the node to re-run its render on the next pass.
    pub fn needs_build(&self) {
        self.inner.dirty.set(DirtyState::SelfAndChildren);
        if let Some(committer) = self.committer_cell() {
            committer.needs_to_check_child_commits();
        }
    }

    /// Records that some descendant needs rebuilding. Never downgrades a
    /// `SelfAndChildren` node.
    pub fn needs_children_build(&self) {
        if self.inner.dirty.get() == DirtyState::Clean {
            self.inner.dirty.set(DirtyState::ChildrenOnly);
        }
        if let Some(committer) = self.committer_cell() {
            committer.needs_to_check_child_commits();
        }
    }

    pub fn descriptor(&self) -> Descriptor {
        self.inner.ui.borrow().clone()
    }

    pub(crate) fn set_descriptor(&self, ui: Descriptor) {
        *self.inner.ui.borrow_mut() = ui;
    }

    pub fn component_type(&self) -> Option<ComponentType> {
        self.inner.ui.borrow().component_type()
    }

    pub fn name(&self) -> &'static str {
        self.inner.ui.borrow().name()
    }

    pub fn has_state(&self) -> bool {
        self.inner.state.borrow().is_some()
    }

    pub(crate) fn owned_state<S: 'static>(&self) -> Option<Owned<S>> {
        self.inner
            .state
            .borrow()
            .as_deref()
            .and_then(|state| state.as_any().downcast_ref::<Owned<S>>())
            .cloned()
    }

    /// Returns the node's state, creating it with `init` when the slot is
    /// still empty.
    pub(crate) fn acquire_state<S: fmt::Debug + 'static>(
        &self,
        init: impl FnOnce() -> S,
    ) -> Result<Owned<S>> {
        if !self.has_state() {
            let owned = Owned::new(init());
            *self.inner.state.borrow_mut() = Some(Box::new(owned.clone()));
            return Ok(owned);
        }
        self.owned_state::<S>()
            .ok_or_else(|| Error::StateTypeMismatch {
                component: self.name(),
                expected: any::type_name::<S>(),
            })
    }

    /// Runs `f` with the node's state if it holds an `S`.
    pub fn with_state<S: 'static, R>(&self, f: impl FnOnce(&S) -> R) -> Option<R> {
        self.owned_state::<S>().map(|state| state.with(f))
    }

    pub fn update_state<S: 'static, R>(&self, f: impl FnOnce(&mut S) -> R) -> Option<R> {
        self.owned_state::<S>().map(|state| state.update(f))
    }

    pub fn state<S: Clone + 'static>(&self) -> Option<S> {
        self.with_state(S::clone)
    }

    pub fn has_committer(&self) -> bool {
        self.inner.committer.get().is_some()
    }

    /// The owned committer's own dirty flag, independent of [`AppNode::dirty`].
    pub fn committer_dirty(&self) -> Option<DirtyState> {
        self.committer_cell().map(CommitterCell::dirty)
    }

    pub(crate) fn committer_cell(&self) -> Option<&CommitterCell> {
        self.inner.committer.get()
    }

    pub(crate) fn attach_committer(&self, cell: CommitterCell) -> &CommitterCell {
        self.inner.committer.get_or_init(|| cell)
    }

    pub(crate) fn root_state(&self) -> Option<&RootState> {
        self.inner.root.get()
    }

    pub(crate) fn attach_root_state(&self, root: RootState) {
        if self.inner.root.set(root).is_err() {
            log::warn!("root `{}` already has scheduling state", self.name());
        }
    }

    /// Renders the subtree as indented text, one node per line.
    ///
    /// Empty positions show as `-`. Node identity is not printed, so two
    /// structurally equal trees dump to the same string.
    pub fn dump_tree(&self) -> String {
        let mut output = String::new();
        self.dump_node(&mut output, 0);
        output
    }

    fn dump_node(&self, output: &mut String, depth: usize) {
        let indent = "  ".repeat(depth);
        let _ = write!(output, "{indent}{}", self.name());
        if let Some(state) = self.inner.state.borrow().as_deref() {
            let _ = write!(output, " {state:?}");
        }
        if self.has_committer() {
            output.push_str(" [committer]");
        }
        output.push('\n');
        for child in self.children() {
            match child {
                Some(child) => child.dump_node(output, depth + 1),
                None => {
                    let _ = writeln!(output, "{indent}  -");
                }
            }
        }
    }
}

impl fmt::Debug for AppNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppNode")
            .field("name", &self.name())
            .field("dirty", &self.dirty())
            .field("children", &self.child_count())
            .field("committer", &self.committer_dirty())
            .finish()
    }
}
