use std::any;
use std::fmt;

use crate::commit::{Committer, CommitterCell};
use crate::error::{Error, Result};
use crate::node::AppNode;
use crate::owned::Owned;
use crate::ui::{Descriptor, StateRequirement};

/// Gate through which a render closure reaches its node.
///
/// The build pass creates one per render call and consumes it right after
/// the closure returns. Stateful components must acquire their node exactly
/// once through [`RenderCx::state`] or [`RenderCx::committer`].
pub struct RenderCx<'a> {
    node: &'a AppNode,
    component: &'static str,
    requirement: StateRequirement,
    acquired: bool,
}

impl<'a> RenderCx<'a> {
    pub(crate) fn new(node: &'a AppNode, descriptor: &Descriptor) -> Self {
        Self {
            node,
            component: descriptor.name(),
            requirement: descriptor.requirement(),
            acquired: false,
        }
    }

    /// The node being rendered. Clone or downgrade it to call
    /// [`AppNode::rebuild`] from a callback.
    pub fn node(&self) -> &AppNode {
        self.node
    }

    pub fn component_name(&self) -> &'static str {
        self.component
    }

    fn acquire(&mut self) -> Result<()> {
        if self.requirement == StateRequirement::Stateless {
            return Err(Error::StatelessRequest {
                component: self.component,
            });
        }
        if self.acquired {
            return Err(Error::StateAlreadyRequested {
                component: self.component,
            });
        }
        self.acquired = true;
        Ok(())
    }

    /// Requests the node's state, initializing it with `init` on the node's
    /// first render.
    pub fn state<S: fmt::Debug + 'static>(
        &mut self,
        init: impl FnOnce() -> S,
    ) -> Result<StateHandle<S>> {
        self.acquire()?;
        let value = self.node.acquire_state(init)?;
        Ok(StateHandle {
            value,
            node: self.node.clone(),
        })
    }

    /// Requests the node's committer, creating it on the node's first render.
    pub fn committer<C: Committer>(
        &mut self,
        create: impl FnOnce() -> C,
    ) -> Result<CommitterHandle<C>> {
        self.acquire()?;
        let cell = match self.node.committer_cell() {
            Some(cell) => cell,
            None => self.node.attach_committer(CommitterCell::new(Owned::new(create()))),
        };
        let value = cell
            .handle::<C>()
            .ok_or_else(|| Error::StateTypeMismatch {
                component: self.component,
                expected: any::type_name::<C>(),
            })?;
        Ok(CommitterHandle {
            value,
            node: self.node.clone(),
        })
    }

    pub(crate) fn finish(self) -> Result<()> {
        if self.requirement == StateRequirement::Stateful && !self.acquired {
            return Err(Error::StateNotRequested {
                component: self.component,
            });
        }
        Ok(())
    }
}

impl fmt::Debug for RenderCx<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderCx")
            .field("component", &self.component)
            .field("requirement", &self.requirement)
            .field("acquired", &self.acquired)
            .finish()
    }
}

/// A component's state, shared with its node.
pub struct StateHandle<S> {
    value: Owned<S>,
    node: AppNode,
}

impl<S> StateHandle<S> {
    pub fn with<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        self.value.with(f)
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        self.value.update(f)
    }

    pub fn set(&self, value: S) {
        self.value.replace(value);
    }

    pub fn node(&self) -> &AppNode {
        &self.node
    }
}

impl<S: Clone> StateHandle<S> {
    pub fn get(&self) -> S {
        self.value.with(S::clone)
    }
}

impl<S> Clone for StateHandle<S> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            node: self.node.clone(),
        }
    }
}

impl<S: fmt::Debug> fmt::Debug for StateHandle<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateHandle")
            .field("node", &self.node.name())
            .field("value", &self.value)
            .finish()
    }
}

/// A component's committer, shared with its node.
pub struct CommitterHandle<C> {
    value: Owned<C>,
    node: AppNode,
}

impl<C> CommitterHandle<C> {
    pub fn with<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        self.value.with(f)
    }

    /// Mutates the committer and marks it for a full recommit.
    pub fn update<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        let result = self.value.update(f);
        self.mark_dirty();
        result
    }

    pub fn mark_dirty(&self) {
        if let Some(cell) = self.node.committer_cell() {
            cell.needs_commit();
        }
    }

    pub fn node(&self) -> &AppNode {
        &self.node
    }
}

impl<C> Clone for CommitterHandle<C> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
            node: self.node.clone(),
        }
    }
}

impl<C> fmt::Debug for CommitterHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommitterHandle")
            .field("node", &self.node.name())
            .field("committer", &any::type_name::<C>())
            .finish()
    }
}
