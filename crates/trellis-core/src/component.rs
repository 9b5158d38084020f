use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::OnceCell;

use crate::context::RenderCx;
use crate::error::Result;
use crate::ui::{Descriptor, StateRequirement, Ui};

static NEXT_COMPONENT_TYPE: AtomicU64 = AtomicU64::new(1);

/// Identity of a component definition.
///
/// A type is issued once per definition and shared by every descriptor the
/// definition produces. Node reuse between two builds is decided by comparing
/// these and nothing else.
#[derive(Clone, Copy)]
pub struct ComponentType {
    id: u64,
    name: &'static str,
}

impl ComponentType {
    pub fn new(name: &'static str) -> Self {
        Self {
            id: NEXT_COMPONENT_TYPE.fetch_add(1, Ordering::Relaxed),
            name,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl PartialEq for ComponentType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ComponentType {}

impl Hash for ComponentType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.name, self.id)
    }
}

/// Lazily issued [`ComponentType`] for use in a `static`.
///
/// `#[component]` expands to one of these per annotated function so the type
/// is created at most once no matter how often the function runs.
pub struct ComponentTypeCell {
    name: &'static str,
    cell: OnceCell<ComponentType>,
}

impl ComponentTypeCell {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            cell: OnceCell::new(),
        }
    }

    pub fn get(&self) -> ComponentType {
        *self.cell.get_or_init(|| ComponentType::new(self.name))
    }
}

impl fmt::Debug for ComponentTypeCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentTypeCell")
            .field("name", &self.name)
            .field("type", &self.cell.get())
            .finish()
    }
}

type RenderWithArgs<A> = dyn Fn(&mut RenderCx<'_>, &A) -> Result<Ui>;

/// A component definition: a factory for descriptors that share one type.
///
/// `A` carries the call arguments; use a tuple for several of them.
pub struct Component<A> {
    ty: ComponentType,
    requirement: StateRequirement,
    render: Rc<RenderWithArgs<A>>,
}

impl<A: 'static> Component<A> {
    /// Defines a component that must request its state exactly once per render.
    pub fn stateful(
        name: &'static str,
        render: impl Fn(&mut RenderCx<'_>, &A) -> Result<Ui> + 'static,
    ) -> Self {
        Self::with_requirement(name, StateRequirement::Stateful, render)
    }

    /// Defines a component that keeps a node of its own but never holds state.
    pub fn stateless(
        name: &'static str,
        render: impl Fn(&mut RenderCx<'_>, &A) -> Result<Ui> + 'static,
    ) -> Self {
        Self::with_requirement(name, StateRequirement::Stateless, render)
    }

    fn with_requirement(
        name: &'static str,
        requirement: StateRequirement,
        render: impl Fn(&mut RenderCx<'_>, &A) -> Result<Ui> + 'static,
    ) -> Self {
        Self {
            ty: ComponentType::new(name),
            requirement,
            render: Rc::new(render),
        }
    }

    pub fn component_type(&self) -> ComponentType {
        self.ty
    }

    pub fn name(&self) -> &'static str {
        self.ty.name()
    }

    /// Invokes the component, capturing `args` in the returned descriptor.
    pub fn call(&self, args: A) -> Ui {
        let render = Rc::clone(&self.render);
        Descriptor::new(Some(self.ty), self.requirement, move |cx| render(cx, &args)).into()
    }
}

impl<A> Clone for Component<A> {
    fn clone(&self) -> Self {
        Self {
            ty: self.ty,
            requirement: self.requirement,
            render: Rc::clone(&self.render),
        }
    }
}

impl<A> fmt::Debug for Component<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("type", &self.ty)
            .field("requirement", &self.requirement)
            .finish()
    }
}
