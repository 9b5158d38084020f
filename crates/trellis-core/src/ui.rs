use std::fmt;
use std::rc::Rc;

use crate::component::ComponentType;
use crate::context::RenderCx;
use crate::error::Result;

/// Whether a descriptor's render must acquire its node's state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StateRequirement {
    Stateless,
    Stateful,
}

type Render = dyn Fn(&mut RenderCx<'_>) -> Result<Ui>;

/// A single invoked component: its type, and a closure over its arguments.
#[derive(Clone)]
pub struct Descriptor {
    ty: Option<ComponentType>,
    requirement: StateRequirement,
    render: Rc<Render>,
}

impl Descriptor {
    pub fn new(
        ty: Option<ComponentType>,
        requirement: StateRequirement,
        render: impl Fn(&mut RenderCx<'_>) -> Result<Ui> + 'static,
    ) -> Self {
        Self {
            ty,
            requirement,
            render: Rc::new(render),
        }
    }

    /// A stateless descriptor without a type. It never matches a previous
    /// node, so its position is rebuilt from scratch on every parent build.
    pub fn untyped(render: impl Fn(&mut RenderCx<'_>) -> Result<Ui> + 'static) -> Self {
        Self::new(None, StateRequirement::Stateless, render)
    }

    pub fn component_type(&self) -> Option<ComponentType> {
        self.ty
    }

    pub fn name(&self) -> &'static str {
        self.ty.map_or("anonymous", |ty| ty.name())
    }

    pub fn requirement(&self) -> StateRequirement {
        self.requirement
    }

    /// Two descriptors are the same component iff both carry a type and the
    /// types are equal.
    pub fn is_same_type(&self, other: &Descriptor) -> bool {
        match (self.ty, other.ty) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// True when both descriptors come from the same invocation, i.e. share
    /// one render closure.
    pub fn ptr_eq(&self, other: &Descriptor) -> bool {
        Rc::ptr_eq(&self.render, &other.render)
    }

    pub(crate) fn render(&self, cx: &mut RenderCx<'_>) -> Result<Ui> {
        (self.render)(cx)
    }

    /// Same component and arguments behind a new closure, so the copy no
    /// longer `ptr_eq`s `self`.
    pub(crate) fn reissue(&self) -> Descriptor {
        let render = Rc::clone(&self.render);
        Descriptor::new(self.ty, self.requirement, move |cx| render(cx))
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("type", &self.ty)
            .field("requirement", &self.requirement)
            .finish_non_exhaustive()
    }
}

/// Output of a component invocation.
///
/// `Multi` may nest arbitrarily; nested sequences are flattened positionally
/// into the parent's children.
#[derive(Clone, Default)]
pub enum Ui {
    #[default]
    Empty,
    Single(Descriptor),
    Multi(Vec<Ui>),
}

impl Ui {
    pub fn multi<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Ui>,
    {
        Ui::Multi(items.into_iter().map(Into::into).collect())
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Ui::Empty)
    }

    pub(crate) fn reissue(&self) -> Ui {
        match self {
            Ui::Empty => Ui::Empty,
            Ui::Single(descriptor) => Ui::Single(descriptor.reissue()),
            Ui::Multi(items) => Ui::Multi(items.iter().map(Ui::reissue).collect()),
        }
    }
}

impl From<Descriptor> for Ui {
    fn from(descriptor: Descriptor) -> Self {
        Ui::Single(descriptor)
    }
}

impl From<Vec<Ui>> for Ui {
    fn from(items: Vec<Ui>) -> Self {
        Ui::Multi(items)
    }
}

impl<const N: usize> From<[Ui; N]> for Ui {
    fn from(items: [Ui; N]) -> Self {
        Ui::Multi(items.into())
    }
}

impl From<()> for Ui {
    fn from(_: ()) -> Self {
        Ui::Empty
    }
}

impl<T: Into<Ui>> From<Option<T>> for Ui {
    fn from(value: Option<T>) -> Self {
        value.map_or(Ui::Empty, Into::into)
    }
}

impl fmt::Debug for Ui {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ui::Empty => f.write_str("Empty"),
            Ui::Single(descriptor) => write!(f, "{}", descriptor.name()),
            Ui::Multi(items) => f.debug_list().entries(items).finish(),
        }
    }
}
