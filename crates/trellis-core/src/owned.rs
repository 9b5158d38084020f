use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Single-threaded shared owner for values kept alive by the node tree.
///
/// Node state and committers live inside one of these so that the tree and
/// the handles given to components point at the same value.
pub struct Owned<T> {
    inner: Rc<RefCell<T>>,
}

impl<T> Clone for Owned<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Owned<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(value)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow())
    }

    /// Panics if `f` reenters the same value; see [`Owned::try_update`].
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        f(&mut self.inner.borrow_mut())
    }

    /// Like [`Owned::update`], but returns `None` instead of panicking when
    /// the value is already borrowed.
    pub fn try_update<R>(&self, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut borrow = self.inner.try_borrow_mut().ok()?;
        Some(f(&mut *borrow))
    }

    pub fn replace(&self, new_value: T) -> T {
        self.inner.replace(new_value)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T: fmt::Debug> fmt::Debug for Owned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_borrow() {
            Ok(value) => value.fmt(f),
            Err(_) => f.write_str("<borrowed>"),
        }
    }
}
