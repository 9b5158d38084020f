use thiserror::Error;

/// Errors raised by the build and commit passes.
///
/// Everything except [`Error::Backend`] is a protocol violation: a bug in a
/// component or in the code driving the tree. None of them are retried, and a
/// pass that fails leaves the tree partially updated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("component `{component}` requested its state more than once in a single render")]
    StateAlreadyRequested { component: &'static str },
    #[error("component `{component}` is not stateful and cannot request state")]
    StatelessRequest { component: &'static str },
    #[error("stateful component `{component}` did not request its state")]
    StateNotRequested { component: &'static str },
    #[error("state of component `{component}` has a different type; expected {expected}")]
    StateTypeMismatch {
        component: &'static str,
        expected: &'static str,
    },
    #[error("rebuilds can only be scheduled on the root node")]
    NotRoot,
    #[error("committer of `{component}` has no commit value")]
    MissingCommit { component: &'static str },
    #[error("no committer found on the node or any of its ancestors")]
    NoCommitter,
    #[error("committer of `{component}` does not produce {expected}")]
    CommitTypeMismatch {
        component: &'static str,
        expected: &'static str,
    },
    #[error("backend error: {0}")]
    Backend(String),
}

impl Error {
    pub fn backend(message: impl Into<String>) -> Self {
        Error::Backend(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
