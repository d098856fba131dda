//! Error types for the state engine.

use statetree_core::{Path, PathError};

use crate::resource::{Pending, ResolveError};

/// Errors produced by reads and writes through the state tree.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// The value is still being resolved. Await the handle and read again.
    #[error("value is not ready yet")]
    Suspended(Pending),

    /// The resolver failed. The same error is returned on every read until
    /// the resource is refetched.
    #[error("fetch failed: {0}")]
    Fetch(ResolveError),

    #[error("cannot mutate '{path}': object is frozen")]
    Frozen { path: Path },

    #[error("cannot assign reserved property '{prop}'")]
    Protected { prop: String },

    #[error("merge expects a plain map")]
    InvalidMerge,

    #[error("requested a slice that is not an object at '{path}'; slice its parent instead")]
    UnsupportedSlice { path: Path },

    #[error("'{path}' is not a container")]
    NotAContainer { path: Path },

    #[error("'{path}' is not a list")]
    NotAList { path: Path },

    #[error("'{path}' is not under a resource key")]
    NotAResource { path: Path },

    /// The handle refers to a node that has since been removed from the tree.
    #[error("handle no longer refers to a node in the tree")]
    Detached,

    #[error(transparent)]
    Path(#[from] PathError),

    #[error(transparent)]
    Value(#[from] statetree_core::Error),
}

impl Error {
    /// The pending handle, if this read suspended.
    pub fn pending(&self) -> Option<&Pending> {
        match self {
            Error::Suspended(pending) => Some(pending),
            _ => None,
        }
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, Error::Suspended(_))
    }

    /// The resolver error, if this read failed on a fetch.
    pub fn fetch_error(&self) -> Option<&ResolveError> {
        match self {
            Error::Fetch(error) => Some(error),
            _ => None,
        }
    }
}

impl From<ResolveError> for Error {
    fn from(error: ResolveError) -> Self {
        Error::Fetch(error)
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
