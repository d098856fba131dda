//! Error types for statetree-core.

use crate::path::PathError;

/// Errors produced by value navigation and conversion.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// The path failed validation.
    #[error(transparent)]
    Path(#[from] PathError),

    /// A path could not be navigated in a value.
    #[error("invalid path: {message}")]
    InvalidPath { message: String },

    /// A value could not be decoded into a Rust type.
    #[error("decode error: {message}")]
    Decode { message: String },

    /// A Rust type could not be encoded as a value.
    #[error("encode error: {message}")]
    Encode { message: String },
}

impl Error {
    pub fn decode(message: impl Into<String>) -> Self {
        Error::Decode {
            message: message.into(),
        }
    }

    pub fn encode(message: impl Into<String>) -> Self {
        Error::Encode {
            message: message.into(),
        }
    }
}
