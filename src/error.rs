//! Errors that occur when issuing commands through a client handle

use thiserror::Error;

/// A specialized `Result` for store operations.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error returned by the store backends and the typed client.
#[derive(Error, Debug)]
pub enum Error {
    /// Operation on a non-existent key
    #[error("key not found")]
    KeyNotFound,

    /// Operation on a non-existent hash field
    #[error("field not found")]
    FieldNotFound,

    /// A command replied with a shape that the caller can not use
    #[error("unexpected result type (expected {expected}, got {found})")]
    UnexpectedType {
        /// The reply shape the caller asked for.
        expected: &'static str,
        /// The reply shape the store returned.
        found: &'static str,
    },

    /// The address is not of the form `host:port`
    #[error("invalid address (got {0:?})")]
    InvalidAddress(String),

    /// The arguments can not be sent to the store
    #[error("invalid argument - {0}")]
    InvalidArgument(String),

    /// The store refused to process the command
    #[error("{0}")]
    CommandFailed(String),

    /// Reply bytes could not be read as an UTF-8 encoded string
    #[error("invalid UTF-8 string - {0}")]
    NotUtf8(#[from] std::string::FromUtf8Error),

    /// Error from the underlying Redis client
    #[error("redis error - {0}")]
    Store(#[from] redis::RedisError),
}

impl Error {
    /// Returns `true` if the error only signals that a key or a field is absent.
    ///
    /// These are sentinel conditions of the store rather than failures, callers that
    /// need to tell them apart from a broken connection should check this.
    pub fn is_absence(&self) -> bool {
        matches!(self, Self::KeyNotFound | Self::FieldNotFound)
    }
}
