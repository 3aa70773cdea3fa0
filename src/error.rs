//! Error types shared by every component.

use std::io;

/// Errors reported by the address codec, the diagram engine and the file codec.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed address or prefix text.
    #[error("parse error: {0}")]
    Parse(String),
    /// Out-of-range prefix length, host bits set, family or store mismatch.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// Corrupt, truncated or inconsistent serialized diagram.
    #[error("format error: {0}")]
    Format(String),
    /// Could not reserve room for the nodes being loaded.
    #[error("allocation failure: {0}")]
    Allocation(String),
    /// Underlying stream failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Machine-distinguishable error kind.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ErrorKind {
    Parse,
    InvalidArgument,
    Format,
    Allocation,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Parse(_) => ErrorKind::Parse,
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Format(_) => ErrorKind::Format,
            Error::Allocation(_) => ErrorKind::Allocation,
            Error::Io(_) => ErrorKind::Io,
        }
    }

    pub(crate) fn parse(msg: impl Into<String>) -> Self {
        Error::Parse(msg.into())
    }

    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidArgument(msg.into())
    }

    pub(crate) fn format(msg: impl Into<String>) -> Self {
        Error::Format(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A single "last error" slot for front ends that process many records and
/// decide per record whether to abort, skip or continue.
///
/// ```
/// use ipset_rs::error::{ErrorKind, LastError};
/// use ipset_rs::address::Network;
///
/// let mut last = LastError::default();
/// assert!(last.check("10.0.0.0/33".parse::<Network>()).is_none());
/// assert_eq!(last.kind(), Some(ErrorKind::InvalidArgument));
/// last.clear();
/// assert!(!last.occurred());
/// ```
#[derive(Debug, Default)]
pub struct LastError {
    error: Option<Error>,
}

impl LastError {
    /// Stores `error`, replacing any previous one.
    pub fn record(&mut self, error: Error) {
        self.error = Some(error);
    }

    /// Returns the success value, or records the error and returns `None`.
    pub fn check<T>(&mut self, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                self.record(e);
                None
            }
        }
    }

    pub fn occurred(&self) -> bool {
        self.error.is_some()
    }

    pub fn kind(&self) -> Option<ErrorKind> {
        self.error.as_ref().map(Error::kind)
    }

    pub fn message(&self) -> Option<String> {
        self.error.as_ref().map(|e| e.to_string())
    }

    pub fn clear(&mut self) {
        self.error = None;
    }

    /// Removes and returns the stored error.
    pub fn take(&mut self) -> Option<Error> {
        self.error.take()
    }
}
