//! Error types for hubget-fetch.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::data::FailureKind;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid repository id {0:?}: expected owner/name")]
    InvalidRepoId(String),

    #[error("invalid repository kind {0:?}: expected model, dataset or space")]
    InvalidRepoKind(String),

    #[error("invalid revision {0:?}")]
    InvalidRevision(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("invalid glob pattern {pattern:?}: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source:  globset::Error,
    },

    #[error("invalid endpoint URL {0:?}")]
    InvalidEndpoint(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("network error: {0}")]
    Transient(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("range not satisfiable: {0}")]
    RangeNotSatisfiable(String),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("digest mismatch for {path}: expected {expected}, got {actual}")]
    DigestMismatch {
        path:     String,
        expected: String,
        actual:   String,
    },

    #[error("{path}: body ended after {received} of {expected} bytes")]
    Truncated {
        path:     String,
        received: u64,
        expected: u64,
    },

    #[error(transparent)]
    Fs(#[from] hubget_fs::Error),

    #[error("I/O error on {path}: {source}")]
    Io {
        path:   PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cancelled")]
    Cancelled,
}

impl FetchError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        FetchError::Io {
            path: path.into(),
            source,
        }
    }

    /// Where this error lands in the per-file failure taxonomy.
    pub fn kind(&self) -> FailureKind {
        match self {
            FetchError::InvalidRepoId(_)
            | FetchError::InvalidRepoKind(_)
            | FetchError::InvalidRevision(_)
            | FetchError::InvalidConfig(_)
            | FetchError::InvalidPattern { .. }
            | FetchError::InvalidEndpoint(_) => FailureKind::InvalidInput,
            FetchError::NotFound(_) => FailureKind::NotFound,
            FetchError::Unauthorized(_) => FailureKind::Unauthorized,
            FetchError::Transient(_) | FetchError::Timeout(_) => FailureKind::Transient,
            FetchError::RangeNotSatisfiable(_) | FetchError::Protocol(_) => FailureKind::Protocol,
            FetchError::DigestMismatch { .. } | FetchError::Truncated { .. } => {
                FailureKind::DigestMismatch
            }
            FetchError::Fs(_) | FetchError::Io { .. } => FailureKind::LocalIo,
            FetchError::Cancelled => FailureKind::Cancelled,
        }
    }

    /// Only transient network failures are worth another attempt.
    pub fn is_retryable(&self) -> bool { self.kind() == FailureKind::Transient }
}

pub type Result<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(FetchError::Transient("reset".into()).is_retryable());
        assert!(FetchError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!FetchError::NotFound("x".into()).is_retryable());
        assert!(!FetchError::Unauthorized("x".into()).is_retryable());
        assert!(!FetchError::Cancelled.is_retryable());
        assert!(
            !FetchError::DigestMismatch {
                path:     "a".into(),
                expected: "1".into(),
                actual:   "2".into(),
            }
            .is_retryable()
        );

        let short = FetchError::Truncated {
            path:     "a".into(),
            received: 50,
            expected: 100,
        };
        assert!(!short.is_retryable());
        assert_eq!(short.kind(), FailureKind::DigestMismatch);

        let io = FetchError::io("/x", io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(io.kind(), FailureKind::LocalIo);
        assert_eq!(
            FetchError::RangeNotSatisfiable("bytes=9-".into()).kind(),
            FailureKind::Protocol
        );
    }
}
