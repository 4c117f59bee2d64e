use std::fmt;
use std::path::PathBuf;

use crate::data::manifest::RemoteFileEntry;
use crate::error::FetchError;

/// What is already on disk for a remote file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalState {
    Absent,
    /// A part file from an earlier run with a checkpoint for the same commit.
    Partial { completed_bytes: u64 },
    /// Final file present with the expected size, digest not yet checked.
    CompleteUnverified,
    CompleteVerified,
}

/// One file to transfer. Owned by the fetcher executing it.
#[derive(Debug, Clone)]
pub struct TransferTask {
    pub entry:       RemoteFileEntry,
    pub destination: PathBuf,
    /// Part file in the staging area.
    pub staging:     PathBuf,
    pub state:       LocalState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    InvalidInput,
    NotFound,
    Unauthorized,
    Transient,
    DigestMismatch,
    LocalIo,
    Protocol,
    Cancelled,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::InvalidInput => "invalid input",
            FailureKind::NotFound => "not found",
            FailureKind::Unauthorized => "unauthorized",
            FailureKind::Transient => "transient",
            FailureKind::DigestMismatch => "digest mismatch",
            FailureKind::LocalIo => "local I/O",
            FailureKind::Protocol => "protocol",
            FailureKind::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind:    FailureKind,
    pub message: String,
}

impl From<&FetchError> for Failure {
    fn from(err: &FetchError) -> Self {
        Self {
            kind:    err.kind(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeState {
    Succeeded,
    Skipped,
    Failed(Failure),
}

/// Terminal result of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    pub path:              String,
    pub state:             OutcomeState,
    /// Bytes received over the network, including discarded attempts.
    pub bytes_transferred: u64,
    /// Attempts spent; 0 for skipped files.
    pub attempts:          u32,
}

impl TransferOutcome {
    pub fn skipped(path: impl Into<String>) -> Self {
        Self {
            path:              path.into(),
            state:             OutcomeState::Skipped,
            bytes_transferred: 0,
            attempts:          0,
        }
    }

    pub fn failed(path: impl Into<String>, err: &FetchError, bytes: u64, attempts: u32) -> Self {
        Self {
            path: path.into(),
            state: OutcomeState::Failed(Failure::from(err)),
            bytes_transferred: bytes,
            attempts,
        }
    }

    pub fn is_failed(&self) -> bool { matches!(self.state, OutcomeState::Failed(_)) }

    pub fn failure(&self) -> Option<&Failure> {
        match &self.state {
            OutcomeState::Failed(failure) => Some(failure),
            _ => None,
        }
    }
}
