//! Immutable data types for repository downloads.
//!
//! Repository references, the resolved manifest, options, progress snapshots
//! and per-file tasks and outcomes. These are passed between the pure core and
//! the effects layer without mutation.

pub mod manifest;
pub mod options;
pub mod progress;
pub mod repo;
pub mod task;

pub use manifest::{Manifest, RemoteFileEntry};
pub use options::{FetchOptions, FetchPhase};
pub use progress::Progress;
pub use repo::{RepoKind, RepositoryRef, ResolvedRepository};
pub use task::{Failure, FailureKind, LocalState, OutcomeState, TransferOutcome, TransferTask};
