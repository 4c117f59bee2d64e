//! Concurrent, resumable, digest-verified downloads of hosted repositories.
//!
//! # Architecture
//!
//! This crate follows the three-layer pattern:
//! - [`data`] - Immutable configuration and types
//! - [`core`] - Pure transformations
//! - [`effects`] - I/O operations with trait abstraction
//!
//! # Pipeline
//!
//! [`ManifestResolver`] pins the revision and lists files, [`PatternSet`]
//! filters them, [`TransferPlanner`] checks what is already on disk,
//! [`Scheduler`] admits files to [`ChunkedFetcher`]s, and [`Reporter`]
//! collects the outcomes. [`Downloader`] wires the stages together.
//!
//! # Key Features
//!
//! - **Segmented**: large files are fetched as concurrent byte ranges into one
//!   pre-sized part file
//! - **Resumable**: completed segments are checkpointed and never re-requested
//! - **Verified**: nothing reaches its final path before its digest matches
//! - **Bounded**: file and connection semaphores cap concurrency

pub mod core;
pub mod data;
pub mod effects;
mod error;

pub use self::core::{
    DEFAULT_ENDPOINT, Endpoint, PatternSet, Report, Reporter, RetryPolicy, Segment, Summary,
    calculate_segments, check_range_response, check_status, is_redirect, retry_delay,
    segment_count,
};
pub use data::{
    Failure, FailureKind, FetchOptions, FetchPhase, LocalState, Manifest, OutcomeState, Progress,
    RemoteFileEntry, RepoKind, RepositoryRef, ResolvedRepository, TransferOutcome, TransferTask,
};
pub use effects::{
    BoxStream, ChunkedFetcher, ClientConfig, DownloadJob, Downloader, HttpClient,
    ManifestResolver, Plan, ProxyConfig, RemoteHead, Retrier, Scheduler, SegmentCheckpoint,
    TransferPlanner,
};

#[cfg(feature = "reqwest")]
pub use effects::ReqwestClient;

pub use error::{FetchError, Result};
