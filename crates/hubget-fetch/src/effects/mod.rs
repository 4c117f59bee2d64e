//! I/O operations for repository downloads.
//!
//! Network access goes through the [`HttpClient`] trait so the whole pipeline
//! can run against an in-memory server in tests.

mod checkpoint;
mod downloader;
mod fetcher;
mod http;
mod manifest;
mod planner;
mod retry;
mod scheduler;

pub use checkpoint::SegmentCheckpoint;
pub use downloader::{DownloadJob, Downloader};
pub use fetcher::ChunkedFetcher;
pub use http::{BoxStream, ClientConfig, HttpClient, ProxyConfig, RemoteHead};
pub use manifest::ManifestResolver;
pub use planner::{Plan, TransferPlanner};
pub use retry::{Attempted, Retrier, bounded};
pub use scheduler::Scheduler;

#[cfg(feature = "reqwest")]
pub use http::ReqwestClient;
