//! Pure transformations for repository downloads.
//!
//! Nothing here performs I/O: pattern decisions, URL layout, segment
//! partitioning, backoff arithmetic, status classification and outcome
//! aggregation.

mod endpoint;
mod pattern;
mod report;
mod retry;
mod segment;
mod validation;

pub use endpoint::{DEFAULT_ENDPOINT, Endpoint};
pub use pattern::PatternSet;
pub use report::{Report, Reporter, Summary};
pub use retry::{RetryPolicy, retry_delay};
pub use segment::{Segment, calculate_segments, segment_count};
pub use validation::{check_range_response, check_status, is_redirect};
