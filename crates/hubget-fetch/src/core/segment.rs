use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::error::{FetchError, Result};

/// A byte range of a file fetched independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Segment index (0-based)
    pub index: u32,
    /// Starting byte offset
    pub start: u64,
    /// Ending byte offset (exclusive)
    pub end:   u64,
}

impl Segment {
    pub fn len(&self) -> u64 { self.end - self.start }

    pub fn is_empty(&self) -> bool { self.start == self.end }

    pub fn range(&self) -> Range<u64> { self.start..self.end }
}

/// Calculate segments for parallel download of a file.
///
/// The remainder is spread over the leading segments, and the count is capped
/// at `file_size` so that no segment of a non-empty file is empty. An empty
/// file yields a single empty segment.
///
/// # Errors
///
/// Returns `InvalidConfig` if `num_segments` is 0.
pub fn calculate_segments(file_size: u64, num_segments: u32) -> Result<Vec<Segment>> {
    if num_segments == 0 {
        return Err(FetchError::InvalidConfig(
            "number of segments must be greater than 0".into(),
        ));
    }

    if file_size == 0 {
        return Ok(vec![Segment {
            index: 0,
            start: 0,
            end:   0,
        }]);
    }

    let num_segments = u64::from(num_segments).min(file_size);
    let segment_size = file_size / num_segments;
    let remainder = file_size % num_segments;

    let mut segments = Vec::with_capacity(num_segments as usize);
    let mut current_offset = 0;

    for i in 0..num_segments {
        let start = current_offset;
        let size = if i < remainder { segment_size + 1 } else { segment_size };
        let end = start + size;
        current_offset = end;

        segments.push(Segment {
            index: i as u32,
            start,
            end,
        });
    }

    Ok(segments)
}

/// How many segments a file gets.
///
/// Only files larger than `threshold` on a server that honours range requests
/// are split; everything else is one stream.
pub fn segment_count(file_size: u64, supports_ranges: bool, threshold: u64, max: usize) -> u32 {
    if !supports_ranges || file_size <= threshold || max <= 1 {
        return 1;
    }
    let max = u32::try_from(max).unwrap_or(u32::MAX);
    u64::from(max).min(file_size) as u32
}
