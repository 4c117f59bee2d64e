//! Filesystem primitives for repository downloads.
//!
//! - [`StagingArea`] maps remote paths to their final location and to the
//!   hidden part/checkpoint files used while a transfer is in progress.
//! - [`place_file`] publishes a verified part file with a single rename.
//! - [`atomic_write`] replaces small state files (checkpoints) atomically.

mod error;
mod primitives;
mod staging;

pub use error::{Error, Result};
pub use primitives::{AtomicWriteOptions, atomic_read, atomic_write, place_file};
pub use staging::{STAGING_DIR, StagingArea, validate_relative};
