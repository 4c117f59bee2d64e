pub mod atomic_write;
pub mod place;

pub use atomic_write::{AtomicWriteOptions, atomic_read, atomic_write};
pub use place::place_file;
