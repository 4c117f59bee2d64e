//! Content digests for verifying downloaded repository files.
//!
//! Hosting services publish one of two digests per file: a SHA-256 of the
//! content for large-file-storage objects, or the git blob id (SHA-1 over a
//! `blob {len}\0` header plus the content) for everything else. [`Digest`]
//! carries either, and [`digest_file`] recomputes one from disk.
//!
//! # Example
//!
//! ```
//! use std::io::Read;
//! use hubget_verify::{Sha256Hasher, VerifiedReader};
//!
//! let data = b"hello world";
//! let expected = Sha256Hasher::digest(b"hello world");
//!
//! let mut reader = VerifiedReader::new(&data[..], Sha256Hasher::new());
//! let mut buffer = Vec::new();
//! reader.read_to_end(&mut buffer).unwrap();
//!
//! reader.finish(&expected).unwrap();
//! ```

pub use self::digest::{Digest, DigestKind};
pub use self::error::{Result, VerificationError};
pub use self::hasher::{AnyHasher, GitBlobHasher, Hasher, Sha256Hasher};
pub use self::reader::{DIGEST_CHUNK_SIZE, VerifiedReader, digest_file, verify_file};

mod digest;
mod error;
mod hasher;
mod reader;
