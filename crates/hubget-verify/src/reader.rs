use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use crate::{AnyHasher, Digest, DigestKind, Hasher, Result, VerificationError};

/// Read size used when hashing files on disk.
pub const DIGEST_CHUNK_SIZE: usize = 1024 * 1024;

/// Streaming reader that hashes data as it passes through.
/// Wraps any `Read` source for single-pass verification.
pub struct VerifiedReader<R, H> {
    reader: R,
    hasher: H,
}

impl<R, H> VerifiedReader<R, H> {
    pub fn new(reader: R, hasher: H) -> Self { Self { reader, hasher } }
}

impl<R: Read, H: Hasher> Read for VerifiedReader<R, H> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.reader.read(buf)?;
        if n > 0 {
            self.hasher.update(&buf[..n]);
        }
        Ok(n)
    }
}

impl<R: Read, H: Hasher> VerifiedReader<R, H> {
    /// Finalize verification against expected hash.
    /// Returns error on mismatch.
    pub fn finish(self, expected: &[u8]) -> Result<()> {
        let actual = self.hasher.finalize();
        if actual == expected {
            Ok(())
        } else {
            Err(VerificationError::Mismatch {
                expected: hex::encode(expected),
                actual:   hex::encode(actual),
            })
        }
    }
}

impl<R: Read> VerifiedReader<R, AnyHasher> {
    pub fn into_digest(self) -> Digest { self.hasher.finish() }
}

/// Hashes the file at `path` with the given algorithm, reading it in
/// [`DIGEST_CHUNK_SIZE`] pieces.
///
/// This is blocking; async callers should run it on a blocking thread.
pub fn digest_file(path: impl AsRef<Path>, kind: DigestKind) -> io::Result<Digest> {
    let file = File::open(path.as_ref())?;
    let len = file.metadata()?.len();
    let mut reader = VerifiedReader::new(file, AnyHasher::new(kind, len));
    let mut buf = vec![0u8; DIGEST_CHUNK_SIZE];
    while reader.read(&mut buf)? > 0 {}
    Ok(reader.into_digest())
}

/// Hashes the file at `path` and compares it to `expected`.
pub fn verify_file(path: impl AsRef<Path>, expected: &Digest) -> Result<()> {
    let file = File::open(path.as_ref())?;
    let len = file.metadata()?.len();
    let mut reader = VerifiedReader::new(file, AnyHasher::new(expected.kind(), len));
    let mut buf = vec![0u8; DIGEST_CHUNK_SIZE];
    while reader.read(&mut buf)? > 0 {}
    reader.finish(expected.as_bytes())
}
