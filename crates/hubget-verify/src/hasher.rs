use sha1::Sha1;
use sha2::Digest as _;
use sha2::Sha256;

use crate::digest::{Digest, DigestKind};

pub trait Hasher: Send {
    fn update(&mut self, data: &[u8]);
    fn finalize(self) -> Vec<u8>;
}

pub struct Sha256Hasher(Sha256);

impl Hasher for Sha256Hasher {
    fn update(&mut self, data: &[u8]) { self.0.update(data); }
    fn finalize(self) -> Vec<u8> { self.0.finalize().to_vec() }
}

impl Default for Sha256Hasher {
    fn default() -> Self { Self::new() }
}

impl Sha256Hasher {
    pub fn new() -> Self { Self(Sha256::new()) }

    pub fn digest(data: &[u8]) -> Vec<u8> { Sha256::digest(data).to_vec() }
}

/// Git object id of a blob: SHA-1 over `"blob {len}\0"` followed by the content.
///
/// The length is part of the header, so it must be known before the first byte
/// is hashed.
pub struct GitBlobHasher(Sha1);

impl GitBlobHasher {
    pub fn new(len: u64) -> Self {
        let mut inner = Sha1::new();
        inner.update(format!("blob {len}\0").as_bytes());
        Self(inner)
    }

    pub fn digest(data: &[u8]) -> Vec<u8> {
        let mut hasher = Self::new(data.len() as u64);
        hasher.update(data);
        hasher.finalize()
    }
}

impl Hasher for GitBlobHasher {
    fn update(&mut self, data: &[u8]) { self.0.update(data); }
    fn finalize(self) -> Vec<u8> { self.0.finalize().to_vec() }
}

/// Hasher for whichever algorithm a manifest entry was published with.
pub enum AnyHasher {
    Sha256(Sha256Hasher),
    GitSha1(GitBlobHasher),
}

impl AnyHasher {
    pub fn new(kind: DigestKind, len: u64) -> Self {
        match kind {
            DigestKind::Sha256 => Self::Sha256(Sha256Hasher::new()),
            DigestKind::GitSha1 => Self::GitSha1(GitBlobHasher::new(len)),
        }
    }

    pub fn kind(&self) -> DigestKind {
        match self {
            Self::Sha256(_) => DigestKind::Sha256,
            Self::GitSha1(_) => DigestKind::GitSha1,
        }
    }

    /// Finalizes into a typed [`Digest`] of the same algorithm.
    pub fn finish(self) -> Digest {
        match self {
            Self::Sha256(h) => {
                let mut out = [0u8; 32];
                out.copy_from_slice(&h.0.finalize());
                Digest::Sha256(out)
            }
            Self::GitSha1(h) => {
                let mut out = [0u8; 20];
                out.copy_from_slice(&h.0.finalize());
                Digest::GitSha1(out)
            }
        }
    }
}

impl Hasher for AnyHasher {
    fn update(&mut self, data: &[u8]) {
        match self {
            Self::Sha256(h) => h.update(data),
            Self::GitSha1(h) => h.update(data),
        }
    }

    fn finalize(self) -> Vec<u8> {
        match self {
            Self::Sha256(h) => h.finalize(),
            Self::GitSha1(h) => h.finalize(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha256_hasher() {
        let mut hasher = Sha256Hasher::new();
        hasher.update(b"hello ");
        hasher.update(b"world");
        assert_eq!(
            hex::encode(hasher.finalize()),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn test_git_blob_hasher_matches_git() {
        // `printf 'hello world' | git hash-object --stdin`
        assert_eq!(
            hex::encode(GitBlobHasher::digest(b"hello world")),
            "95d09f2b10159347eece71399a7e2e907ea3df4f"
        );
        // `git hash-object /dev/null`
        assert_eq!(
            hex::encode(GitBlobHasher::digest(b"")),
            "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"
        );
    }

    #[test]
    fn test_any_hasher_finish_keeps_kind() {
        let mut hasher = AnyHasher::new(DigestKind::GitSha1, 11);
        hasher.update(b"hello world");
        let digest = hasher.finish();
        assert_eq!(digest.kind(), DigestKind::GitSha1);
        assert_eq!(digest.to_string(), "95d09f2b10159347eece71399a7e2e907ea3df4f");
    }
}
