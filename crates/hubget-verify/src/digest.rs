use std::fmt;

use crate::{Result, VerificationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DigestKind {
    /// SHA-256 of the raw content, published for large-file-storage objects.
    Sha256,
    /// Git blob object id, published for regular files.
    GitSha1,
}

impl DigestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DigestKind::Sha256 => "sha256",
            DigestKind::GitSha1 => "git-sha1",
        }
    }
}

impl fmt::Display for DigestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Content digest of a remote file, tagged with its algorithm.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub enum Digest {
    Sha256([u8; 32]),
    GitSha1([u8; 20]),
}

impl Digest {
    /// Parses a hex digest of the given kind. Surrounding whitespace is ignored,
    /// case is not significant.
    pub fn from_hex(kind: DigestKind, s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || VerificationError::InvalidDigest {
            kind:  kind.as_str(),
            value: s.to_string(),
        };
        let bytes = hex::decode(s).map_err(|_| invalid())?;
        Self::from_bytes(kind, &bytes).ok_or_else(invalid)
    }

    pub fn from_bytes(kind: DigestKind, bytes: &[u8]) -> Option<Self> {
        match kind {
            DigestKind::Sha256 => bytes.try_into().ok().map(Digest::Sha256),
            DigestKind::GitSha1 => bytes.try_into().ok().map(Digest::GitSha1),
        }
    }

    pub fn kind(&self) -> DigestKind {
        match self {
            Digest::Sha256(_) => DigestKind::Sha256,
            Digest::GitSha1(_) => DigestKind::GitSha1,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Digest::Sha256(b) => b,
            Digest::GitSha1(b) => b,
        }
    }

    pub fn to_hex(&self) -> String { hex::encode(self.as_bytes()) }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.to_hex()) }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sha256() {
        let d = Digest::from_hex(
            DigestKind::Sha256,
            " B94D27B9934D3E08A52E52D7DA7DABFAC484EFE37A5380EE9088F7ACE2EFCDE9\n",
        )
        .unwrap();
        assert_eq!(d.kind(), DigestKind::Sha256);
        assert_eq!(
            d.to_string(),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn parse_rejects_wrong_width() {
        let sha1 = "95d09f2b10159347eece71399a7e2e907ea3df4f";
        assert!(Digest::from_hex(DigestKind::GitSha1, sha1).is_ok());
        assert!(matches!(
            Digest::from_hex(DigestKind::Sha256, sha1),
            Err(VerificationError::InvalidDigest { kind: "sha256", .. })
        ));
    }

    #[test]
    fn parse_rejects_non_hex() {
        assert!(Digest::from_hex(DigestKind::GitSha1, "zz").is_err());
    }
}
