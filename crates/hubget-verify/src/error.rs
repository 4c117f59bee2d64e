use std::io;

#[derive(Debug, thiserror::Error)]
pub enum VerificationError {
    #[error("digest mismatch: expected {expected}, got {actual}")]
    Mismatch { expected: String, actual: String },

    #[error("invalid {kind} digest: {value:?}")]
    InvalidDigest { kind: &'static str, value: String },

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, VerificationError>;
