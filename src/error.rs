//! Error types for AadhaarChain

use std::fmt;

/// Which check of the integrity walk a block failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Stored content hash no longer matches the block's fields.
    HashMismatch,
    /// `previous_hash` does not point at the predecessor's content hash.
    BrokenLink,
    /// Content hash lacks the leading zeros required by the ledger difficulty.
    InsufficientWork,
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ViolationKind::HashMismatch => write!(f, "content hash mismatch"),
            ViolationKind::BrokenLink => write!(f, "broken previous-hash link"),
            ViolationKind::InsufficientWork => write!(f, "insufficient proof of work"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    #[error("Invalid Aadhaar number: {0}")]
    InvalidSubjectFormat(String),
    #[error("OTP absent or expired")]
    CredentialAbsentOrExpired,
    #[error("OTP mismatch")]
    CredentialMismatch,
    #[error("Chain integrity violation at block {index}: {kind}")]
    ChainIntegrityViolation { index: usize, kind: ViolationKind },
    #[error("Ledger has no blocks")]
    EmptyLedger,
    #[error("Mining gave up after {max_nonce} nonces")]
    MiningExhausted { max_nonce: u64 },
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(String),
}

impl From<std::io::Error> for ChainError {
    fn from(err: std::io::Error) -> Self {
        ChainError::IoError(err.to_string())
    }
}

impl From<toml::de::Error> for ChainError {
    fn from(err: toml::de::Error) -> Self {
        ChainError::ConfigError(err.to_string())
    }
}

/// Convenience alias used across the crate
pub type Result<T> = std::result::Result<T, ChainError>;
