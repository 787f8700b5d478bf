//! Transaction record types for AadhaarChain
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fmt;

/// Marker carried by the genesis block instead of transaction records.
pub const GENESIS_MESSAGE: &str = "Genesis Block";

/// Outcome attached to a record when it enters the pending buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerificationStatus {
    Verified,
    Rejected,
}

impl VerificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerificationStatus::Verified => "VERIFIED",
            VerificationStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One identity-verification event. Immutable once buffered.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TransactionRecord {
    pub subject_id: String,
    pub transaction_type: String,
    pub recorded_at: DateTime<Utc>,
    pub verification_status: VerificationStatus,
}

impl TransactionRecord {
    pub fn new(
        subject_id: impl Into<String>,
        transaction_type: impl Into<String>,
        verification_status: VerificationStatus,
    ) -> Self {
        TransactionRecord {
            subject_id: subject_id.into(),
            transaction_type: transaction_type.into(),
            recorded_at: Utc::now(),
            verification_status,
        }
    }

    /// Calculate the hash of this record
    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update("record".as_bytes());
        update_len_prefixed(&mut hasher, self.subject_id.as_bytes());
        update_len_prefixed(&mut hasher, self.transaction_type.as_bytes());
        hasher.update(timestamp_nanos(&self.recorded_at).to_le_bytes());
        update_len_prefixed(&mut hasher, self.verification_status.as_str().as_bytes());
        hasher.finalize().into()
    }

    pub fn hash_str(&self) -> String {
        hex::encode(self.hash())
    }
}

/// Contents of a ledger block.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockPayload {
    Genesis { message: String },
    Records { records: Vec<TransactionRecord> },
}

impl BlockPayload {
    pub fn genesis() -> Self {
        BlockPayload::Genesis {
            message: GENESIS_MESSAGE.to_string(),
        }
    }

    /// Records carried by this payload; empty for genesis.
    pub fn records(&self) -> &[TransactionRecord] {
        match self {
            BlockPayload::Genesis { .. } => &[],
            BlockPayload::Records { records } => records,
        }
    }

    pub fn is_genesis(&self) -> bool {
        matches!(self, BlockPayload::Genesis { .. })
    }

    /// Digest over the payload, folded into the block's content hash.
    pub fn digest(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        match self {
            BlockPayload::Genesis { message } => {
                hasher.update("genesis".as_bytes());
                update_len_prefixed(&mut hasher, message.as_bytes());
            }
            BlockPayload::Records { records } => {
                hasher.update("records".as_bytes());
                hasher.update((records.len() as u64).to_le_bytes());
                for record in records {
                    hasher.update(record.hash());
                }
            }
        }
        hasher.finalize().into()
    }
}

/// Nanoseconds since the epoch, saturating outside the representable range.
pub(crate) fn timestamp_nanos(at: &DateTime<Utc>) -> i64 {
    at.timestamp_nanos_opt()
        .unwrap_or_else(|| at.timestamp_micros().saturating_mul(1_000))
}

// Length prefixes keep ("ab", "c") and ("a", "bc") from hashing alike.
fn update_len_prefixed(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}
