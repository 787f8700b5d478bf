use crate::error::ChainError;
use crate::miner::{self, DEFAULT_MAX_NONCE, MAX_DIFFICULTY};
use crate::transaction::types::timestamp_nanos;
use crate::transaction::{BlockPayload, TransactionRecord, VerificationStatus};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use sha2::{Digest, Sha256};
use tracing::info;

use super::validation::validate_chain;

/// Sentinel `previous_hash` of the genesis block.
pub const GENESIS_PREVIOUS_HASH: &str = "0";

pub const DEFAULT_DIFFICULTY: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    pub sealed_at: DateTime<Utc>,
    pub payload: BlockPayload,
    pub previous_hash: String,
    pub nonce: u64,
    pub content_hash: String,
}

impl Block {
    /// Build an unsealed block. The hash is valid immediately; sealing only
    /// moves the nonce until the hash also satisfies the difficulty.
    pub fn new(previous_hash: String, payload: BlockPayload) -> Self {
        let mut block = Block {
            sealed_at: Utc::now(),
            payload,
            previous_hash,
            nonce: 0,
            content_hash: String::new(),
        };
        block.content_hash = block.recompute_hash();
        block
    }

    /// Hex SHA-256 over `(sealed_at, payload, previous_hash, nonce)`.
    pub fn recompute_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(timestamp_nanos(&self.sealed_at).to_le_bytes());
        hasher.update(self.payload.digest());
        hasher.update((self.previous_hash.len() as u64).to_le_bytes());
        hasher.update(self.previous_hash.as_bytes());
        hasher.update(self.nonce.to_le_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn seal(&mut self, difficulty: usize, max_nonce: u64) -> Result<(), ChainError> {
        miner::mine_block(self, difficulty, max_nonce)
    }

    pub fn meets_difficulty(&self, difficulty: usize) -> bool {
        miner::meets_difficulty(&self.content_hash, difficulty)
    }

    pub fn records(&self) -> &[TransactionRecord] {
        self.payload.records()
    }
}

/// In-memory ledger: sealed blocks plus a buffer of pending records.
///
/// Sealers serialize on `seal_lock`; the block list is only write-locked for
/// the final push, so readers never wait on a proof-of-work search.
pub struct Blockchain {
    blocks: RwLock<Vec<Block>>,
    pending: Mutex<Vec<TransactionRecord>>,
    seal_lock: Mutex<()>,
    difficulty: usize,
    max_nonce: u64,
}

impl Blockchain {
    /// Create a new `Blockchain` with a sealed genesis block.
    pub fn new(difficulty: usize) -> Result<Self, ChainError> {
        Self::with_max_nonce(difficulty, DEFAULT_MAX_NONCE)
    }

    pub fn with_max_nonce(difficulty: usize, max_nonce: u64) -> Result<Self, ChainError> {
        if difficulty > MAX_DIFFICULTY {
            return Err(ChainError::ConfigError(format!(
                "difficulty {} exceeds maximum {}",
                difficulty, MAX_DIFFICULTY
            )));
        }

        let genesis_block = Self::create_genesis_block(difficulty, max_nonce)?;
        info!(hash = %genesis_block.content_hash, difficulty, "ledger.genesis");

        Ok(Blockchain {
            blocks: RwLock::new(vec![genesis_block]),
            pending: Mutex::new(Vec::new()),
            seal_lock: Mutex::new(()),
            difficulty,
            max_nonce,
        })
    }

    fn create_genesis_block(difficulty: usize, max_nonce: u64) -> Result<Block, ChainError> {
        let mut genesis_block = Block::new(GENESIS_PREVIOUS_HASH.to_string(), BlockPayload::genesis());
        genesis_block.seal(difficulty, max_nonce)?;
        Ok(genesis_block)
    }

    pub fn difficulty(&self) -> usize {
        self.difficulty
    }

    pub fn len(&self) -> usize {
        self.blocks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.read().is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    pub fn latest(&self) -> Result<Block, ChainError> {
        self.blocks.read().last().cloned().ok_or(ChainError::EmptyLedger)
    }

    pub fn block(&self, index: usize) -> Option<Block> {
        self.blocks.read().get(index).cloned()
    }

    /// Consistent copy of the sealed blocks, independent of any seal in flight.
    pub fn snapshot(&self) -> Vec<Block> {
        self.blocks.read().clone()
    }

    pub fn add_pending(
        &self,
        subject_id: impl Into<String>,
        transaction_type: impl Into<String>,
        verification_status: VerificationStatus,
    ) {
        let record = TransactionRecord::new(subject_id, transaction_type, verification_status);
        self.pending.lock().push(record);
    }

    /// Seal every pending record into a new block.
    ///
    /// Returns `Ok(None)` when there is nothing to seal.
    pub fn seal_pending(&self) -> Result<Option<Block>, ChainError> {
        let _sealing = self.seal_lock.lock();

        let records = std::mem::take(&mut *self.pending.lock());
        if records.is_empty() {
            return Ok(None);
        }
        let restore = records.len();
        self.seal_records(records, restore).map(Some)
    }

    /// Buffer one record and seal it, together with anything already
    /// pending, inside a single sealing region.
    ///
    /// If the seal fails the new record is dropped; only the records that
    /// were pending beforehand go back to the buffer.
    pub fn record_and_seal(
        &self,
        subject_id: impl Into<String>,
        transaction_type: impl Into<String>,
        verification_status: VerificationStatus,
    ) -> Result<Block, ChainError> {
        let _sealing = self.seal_lock.lock();

        let mut records = std::mem::take(&mut *self.pending.lock());
        let restore = records.len();
        records.push(TransactionRecord::new(subject_id, transaction_type, verification_status));
        self.seal_records(records, restore)
    }

    // Caller must hold `seal_lock`. On failure the first `restore` records go
    // back to pending, ahead of anything buffered since; the rest are dropped.
    fn seal_records(&self, records: Vec<TransactionRecord>, restore: usize) -> Result<Block, ChainError> {
        let previous_hash = match self.latest() {
            Ok(block) => block.content_hash,
            Err(e) => {
                self.restore_pending(records, restore);
                return Err(e);
            }
        };
        let mut block = Block::new(previous_hash, BlockPayload::Records { records });

        if let Err(e) = block.seal(self.difficulty, self.max_nonce) {
            if let BlockPayload::Records { records } = block.payload {
                self.restore_pending(records, restore);
            }
            return Err(e);
        }

        let mut blocks = self.blocks.write();
        blocks.push(block.clone());
        info!(
            index = blocks.len() - 1,
            hash = %block.content_hash,
            nonce = block.nonce,
            records = block.records().len(),
            "ledger.sealed"
        );
        Ok(block)
    }

    fn restore_pending(&self, mut records: Vec<TransactionRecord>, restore: usize) {
        records.truncate(restore);
        let mut pending = self.pending.lock();
        records.append(&mut *pending);
        *pending = records;
    }

    /// Re-hash and re-link the whole chain, returning the first violation.
    pub fn verify_integrity(&self) -> Result<(), ChainError> {
        validate_chain(&self.snapshot(), self.difficulty)
    }
}

#[cfg(test)]
impl Blockchain {
    /// Ledger whose genesis is sealed but whose every later seal runs out
    /// of nonces at once.
    pub(crate) fn exhausting() -> Self {
        let chain = Self::with_max_nonce(0, 0).expect("difficulty 0 seals immediately");
        Blockchain {
            difficulty: MAX_DIFFICULTY,
            ..chain
        }
    }
}
