//! Verification service: the single owner of the ledger and the OTP gate.
//!
//! One instance is built at startup and shared by handle (`Arc`) with every
//! request handler. It is the only code that mutates either component.

use crate::blockchain::{Block, Blockchain};
use crate::config::LedgerConfig;
use crate::error::ChainError;
use crate::history::{HistoryPage, HistoryQuery};
use crate::otp::OtpStore;
use crate::transaction::{normalize_subject_id, TransactionRecord, VerificationStatus};
use serde::Serialize;
use tracing::info;

pub const MSG_VERIFIED: &str = "Transaction verified and added to blockchain";
pub const MSG_OTP_EXPIRED: &str = "OTP expired. Please generate a new OTP";
pub const MSG_VERIFICATION_FAILED: &str = "Verification failed";
pub const MSG_NOT_SEALED: &str = "Transaction could not be sealed. Please generate a new OTP";

/// A code handed out for one subject.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredential {
    pub subject_id: String,
    pub code: String,
}

/// Result of one verification attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationOutcome {
    /// The record was committed and sealed into this block.
    Verified(Block),
    /// Nothing was committed. `credential_live` tells whether the subject
    /// still holds a usable code after the attempt.
    Rejected {
        reason: ChainError,
        credential_live: bool,
    },
}

impl VerificationOutcome {
    /// Rejection for a failed attempt. Only a wrong code leaves the
    /// credential in place; every other failure happens after the gate
    /// evicted it or before any credential was looked up.
    pub fn rejected(reason: ChainError) -> Self {
        VerificationOutcome::Rejected {
            credential_live: matches!(reason, ChainError::CredentialMismatch),
            reason,
        }
    }

    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationOutcome::Verified(_))
    }

    pub fn message(&self) -> &'static str {
        match self {
            VerificationOutcome::Verified(_) => MSG_VERIFIED,
            VerificationOutcome::Rejected {
                reason: ChainError::MiningExhausted { .. },
                ..
            } => MSG_NOT_SEALED,
            VerificationOutcome::Rejected {
                credential_live: false,
                ..
            } => MSG_OTP_EXPIRED,
            VerificationOutcome::Rejected { .. } => MSG_VERIFICATION_FAILED,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainStats {
    pub height: usize,
    pub difficulty: usize,
    pub pending: usize,
    pub live_credentials: usize,
}

pub struct VerificationService {
    blockchain: Blockchain,
    otp_store: OtpStore,
}

impl VerificationService {
    pub fn new(difficulty: usize) -> Result<Self, ChainError> {
        Ok(Self::with_parts(Blockchain::new(difficulty)?, OtpStore::new()))
    }

    pub fn from_config(config: &LedgerConfig) -> Result<Self, ChainError> {
        let blockchain = Blockchain::with_max_nonce(config.difficulty, config.max_nonce)?;
        Ok(Self::with_parts(blockchain, OtpStore::new()))
    }

    pub fn with_parts(blockchain: Blockchain, otp_store: OtpStore) -> Self {
        Self {
            blockchain,
            otp_store,
        }
    }

    pub fn blockchain(&self) -> &Blockchain {
        &self.blockchain
    }

    pub fn otp_store(&self) -> &OtpStore {
        &self.otp_store
    }

    /// Validate the subject id and issue a code for it.
    ///
    /// An invalid id leaves both the gate and the ledger untouched.
    pub fn issue_credential(&self, raw_subject_id: &str) -> Result<IssuedCredential, ChainError> {
        let subject_id = normalize_subject_id(raw_subject_id)?;
        let code = self.otp_store.issue(&subject_id);
        Ok(IssuedCredential { subject_id, code })
    }

    /// Consume the subject's code and, on success, commit and seal a
    /// `VERIFIED` record immediately.
    ///
    /// The code is evicted in the same step that accepts it; a failed seal
    /// still leaves the code spent.
    pub fn process_transaction(
        &self,
        raw_subject_id: &str,
        transaction_type: &str,
        submitted_code: &str,
    ) -> Result<Block, ChainError> {
        let subject_id = normalize_subject_id(raw_subject_id)?;
        self.otp_store.consume(&subject_id, submitted_code)?;

        let block = self.blockchain.record_and_seal(
            subject_id.as_str(),
            transaction_type,
            VerificationStatus::Verified,
        )?;
        info!(
            subject_id = %subject_id,
            transaction_type,
            block = %block.content_hash,
            "verification.committed"
        );
        Ok(block)
    }

    /// [`process_transaction`](Self::process_transaction) folded into an
    /// outcome that carries the caller-facing message.
    pub fn submit(
        &self,
        raw_subject_id: &str,
        transaction_type: &str,
        submitted_code: &str,
    ) -> VerificationOutcome {
        match self.process_transaction(raw_subject_id, transaction_type, submitted_code) {
            Ok(block) => VerificationOutcome::Verified(block),
            Err(reason) => VerificationOutcome::rejected(reason),
        }
    }

    pub fn has_credential(&self, raw_subject_id: &str) -> bool {
        normalize_subject_id(raw_subject_id)
            .map(|subject_id| self.otp_store.contains(&subject_id))
            .unwrap_or(false)
    }

    /// Every sealed record for the subject, oldest first. Genesis is skipped.
    pub fn transaction_history(&self, raw_subject_id: &str) -> Result<Vec<TransactionRecord>, ChainError> {
        let subject_id = normalize_subject_id(raw_subject_id)?;
        Ok(self
            .blockchain
            .snapshot()
            .iter()
            .skip(1)
            .flat_map(|block| block.records())
            .filter(|record| record.subject_id == subject_id)
            .cloned()
            .collect())
    }

    pub fn query_history(
        &self,
        raw_subject_id: &str,
        query: &HistoryQuery,
    ) -> Result<HistoryPage, ChainError> {
        query.apply(self.transaction_history(raw_subject_id)?)
    }

    pub fn verify_integrity(&self) -> Result<(), ChainError> {
        self.blockchain.verify_integrity()
    }

    pub fn stats(&self) -> ChainStats {
        ChainStats {
            height: self.blockchain.len(),
            difficulty: self.blockchain.difficulty(),
            pending: self.blockchain.pending_len(),
            live_credentials: self.otp_store.len(),
        }
    }
}
