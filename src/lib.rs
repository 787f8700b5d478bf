//! AadhaarChain - an OTP-gated, proof-of-work sealed ledger for identity
//! verification events
//!
//! # Architecture
//!
//! The crate is organized into logical modules:
//!
//! ## Core Ledger
//! - [`blockchain`] - Blocks, the append-only ledger and integrity checks
//! - [`transaction`] - Transaction records and subject id validation
//!
//! ## Proof of Work
//! - [`miner`] - Nonce search and difficulty predicate
//!
//! ## Credentials
//! - [`otp`] - One-time code issuance, expiry and single-use consumption
//!
//! ## Orchestration
//! - [`service`] - Verification service owning the ledger and the gate
//! - [`history`] - Filtering, sorting and pagination of history queries
//!
//! ## Integration
//! - [`api`] - HTTP endpoints (feature `api`)
//!
//! ## Configuration & Utilities
//! - [`config`] - Configuration management
//! - [`error`] - Error types

#![forbid(unsafe_code)]

// ============================================================================
// Core Ledger
// ============================================================================
pub mod blockchain;
pub mod transaction;

// ============================================================================
// Proof of Work
// ============================================================================
pub mod miner;

// ============================================================================
// Credentials
// ============================================================================
pub mod otp;

// ============================================================================
// Orchestration
// ============================================================================
pub mod history;
pub mod service;

// ============================================================================
// Integration
// ============================================================================
#[cfg(feature = "api")]
pub mod api;

// ============================================================================
// Configuration & Utilities
// ============================================================================
pub mod config;
pub mod error;
