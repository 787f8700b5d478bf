// Thin re-export module: implementation is in `blockchain/core.rs` so that
// block structure, sealing and integrity checks can evolve separately.

pub mod core;
pub use core::*;
