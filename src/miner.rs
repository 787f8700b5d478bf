//! Proof-of-work search for ledger blocks
//!
//! Difficulty is the number of leading `'0'` hex characters a block's content
//! hash must carry. The search walks the nonce upward from wherever the block
//! currently stands, so it is deterministic for identical inputs.

use crate::blockchain::Block;
use crate::error::ChainError;
use std::time::Instant;
use tracing::debug;

/// Upper bound on nonces tried before a seal gives up.
pub const DEFAULT_MAX_NONCE: u64 = 100_000_000;

/// A SHA-256 hex digest has 64 characters.
pub const MAX_DIFFICULTY: usize = 64;

/// Check whether `hash` starts with `difficulty` zero hex characters.
pub fn meets_difficulty(hash: &str, difficulty: usize) -> bool {
    hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
}

/// Increment the block's nonce until its hash satisfies `difficulty`.
///
/// Returns `MiningExhausted` once the nonce passes `max_nonce`; the block is
/// left at the last nonce tried.
pub fn mine_block(block: &mut Block, difficulty: usize, max_nonce: u64) -> Result<(), ChainError> {
    let start = Instant::now();
    let start_nonce = block.nonce;

    while !meets_difficulty(&block.content_hash, difficulty) {
        if block.nonce >= max_nonce {
            return Err(ChainError::MiningExhausted { max_nonce });
        }
        block.nonce += 1;
        block.content_hash = block.recompute_hash();
    }

    debug!(
        difficulty,
        nonce = block.nonce,
        attempts = block.nonce - start_nonce,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "miner.sealed"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::BlockPayload;

    #[test]
    fn test_meets_difficulty() {
        assert!(meets_difficulty("00ab", 2));
        assert!(!meets_difficulty("0ab0", 2));
        assert!(meets_difficulty("abcd", 0));
        assert!(!meets_difficulty("00", 3));
    }

    #[test]
    fn test_mine_block_reaches_target() {
        let mut block = Block::new("0".to_string(), BlockPayload::genesis());
        mine_block(&mut block, 2, DEFAULT_MAX_NONCE).unwrap();
        assert!(block.content_hash.starts_with("00"));
        assert_eq!(block.content_hash, block.recompute_hash());
    }

    #[test]
    fn test_mining_is_deterministic() {
        let mut first = Block::new("0".to_string(), BlockPayload::genesis());
        let mut second = first.clone();
        mine_block(&mut first, 2, DEFAULT_MAX_NONCE).unwrap();
        mine_block(&mut second, 2, DEFAULT_MAX_NONCE).unwrap();
        assert_eq!(first.nonce, second.nonce);
        assert_eq!(first.content_hash, second.content_hash);
    }

    #[test]
    fn test_mining_gives_up_at_bound() {
        let mut block = Block::new("0".to_string(), BlockPayload::genesis());
        let result = mine_block(&mut block, MAX_DIFFICULTY, 10);
        assert_eq!(result, Err(ChainError::MiningExhausted { max_nonce: 10 }));
        assert_eq!(block.nonce, 10);
    }
}
