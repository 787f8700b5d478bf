use crate::error::{ChainError, ViolationKind};
use tracing::warn;

use super::chain::{Block, GENESIS_PREVIOUS_HASH};

/// Full O(n) integrity walk over a sequence of blocks.
///
/// Every block must hash to its stored `content_hash` and carry the ledger
/// difficulty; every block after genesis must point at its predecessor.
/// Tampering with any field of block `i` is therefore reported at `i` or,
/// when the stored hash was rewritten to match, at `i + 1`.
pub fn validate_chain(blocks: &[Block], difficulty: usize) -> Result<(), ChainError> {
    let Some(genesis) = blocks.first() else {
        return Err(ChainError::EmptyLedger);
    };

    if genesis.previous_hash != GENESIS_PREVIOUS_HASH {
        return Err(violation(0, ViolationKind::BrokenLink));
    }
    validate_block(0, genesis, difficulty)?;

    for (offset, pair) in blocks.windows(2).enumerate() {
        let index = offset + 1;
        let (previous, current) = (&pair[0], &pair[1]);

        validate_block(index, current, difficulty)?;

        if current.previous_hash != previous.content_hash {
            return Err(violation(index, ViolationKind::BrokenLink));
        }
    }
    Ok(())
}

fn validate_block(index: usize, block: &Block, difficulty: usize) -> Result<(), ChainError> {
    if block.recompute_hash() != block.content_hash {
        return Err(violation(index, ViolationKind::HashMismatch));
    }
    if !block.meets_difficulty(difficulty) {
        return Err(violation(index, ViolationKind::InsufficientWork));
    }
    Ok(())
}

fn violation(index: usize, kind: ViolationKind) -> ChainError {
    warn!(index, %kind, "ledger.integrity_violation");
    ChainError::ChainIntegrityViolation { index, kind }
}
