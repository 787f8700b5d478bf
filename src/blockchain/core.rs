// core.rs splits ledger responsibilities into submodules: block and ledger
// structure live in `chain`, the integrity walk in `validation`.
pub mod chain;
pub mod validation;

pub use chain::*;
pub use validation::*;
