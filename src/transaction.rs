//! Transaction module split into types and validation for better modularity

pub mod types;
pub mod validation;

pub use types::*;
pub use validation::{is_valid_subject_id, normalize_subject_id, SUBJECT_ID_DIGITS};
