//! Subject identifier validation, separated from record definitions
use crate::error::ChainError;

/// Number of digits in a normalized Aadhaar number.
pub const SUBJECT_ID_DIGITS: usize = 12;

/// Strip everything but ASCII digits and require exactly twelve of them.
///
/// Spaces, dashes and other separators are accepted, so `"1234 5678 9012"`
/// normalizes to `"123456789012"`.
pub fn normalize_subject_id(raw: &str) -> Result<String, ChainError> {
    let cleaned: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if cleaned.len() != SUBJECT_ID_DIGITS {
        return Err(ChainError::InvalidSubjectFormat(format!(
            "must be exactly {} digits, got {}",
            SUBJECT_ID_DIGITS,
            cleaned.len()
        )));
    }

    Ok(cleaned)
}

pub fn is_valid_subject_id(raw: &str) -> bool {
    normalize_subject_id(raw).is_ok()
}
