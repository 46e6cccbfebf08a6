//! Input validation helpers
//!
//! Centralized text length constants and validation functions.
//! Limits are chosen as reasonable UX limits for names, notes and
//! addresses; the document store enforces nothing itself.

use shared::AppError;

// ── Text length limits ──────────────────────────────────────────────

/// Entity names: customer, restaurant, menu item, driver, etc.
pub const MAX_NAME_LEN: usize = 200;

/// Notes, special instructions, admin notes
pub const MAX_NOTE_LEN: usize = 500;

/// Short identifiers: phone numbers, order codes, zip codes
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Email addresses (RFC 5321)
pub const MAX_EMAIL_LEN: usize = 254;

/// Address lines
pub const MAX_ADDRESS_LEN: usize = 500;

// ── Validation helpers ──────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    if value.len() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.len()
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.len() > max_len
    {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.len()
        )));
    }
    Ok(())
}

/// Validate a structured address: all required parts present, within limits.
pub fn validate_address(addr: &shared::Address, field: &str) -> Result<(), AppError> {
    validate_required_text(&addr.street, &format!("{field}.street"), MAX_ADDRESS_LEN)?;
    validate_required_text(&addr.city, &format!("{field}.city"), MAX_NAME_LEN)?;
    validate_required_text(&addr.state, &format!("{field}.state"), MAX_SHORT_TEXT_LEN)?;
    validate_required_text(&addr.zip, &format!("{field}.zip"), MAX_SHORT_TEXT_LEN)?;
    Ok(())
}
