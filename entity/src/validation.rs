//! Shared field rules for the form types.

use validator::{ValidationError, ValidationErrors};

use crate::Money;

pub fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required"));
    }
    Ok(())
}

pub fn positive_money(value: &Money) -> Result<(), ValidationError> {
    if !value.is_positive() {
        return Err(ValidationError::new("positive"));
    }
    Ok(())
}

/// Validation failure for a single field, shaped like the derive output.
pub fn field_error(field: &'static str, code: &'static str, message: &'static str) -> ValidationErrors {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    let mut errors = ValidationErrors::new();
    errors.add(field, err);
    errors
}

pub(crate) fn trimmed(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
