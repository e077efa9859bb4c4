//! Reusable field rules for `Projection::validate`.
//!
//! Each rule is independent: `first_letter_uppercase` accepts an empty value,
//! so combine it with `required` when the field is mandatory.

use crate::error::{Error, Result};

/// Longest name accepted by the catalog resources.
pub const NAME_MAX_LENGTH: usize = 75;

/// Field must be present and not blank.
pub fn required(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::ValidationError(format!(
            "The field {} is required",
            field
        )));
    }
    Ok(())
}

/// Field must hold at most `max` characters.
pub fn max_length(field: &str, value: &str, max: usize) -> Result<()> {
    let length = value.chars().count();
    if length > max {
        return Err(Error::ValidationError(format!(
            "The field {} must have at most {} characters, got {}",
            field, max, length
        )));
    }
    Ok(())
}

/// First character, when there is one, must be uppercase.
pub fn first_letter_uppercase(field: &str, value: &str) -> Result<()> {
    match value.chars().next() {
        Some(first) if !first.is_uppercase() => Err(Error::ValidationError(format!(
            "The first letter of {} must be uppercase",
            field
        ))),
        _ => Ok(()),
    }
}

/// The rule set used for resource names: required, bounded, capitalised.
pub fn name(field: &str, value: &str) -> Result<()> {
    required(field, value)?;
    max_length(field, value, NAME_MAX_LENGTH)?;
    first_letter_uppercase(field, value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required() {
        assert!(required("name", "Comedia").is_ok());
        assert!(matches!(
            required("name", "   "),
            Err(Error::ValidationError(_))
        ));
    }

    #[test]
    fn test_max_length_counts_chars_not_bytes() {
        let accented = "Á".repeat(75);
        assert!(max_length("name", &accented, 75).is_ok());
        assert!(max_length("name", &"a".repeat(76), 75).is_err());
    }

    #[test]
    fn test_first_letter_uppercase_accepts_empty() {
        assert!(first_letter_uppercase("name", "").is_ok());
    }

    #[test]
    fn test_first_letter_uppercase() {
        assert!(first_letter_uppercase("name", "Ñandú").is_ok());
        assert!(first_letter_uppercase("name", "comedia").is_err());
    }

    #[test]
    fn test_name_rules_combined() {
        assert!(name("name", "Comedia-Drama").is_ok());
        assert!(name("name", "").is_err());
        assert!(name("name", "drama").is_err());
        assert!(name("name", &format!("D{}", "a".repeat(75))).is_err());
    }
}
