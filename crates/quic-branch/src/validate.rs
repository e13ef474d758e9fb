//! Branch name validation (spec §4.E.1).

use crate::error::{Error, Result};
use quic_naming::RESTORE_RESERVED_NAME;

const MAX_LEN: usize = 50;

/// Lowercase-fold, reject empty and >50 chars, reject the reserved
/// `_restore` name, require `^[a-z0-9_-]+$`. Returns the normalized name.
pub fn validate_branch_name(name: &str) -> Result<String> {
    let normalized = name.to_lowercase();

    if normalized.is_empty() || normalized.len() > MAX_LEN {
        return Err(Error::invalid_name(
            name,
            format!("branch name must be 1-{MAX_LEN} characters"),
        ));
    }

    if normalized == RESTORE_RESERVED_NAME {
        return Err(Error::invalid_name(
            name,
            format!("'{RESTORE_RESERVED_NAME}' is reserved"),
        ));
    }

    if !normalized
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
    {
        return Err(Error::invalid_name(
            name,
            "branch name must match ^[a-z0-9_-]+$",
        ));
    }

    Ok(normalized)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_overlong() {
        assert!(validate_branch_name("").is_err());
        assert!(validate_branch_name(&"a".repeat(51)).is_err());
        assert!(validate_branch_name(&"a".repeat(50)).is_ok());
    }

    #[test]
    fn rejects_reserved_name() {
        let err = validate_branch_name("_restore").unwrap_err();
        assert!(err.to_string().contains("'_restore' is reserved"));
    }

    #[test]
    fn rejects_invalid_characters() {
        assert!(validate_branch_name("a@b").is_err());
    }

    #[test]
    fn lowercase_folds() {
        assert_eq!(validate_branch_name("Dev1").unwrap(), "dev1");
    }
}
