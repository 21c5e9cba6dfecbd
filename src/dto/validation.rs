//! Validation helpers for DTOs.

use validator::ValidationError;

/// Number of digits in a join code.
pub const JOIN_CODE_LENGTH: usize = 5;

/// Error code for well-formed codes outside the allocated range. No session
/// can hold such a code.
pub const JOIN_CODE_OUT_OF_RANGE: &str = "join_code_range";

/// Validates that a join code is exactly five ASCII digits without a leading zero,
/// i.e. a number in `10000..=99999`.
///
/// # Examples
///
/// ```ignore
/// validate_join_code("54321") // Ok
/// validate_join_code("05432") // Err - leading zero
/// validate_join_code("5432")  // Err - too short
/// ```
pub fn validate_join_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != JOIN_CODE_LENGTH {
        let mut err = ValidationError::new("join_code_length");
        err.message = Some(
            format!(
                "Join code must be exactly {JOIN_CODE_LENGTH} digits (got {})",
                code.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !code.chars().all(|c| c.is_ascii_digit()) {
        let mut err = ValidationError::new("join_code_format");
        err.message = Some("Join code must contain only digits".into());
        return Err(err);
    }

    if code.starts_with('0') {
        let mut err = ValidationError::new(JOIN_CODE_OUT_OF_RANGE);
        err.message = Some("Join code must not start with 0".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_join_code_valid() {
        assert!(validate_join_code("54321").is_ok());
        assert!(validate_join_code("10000").is_ok());
        assert!(validate_join_code("99999").is_ok());
    }

    #[test]
    fn test_validate_join_code_invalid_length() {
        assert!(validate_join_code("5432").is_err()); // too short
        assert!(validate_join_code("543210").is_err()); // too long
        assert!(validate_join_code("").is_err()); // empty
    }

    #[test]
    fn test_validate_join_code_invalid_format() {
        assert!(validate_join_code("5432a").is_err()); // letter
        assert!(validate_join_code("54 21").is_err()); // space
        assert!(validate_join_code("٥٤٣٢١").is_err()); // non-ascii digits
    }

    #[test]
    fn test_validate_join_code_leading_zero_is_out_of_range() {
        let err = validate_join_code("09999").unwrap_err();
        assert_eq!(err.code, JOIN_CODE_OUT_OF_RANGE);
        let err = validate_join_code("00000").unwrap_err();
        assert_eq!(err.code, JOIN_CODE_OUT_OF_RANGE);
    }
}
