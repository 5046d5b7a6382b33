//! Validation helper functions for configuration types.

use crate::core::errors::{Result, ScramblerError};

/// Highest Unicode scalar value.
pub const MAX_CODE_POINT: u32 = 0x10FFFF;

/// Validate that a usize value is greater than zero.
pub fn validate_positive_usize(value: usize, field: &str) -> Result<()> {
    if value == 0 {
        return Err(ScramblerError::config_field(
            format!("{} must be greater than 0", field),
            field,
        ));
    }
    Ok(())
}

/// Validate that a value is a Unicode code point.
pub fn validate_code_point(value: u32, field: &str) -> Result<()> {
    if value > MAX_CODE_POINT {
        return Err(ScramblerError::config_field(
            format!("{} must be at most U+{:X}, got U+{:X}", field, MAX_CODE_POINT, value),
            field,
        ));
    }
    Ok(())
}

/// Validate that an inclusive range is not inverted.
pub fn validate_ordered_range(start: u32, end: u32, field: &str) -> Result<()> {
    if start > end {
        return Err(ScramblerError::config_field(
            format!("range_start must not exceed range_end (U+{:X} > U+{:X})", start, end),
            field,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positive_usize() {
        assert!(validate_positive_usize(1, "len").is_ok());
        let err = validate_positive_usize(0, "len").unwrap_err();
        assert!(err.to_string().contains("len must be greater than 0"));
    }

    #[test]
    fn test_code_point_bounds() {
        assert!(validate_code_point(0x10FFFF, "range_end").is_ok());
        assert!(validate_code_point(0x110000, "range_end").is_err());
    }

    #[test]
    fn test_ordered_range() {
        assert!(validate_ordered_range(0x41, 0x41, "range").is_ok());
        assert!(validate_ordered_range(0x42, 0x41, "range").is_err());
    }
}
