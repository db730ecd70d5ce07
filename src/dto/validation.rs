//! Validation helpers for DTOs.

use validator::ValidationError;

/// Length of a room code: six decimal digits.
pub const ROOM_CODE_LENGTH: usize = 6;

/// Validates that a room code is exactly six ASCII digits.
///
/// # Examples
///
/// ```ignore
/// validate_room_code("123456") // Ok
/// validate_room_code("12345")  // Err - too short
/// validate_room_code("12a456") // Err - not a digit
/// ```
pub fn validate_room_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != ROOM_CODE_LENGTH {
        let mut err = ValidationError::new("room_code_length");
        err.message = Some(
            format!(
                "Room code must be exactly {} characters (got {})",
                ROOM_CODE_LENGTH,
                code.len()
            )
            .into(),
        );
        return Err(err);
    }

    if !code.chars().all(|c| c.is_ascii_digit()) {
        let mut err = ValidationError::new("room_code_format");
        err.message = Some("Room code must contain only decimal digits".into());
        return Err(err);
    }

    Ok(())
}
