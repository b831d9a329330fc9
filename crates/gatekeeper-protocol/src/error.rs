//! Payload parse errors.
//!
//! Every variant ends the attempt as a deny; the distinctions only matter for
//! the log.

/// Result type alias for payload parsing.
pub type Result<T> = std::result::Result<T, PayloadError>;

#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    #[error("Payload too long: {len} bytes (max {max})")]
    TooLong { len: usize, max: usize },

    /// Not a well-formed object, or a field appears twice.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing required field: status")]
    MissingStatus,

    #[error("Field status is not a boolean literal")]
    InvalidStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = PayloadError::TooLong { len: 2000, max: 1024 };
        assert_eq!(err.to_string(), "Payload too long: 2000 bytes (max 1024)");

        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = PayloadError::from(json);
        assert!(err.to_string().starts_with("Invalid JSON: EOF"));
    }
}
