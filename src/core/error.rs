use thiserror::Error;

/// Errors that can occur during extraction or invoice construction.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExtractError {
    /// Bad or missing input — unreadable file, unsupported image.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The external vision-model call failed, timed out, or exhausted retries.
    #[error("model invocation failed: {0}")]
    ModelInvocation(String),

    /// The model returned no structured payload, or the payload did not
    /// match the published schema.
    #[error("parse error: {0}")]
    Parse(String),

    /// A constructed invoice violated a construction-time invariant.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// A downstream persistence operation failed. Extraction results stay
    /// valid even when storage fails afterwards.
    #[error("storage error: {0}")]
    Storage(String),
}

/// A single construction-time validation error with field path and message.
///
/// Messages for arithmetic invariants always name both the stored and the
/// recomputed value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dot-separated path to the invalid field (e.g. "billing_address.phone").
    pub field: String,
    /// Human-readable error description.
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_error_display() {
        let err =
            ValidationError::new("items[0].total", "total 31.00 does not match computed 30.00");
        assert_eq!(
            err.to_string(),
            "items[0].total: total 31.00 does not match computed 30.00"
        );
    }

    #[test]
    fn extract_error_wraps_validation() {
        let err: ExtractError = ValidationError::new("subtotal", "mismatch").into();
        assert!(err.to_string().contains("validation failed"));
    }
}
