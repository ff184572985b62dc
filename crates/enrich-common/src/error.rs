//! Error types for enrichment operations.

use thiserror::Error;

/// Result type alias using EnrichError.
pub type EnrichResult<T> = Result<T, EnrichError>;

/// Primary error type for enrichment operations.
///
/// These are input and configuration errors. Provider failures never surface
/// as `EnrichError`; they downgrade the provider to "failed" instead.
#[derive(Debug, Error)]
pub enum EnrichError {
    // === Input Errors ===
    #[error("Record has no usable coordinates")]
    MissingCoordinates,

    #[error("Coordinates out of range: lat={lat}, lon={lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },

    #[error("Record has no usable collection date")]
    MissingCollectionDate,

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Unsupported target schema: {0}")]
    UnsupportedSchema(String),

    #[error("Invalid soil texture input: {0}")]
    InvalidTexture(String),

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown provider: {0}")]
    UnknownProvider(String),

    // === Infrastructure Errors ===
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl EnrichError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            EnrichError::MissingCoordinates => "no_coordinates",
            EnrichError::InvalidCoordinates { .. } => "invalid_coordinates",
            EnrichError::MissingCollectionDate => "no_collection_date",
            EnrichError::InvalidDate(_) => "invalid_date",
            EnrichError::UnsupportedSchema(_) => "unsupported_schema",
            EnrichError::InvalidTexture(_) => "invalid_texture",
            EnrichError::Config(_) | EnrichError::UnknownProvider(_) => "configuration_error",
            EnrichError::Io(_) => "io_error",
            EnrichError::Json(_) => "json_error",
        }
    }

    /// Whether this error is caused by the input record rather than setup.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            EnrichError::MissingCoordinates
                | EnrichError::InvalidCoordinates { .. }
                | EnrichError::MissingCollectionDate
                | EnrichError::InvalidDate(_)
                | EnrichError::InvalidTexture(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(EnrichError::MissingCoordinates.code(), "no_coordinates");
        assert_eq!(EnrichError::MissingCollectionDate.code(), "no_collection_date");
        assert_eq!(
            EnrichError::InvalidCoordinates { lat: 91.0, lon: 0.0 }.code(),
            "invalid_coordinates"
        );
        assert_eq!(
            EnrichError::UnsupportedSchema("mixs".into()).code(),
            "unsupported_schema"
        );
    }

    #[test]
    fn test_input_error_classification() {
        assert!(EnrichError::MissingCoordinates.is_input_error());
        assert!(!EnrichError::UnsupportedSchema("x".into()).is_input_error());
        assert!(!EnrichError::Config("bad".into()).is_input_error());
    }

    #[test]
    fn test_json_error_conversion() {
        let err: EnrichError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, EnrichError::Json(_)));
        assert!(err.to_string().starts_with("JSON error"));
    }
}
