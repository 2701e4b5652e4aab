use thiserror::Error;

/// Recovery failure taxonomy. These never leave `RecoveryPipeline::recover`;
/// they drive the cascade and are reported to the observer and in the outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecoveryError {
    #[error("Response too short to contain a record: {length} chars (minimum {minimum})")]
    TruncatedResponse { length: usize, minimum: usize },

    #[error("No recovery strategy produced a schema-valid record after {attempts} attempts")]
    UnparsableResponse { attempts: usize },

    #[error("Candidate failed schema validation: {}", fields.join(", "))]
    SchemaViolation { fields: Vec<String> },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid generation request: {0}")]
    InvalidRequest(String),
}

impl From<serde_json::Error> for RecoveryError {
    fn from(err: serde_json::Error) -> Self {
        RecoveryError::Parse(err.to_string())
    }
}

impl RecoveryError {
    /// Short label used as a structured log field.
    pub fn label(&self) -> &'static str {
        match self {
            RecoveryError::TruncatedResponse { .. } => "truncated_response",
            RecoveryError::UnparsableResponse { .. } => "unparsable_response",
            RecoveryError::SchemaViolation { .. } => "schema_violation",
            RecoveryError::Parse(_) => "parse_error",
            RecoveryError::InvalidRequest(_) => "invalid_request",
        }
    }
}

/// Configuration errors surfaced while loading settings from the environment
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_violation_lists_fields() {
        let error = RecoveryError::SchemaViolation {
            fields: vec!["answer".to_string(), "options".to_string()],
        };
        assert_eq!(
            error.to_string(),
            "Candidate failed schema validation: answer, options"
        );
        assert_eq!(error.label(), "schema_violation");
    }

    #[test]
    fn test_parse_error_conversion() {
        let json_error = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: RecoveryError = json_error.into();
        assert!(matches!(error, RecoveryError::Parse(_)));
    }

    #[test]
    fn test_config_error_message() {
        let error = ConfigError::InvalidValue {
            key: "RECOVERY_MIN_RESPONSE_LENGTH",
            value: "abc".to_string(),
            reason: "expected a non-negative integer".to_string(),
        };
        assert!(error.to_string().contains("RECOVERY_MIN_RESPONSE_LENGTH"));
    }
}
