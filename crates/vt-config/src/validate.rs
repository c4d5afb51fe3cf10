//! Configuration validation errors and semantic validation.

use thiserror::Error;

/// Validation result type.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Configuration validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Semantic validation failed: {0}")]
    SemanticError(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("Version mismatch: expected {expected}, got {actual}")]
    VersionMismatch { expected: String, actual: String },
}

impl ValidationError {
    /// Error code for structured error reporting.
    pub fn code(&self) -> u32 {
        match self {
            ValidationError::IoError(_) => 60,
            ValidationError::ParseError(_) => 61,
            ValidationError::SemanticError(_) => 63,
            ValidationError::InvalidValue { .. } => 65,
            ValidationError::VersionMismatch { .. } => 66,
        }
    }
}

impl From<ValidationError> for vt_common::Error {
    fn from(err: ValidationError) -> Self {
        vt_common::Error::Config(err.to_string())
    }
}

/// Validate analysis settings semantically.
pub fn validate_analysis(config: &crate::analysis::AnalysisConfig) -> ValidationResult<()> {
    if config.schema_version != crate::CONFIG_SCHEMA_VERSION {
        return Err(ValidationError::VersionMismatch {
            expected: crate::CONFIG_SCHEMA_VERSION.to_string(),
            actual: config.schema_version.clone(),
        });
    }

    if config.unit_id_col.trim().is_empty() {
        return Err(ValidationError::InvalidValue {
            field: "unit_id_col".to_string(),
            message: "Must not be empty".to_string(),
        });
    }

    if let Some(scope) = &config.unit_scope_col {
        if scope == &config.unit_id_col {
            return Err(ValidationError::InvalidValue {
                field: "unit_scope_col".to_string(),
                message: format!("Must differ from unit_id_col ({})", scope),
            });
        }
    }

    validate_quantile("q_low", config.q_low)?;
    validate_quantile("q_high", config.q_high)?;

    if config.q_low > 0.5 || config.q_high < 0.5 {
        return Err(ValidationError::SemanticError(format!(
            "Quantiles must bracket the median: q_low={} <= 0.5 <= q_high={}",
            config.q_low, config.q_high
        )));
    }

    if config.default_groupby.iter().any(|g| g == &config.unit_id_col) {
        return Err(ValidationError::InvalidValue {
            field: "default_groupby".to_string(),
            message: format!("Must not contain the unit id column {}", config.unit_id_col),
        });
    }

    Ok(())
}

fn validate_quantile(field: &str, q: f64) -> ValidationResult<()> {
    if !(0.0..=1.0).contains(&q) {
        return Err(ValidationError::InvalidValue {
            field: field.to_string(),
            message: format!("Must be in [0, 1], got {}", q),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::AnalysisConfig;

    #[test]
    fn default_config_is_valid() {
        assert!(validate_analysis(&AnalysisConfig::default()).is_ok());
    }

    #[test]
    fn quantile_out_of_range() {
        let config = AnalysisConfig {
            q_high: 1.5,
            ..AnalysisConfig::default()
        };
        let err = validate_analysis(&config).unwrap_err();
        assert_eq!(err.code(), 65);
    }

    #[test]
    fn quantiles_must_bracket_median() {
        let config = AnalysisConfig {
            q_low: 0.6,
            q_high: 0.9,
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            validate_analysis(&config),
            Err(ValidationError::SemanticError(_))
        ));
    }

    #[test]
    fn scope_must_differ_from_id() {
        let config = AnalysisConfig {
            unit_scope_col: Some("description_id".to_string()),
            ..AnalysisConfig::default()
        };
        assert!(validate_analysis(&config).is_err());
    }

    #[test]
    fn converts_into_unified_error() {
        let err: vt_common::Error = ValidationError::ParseError("bad".into()).into();
        assert_eq!(err.code(), 30);
    }
}
