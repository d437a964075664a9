use thiserror::Error;

/// Failures raised by the aggregation engine.
///
/// All of them are deterministic: the same snapshot fails the same way every
/// time, so callers abort the report instead of retrying.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Unknown {dimension} category: '{value}'")]
    UnknownCategory { dimension: String, value: String },

    #[error("Duplicate {dimension} category in canonical ordering: '{value}'")]
    DuplicateCategory { dimension: String, value: String },

    #[error("Not enough data for {context}: need at least 2 points, found {found}")]
    InsufficientData { context: String, found: usize },

    #[error("Division by zero while normalizing {0}")]
    DivideByZero(String),

    #[error("Quantile must be in (0, 1), got {0}")]
    InvalidQuantile(f64),
}

impl EngineError {
    pub fn unknown(dimension: &str, value: impl Into<String>) -> Self {
        EngineError::UnknownCategory {
            dimension: dimension.to_string(),
            value: value.into(),
        }
    }

    pub fn insufficient(context: impl Into<String>, found: usize) -> Self {
        EngineError::InsufficientData {
            context: context.into(),
            found,
        }
    }
}

/// Errors from reading the operations file.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from reading or validating the configuration file.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read configuration file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Configuration validation error: {0}")]
    Invalid(String),
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
