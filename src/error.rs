//! Error types for the merchant

use thiserror::Error;

/// Failures raised by a prediction capability.
///
/// Everything except [`PredictionError::Unavailable`] is recoverable: the
/// price optimizer absorbs it and falls back to a randomized markup.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PredictionError {
    /// No trained model exists for the product (cold start)
    #[error("no model trained for product {0}")]
    UnknownProduct(String),

    /// Feature rows do not match what the model was trained on
    #[error("feature width mismatch: expected {expected}, got {actual}")]
    FeatureWidth { expected: usize, actual: usize },

    /// The model returned something that is not one probability per row
    #[error("malformed prediction: {0}")]
    Malformed(String),

    /// The capability itself is unreachable
    #[error("prediction capability unavailable: {0}")]
    Unavailable(String),
}

impl PredictionError {
    /// Whether the optimizer may substitute a fallback price
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, PredictionError::Unavailable(_))
    }
}

#[derive(Debug, Error)]
pub enum MerchantError {
    #[error("Unknown product: {0}")]
    UnknownProduct(String),

    #[error("Malformed record at line {line}: {source}")]
    MalformedRecord {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Prediction error: {0}")]
    Prediction(#[from] PredictionError),

    #[error("Training error: {0}")]
    Training(String),

    #[error("Invalid price: {0}")]
    InvalidPrice(String),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MerchantError>;
