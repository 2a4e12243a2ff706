//! Per-location PM2.5 forecasting from stored history.

mod features;
mod model;
mod predictor;

use thiserror::Error;

pub use features::{features_at, training_rows, Features, FEATURE_COUNT};
pub use model::LinearModel;
pub use predictor::{CurrentConditions, ForecastPoint, ModelRegistry, Predictor, TrainingReport};

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Insufficient data: only {samples} samples found")]
    InsufficientData { samples: usize },

    #[error("Not enough data after feature engineering: {rows} samples")]
    NotEnoughRows { rows: usize },

    #[error("Model could not be fitted to the training data")]
    Singular,

    #[error("Model not trained for this location. Please train it first.")]
    NotTrained,
}

pub type Result<T> = std::result::Result<T, ForecastError>;
