//! Numeric backend capability.
//!
//! Prediction code never reaches for a model implementation directly; it is
//! handed a [`BackendHandle`] at startup and must [`acquire`](BackendHandle::acquire)
//! it before doing any work.

use std::fmt;
use std::sync::Arc;

use ndarray::Array2;

use super::config::ModelConfig;
use super::lstm::SequenceModel;
use super::preprocessing::WindowedDataset;
use super::trainer::Trainer;
use crate::core::{PredictionError, PredictionResult};

/// A trained regressor ready for inference on one normalized window.
pub trait TrainedModel: Send {
    fn predict(&self, window: &Array2<f32>) -> PredictionResult<f32>;
}

/// Something that can fit a fresh sequence regressor.
pub trait NumericBackend: Send + Sync {
    fn name(&self) -> &str;

    fn fit(&self, dataset: &WindowedDataset, config: &ModelConfig) -> PredictionResult<Box<dyn TrainedModel>>;
}

/// In-process LSTM on `ndarray`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NdarrayBackend;

pub const NDARRAY_BACKEND: &str = "ndarray-lstm";

impl NumericBackend for NdarrayBackend {
    fn name(&self) -> &str {
        NDARRAY_BACKEND
    }

    fn fit(&self, dataset: &WindowedDataset, config: &ModelConfig) -> PredictionResult<Box<dyn TrainedModel>> {
        let (model, report) = Trainer::new(*config).fit(dataset)?;
        tracing::debug!(
            epochs = report.epochs,
            final_loss = report.final_loss().unwrap_or(f32::NAN),
            "model fitted"
        );
        Ok(Box::new(model))
    }
}

impl TrainedModel for SequenceModel {
    fn predict(&self, window: &Array2<f32>) -> PredictionResult<f32> {
        if window.ncols() != self.config().input_size {
            return Err(PredictionError::PredictionFailed(format!(
                "window has {} features, model expects {}",
                window.ncols(),
                self.config().input_size
            )));
        }
        Ok(self.predict_window(window))
    }
}

/// The backend a service was started with, or why there is none.
#[derive(Clone)]
pub enum BackendHandle {
    Available(Arc<dyn NumericBackend>),
    Unavailable { reason: String },
}

impl BackendHandle {
    pub fn ndarray() -> Self {
        Self::Available(Arc::new(NdarrayBackend))
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self::Unavailable {
            reason: reason.into(),
        }
    }

    /// Resolve a configured backend name.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "" | "ndarray" | NDARRAY_BACKEND => Self::ndarray(),
            "disabled" | "none" => Self::unavailable("prediction backend disabled by configuration"),
            other => Self::unavailable(format!("unknown prediction backend '{other}'")),
        }
    }

    pub fn acquire(&self) -> PredictionResult<Arc<dyn NumericBackend>> {
        match self {
            Self::Available(backend) => Ok(Arc::clone(backend)),
            Self::Unavailable { reason } => Err(PredictionError::BackendUnavailable(reason.clone())),
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Available(backend) => Some(backend.name()),
            Self::Unavailable { .. } => None,
        }
    }
}

impl Default for BackendHandle {
    fn default() -> Self {
        Self::ndarray()
    }
}

impl fmt::Debug for BackendHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Available(backend) => f.debug_tuple("Available").field(&backend.name()).finish(),
            Self::Unavailable { reason } => f.debug_struct("Unavailable").field("reason", reason).finish(),
        }
    }
}
