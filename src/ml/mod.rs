// Cycle Length Sequence Model

pub mod backend;
pub mod config;
pub mod lstm;
pub mod optimizer;
pub mod predictor;
pub mod preprocessing;
pub mod stats;
pub mod trainer;

// Expose key types and functions
pub use backend::{BackendHandle, NdarrayBackend, NumericBackend, TrainedModel, NDARRAY_BACKEND};
pub use self::config::ModelConfig;
pub use lstm::SequenceModel;
pub use predictor::{forecast_next, project};
pub use preprocessing::{NormalizationParams, WindowedDataset};
pub use trainer::{Trainer, TrainingReport};
