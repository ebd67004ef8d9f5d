pub mod api;
pub mod config;
pub mod core;
pub mod ml;
pub mod monitoring;
pub mod services;
pub mod utils;

pub use crate::api::{APIServerConfig, AppState, CodeBloomServer};
pub use crate::config::Settings;
pub use crate::core::{AppError, AppResult, PredictionError, PredictionResult};
