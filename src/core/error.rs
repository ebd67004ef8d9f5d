use thiserror::Error;

/// Failures of the cycle prediction pipeline.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Insufficient history: {len} cycles, need at least 4")]
    InsufficientHistory { len: usize },

    #[error("Prediction backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Prediction failed: {0}")]
    PredictionFailed(String),
}

/// Service level errors surfaced by the HTTP layer and the binary.
#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Prediction(#[from] PredictionError),

    #[error("{0}")]
    BadRequest(String),

    #[error("Chatbot service is not configured. Please set GROQ_API_KEY environment variable.")]
    ChatUnavailable,

    #[error("AI service error: {0}")]
    Upstream(String),
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Upstream(err.to_string())
    }
}

pub type PredictionResult<T> = Result<T, PredictionError>;
pub type AppResult<T> = Result<T, AppError>;
