use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;
use warp::http::{StatusCode, Uri};
use warp::{Filter, Rejection, Reply};

use crate::api::client::{CompletionClient, CompletionService};
use crate::config::Settings;
use crate::core::types::{ChatRequest, EnhancedPredictionRequest, PcosRiskRequest, PredictionRequest};
use crate::core::{AppError, AppResult, PredictionError};
use crate::ml::BackendHandle;
use crate::monitoring::TelemetryManager;
use crate::services::{calculate_pcos_risk, ChatService, CyclePredictor, EnhancedPredictor};

pub const SERVICE_NAME: &str = "Combined Reproductive Health API";
pub const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// API Server Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct APIServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
}

/// Immutable state shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub chat: ChatService,
    pub predictor: CyclePredictor,
    pub enhanced: EnhancedPredictor,
    pub telemetry: TelemetryManager,
    /// Chat model name reported by `/health`, even when chat is unconfigured
    pub chat_model: String,
}

impl AppState {
    /// Wire services from loaded settings. Chat stays disabled without an API key.
    pub fn from_settings(settings: &Settings, telemetry: TelemetryManager) -> AppResult<Self> {
        let completion: Option<Arc<dyn CompletionService>> = match settings.chat.api_key() {
            Some(key) => Some(Arc::new(CompletionClient::new(
                settings.chat.api_url.clone(),
                key,
                settings.chat.model.clone(),
                settings.chat.timeout(),
            )?)),
            None => {
                warn!("GROQ_API_KEY not set, chat endpoint disabled");
                None
            }
        };

        let backend = BackendHandle::from_name(&settings.predictor.backend);
        if let BackendHandle::Unavailable { reason } = &backend {
            warn!(%reason, "cycle predictor backend unavailable");
        }
        let sequence_length = settings.predictor.sequence_length;

        Ok(Self {
            chat: ChatService::new(completion),
            predictor: CyclePredictor::new(backend.clone()).with_sequence_length(sequence_length),
            enhanced: EnhancedPredictor::new(backend).with_sequence_length(sequence_length),
            telemetry,
            chat_model: settings.chat.model.clone(),
        })
    }
}

impl From<&Settings> for APIServerConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            allowed_origins: settings.server.allowed_origins.clone(),
        }
    }
}

/// HTTP front end for chat, prediction and PCOS scoring.
pub struct CodeBloomServer {
    config: APIServerConfig,
    state: Arc<AppState>,
}

impl CodeBloomServer {
    pub fn new(config: APIServerConfig, state: AppState) -> Self {
        Self {
            config,
            state: Arc::new(state),
        }
    }

    /// Start the API server
    pub async fn start(&self) -> Result<()> {
        for origin in &self.config.allowed_origins {
            validate_origin(origin)?;
        }

        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .context("Invalid server address")?;

        info!(%addr, origins = ?self.config.allowed_origins, "Starting CodeBloom API server");

        warp::serve(self.routes()).run(addr).await;
        Ok(())
    }

    /// Every route with CORS and JSON error replies applied.
    pub fn routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
        let cors = warp::cors()
            .allow_origins(self.config.allowed_origins.iter().map(String::as_str))
            .allow_methods(vec!["GET", "POST"])
            .allow_headers(vec!["Content-Type", "Accept"]);

        self.api_routes().with(cors).recover(handle_rejection)
    }

    fn api_routes(&self) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
        let state = Arc::clone(&self.state);

        let root = warp::path::end()
            .and(warp::get())
            .and(with_state(state.clone()))
            .and_then(root_status);

        let health = warp::path("health")
            .and(warp::path::end())
            .and(warp::get())
            .and(with_state(state.clone()))
            .and_then(health_check);

        let chat = warp::path("chat")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json())
            .and(with_state(state.clone()))
            .and(with_request_id())
            .and_then(chat_message);

        let predict = warp::path("predict")
            .and(warp::path::end())
            .and(warp::post())
            .and(warp::body::json())
            .and(with_state(state.clone()))
            .and(with_request_id())
            .and_then(predict_cycle);

        let frameworks = warp::path!("predict" / "frameworks")
            .and(warp::get())
            .and(with_state(state.clone()))
            .and_then(list_frameworks);

        let enhanced = warp::path!("predict" / "enhanced")
            .and(warp::post())
            .and(warp::body::json())
            .and(with_state(state.clone()))
            .and(with_request_id())
            .and_then(predict_cycle_enhanced);

        let pcos = warp::path!("pcos" / "risk-assessment")
            .and(warp::post())
            .and(warp::body::json())
            .and(with_state(state))
            .and_then(pcos_risk);

        root.or(health)
            .or(chat)
            .or(predict)
            .or(frameworks)
            .or(enhanced)
            .or(pcos)
    }
}

fn with_state(state: Arc<AppState>) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || Arc::clone(&state))
}

fn with_request_id() -> impl Filter<Extract = (Uuid,), Error = Infallible> + Clone {
    warp::any().map(Uuid::new_v4)
}

/// `warp` panics on malformed CORS origins, so check them up front.
fn validate_origin(origin: &str) -> Result<()> {
    let uri: Uri = origin
        .parse()
        .with_context(|| format!("Invalid allowed origin: {}", origin))?;
    if uri.scheme().is_none() || uri.authority().is_none() {
        anyhow::bail!("Allowed origin must include scheme and host: {}", origin);
    }
    Ok(())
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

async fn root_status(state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    state.telemetry.log_request("/", "GET", None);
    Ok(warp::reply::json(&json!({
        "status": "online",
        "service": SERVICE_NAME,
        "version": SERVICE_VERSION,
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "features": {
            "chatbot": "Available at /chat",
            "cycle_prediction": "Available at /predict",
            "enhanced_prediction": "Available at /predict/enhanced",
            "pcos_risk": "Available at /pcos/risk-assessment"
        },
        "health": "/health"
    })))
}

async fn health_check(state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    let chat_configured = state.chat.is_configured();
    let backend = state.predictor.backend();
    let available: Vec<&str> = backend.name().into_iter().collect();

    info!(chat_configured, frameworks = ?available, "Health check");

    Ok(warp::reply::json(&json!({
        "status": "healthy",
        "chatbot": {
            "status": if chat_configured { "operational" } else { "not configured" },
            "groq_configured": chat_configured,
            "model": state.chat_model
        },
        "cycle_predictor": {
            "status": if backend.is_available() { "operational" } else { "no ML frameworks available" },
            "available_frameworks": available
        },
        "timestamp": chrono::Utc::now().to_rfc3339()
    })))
}

async fn chat_message(request: ChatRequest, state: Arc<AppState>, request_id: Uuid) -> Result<impl Reply, Rejection> {
    let start = Instant::now();
    state.telemetry.log_request("/chat", "POST", Some(&request.message));

    match state.chat.respond(&request.message).await {
        Ok((outcome, response)) => {
            state.telemetry.log_response("/chat", outcome.as_str(), elapsed_ms(start));
            Ok(warp::reply::json(&response))
        }
        Err(e) => {
            error!(%request_id, error = %e, "chat request failed");
            Err(reject(e))
        }
    }
}

async fn predict_cycle(request: PredictionRequest, state: Arc<AppState>, request_id: Uuid) -> Result<impl Reply, Rejection> {
    let start = Instant::now();
    info!(
        %request_id,
        cycles = request.past_cycles.len(),
        framework = ?request.framework,
        "POST /predict"
    );

    let predictor = state.predictor.clone();
    let result = tokio::task::spawn_blocking(move || predictor.predict_request(&request))
        .await
        .map_err(|e| reject(PredictionError::PredictionFailed(e.to_string())))?;

    match result {
        Ok(prediction) => {
            state.telemetry.log_response("/predict", "success", elapsed_ms(start));
            Ok(warp::reply::json(&prediction))
        }
        Err(e) => {
            error!(%request_id, error = %e, "prediction failed");
            Err(reject(e))
        }
    }
}

async fn list_frameworks(state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    let backend = state.predictor.backend();
    let mut available = serde_json::Map::new();
    available.insert(
        backend.name().unwrap_or(crate::ml::NDARRAY_BACKEND).to_string(),
        Value::Bool(backend.is_available()),
    );

    Ok(warp::reply::json(&json!({
        "available_frameworks": available,
        "default": backend.name()
    })))
}

async fn predict_cycle_enhanced(
    request: EnhancedPredictionRequest,
    state: Arc<AppState>,
    request_id: Uuid,
) -> Result<impl Reply, Rejection> {
    let start = Instant::now();
    info!(
        %request_id,
        cycles = request.cycle_records.len(),
        framework = ?request.framework,
        "POST /predict/enhanced"
    );

    let predictor = state.enhanced.clone();
    let result = tokio::task::spawn_blocking(move || predictor.predict_request(&request))
        .await
        .map_err(|e| reject(PredictionError::PredictionFailed(e.to_string())))?;

    match result {
        Ok(prediction) => {
            state.telemetry.log_response("/predict/enhanced", "success", elapsed_ms(start));
            Ok(warp::reply::json(&prediction))
        }
        Err(e) => {
            error!(%request_id, error = %e, "enhanced prediction failed");
            Err(reject(e))
        }
    }
}

async fn pcos_risk(request: PcosRiskRequest, state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    state.telemetry.log_request("/pcos/risk-assessment", "POST", None);
    Ok(warp::reply::json(&calculate_pcos_risk(&request)))
}

/// An [`AppError`] carried through warp's rejection system.
#[derive(Debug)]
pub struct ApiRejection(pub AppError);

impl warp::reject::Reject for ApiRejection {}

fn reject(err: impl Into<AppError>) -> Rejection {
    warp::reject::custom(ApiRejection(err.into()))
}

pub fn status_for(err: &AppError) -> StatusCode {
    match err {
        AppError::Prediction(PredictionError::InvalidInput(_))
        | AppError::Prediction(PredictionError::InsufficientHistory { .. }) => StatusCode::UNPROCESSABLE_ENTITY,
        AppError::Prediction(PredictionError::BackendUnavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
        AppError::Prediction(PredictionError::PredictionFailed(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        AppError::ChatUnavailable => StatusCode::INTERNAL_SERVER_ERROR,
        AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
    }
}

/// Global Error Handler: every failure becomes `{"detail": ...}`.
async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, detail) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not Found".to_string())
    } else if let Some(ApiRejection(app_err)) = err.find::<ApiRejection>() {
        (status_for(app_err), app_err.to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::UNPROCESSABLE_ENTITY, e.to_string())
    } else if let Some(e) = err.find::<warp::reject::UnsupportedMediaType>() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, e.to_string())
    } else if let Some(e) = err.find::<warp::filters::cors::CorsForbidden>() {
        (StatusCode::FORBIDDEN, e.to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed".to_string())
    } else {
        warn!(rejection = ?err, "unhandled rejection");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
    };

    Ok(warp::reply::with_status(
        warp::reply::json(&json!({ "detail": detail })),
        status,
    ))
}
