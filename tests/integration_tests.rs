use anyhow::Result;
use async_trait::async_trait;
use codebloom_api::{
    api::client::{ChatMessage, CompletionService},
    core::types::{CycleRecord, EnhancedPredictionRequest, LifestyleData, PcosRiskRequest, PredictionRequest, RiskLevel, SymptomData},
    ml::BackendHandle,
    monitoring::{TelemetryConfig, TelemetryManager},
    services::{calculate_pcos_risk, ChatOutcome, ChatService, CyclePredictor, EnhancedPredictor},
    APIServerConfig, AppError, AppResult, AppState, CodeBloomServer, PredictionError,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use warp::test::request;

/// Integration Test Suite for the CodeBloom API
mod integration_tests {
    use super::*;

    /// Answers the topic check with a fixed label, everything else with a fixed reply.
    struct FixedCompletion {
        label: &'static str,
        answer: &'static str,
        prompts: Mutex<Vec<String>>,
    }

    impl FixedCompletion {
        fn new(label: &'static str, answer: &'static str) -> Arc<Self> {
            Arc::new(Self {
                label,
                answer,
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl CompletionService for FixedCompletion {
        fn model(&self) -> &str {
            "fixed-model"
        }

        async fn complete(&self, messages: Vec<ChatMessage>, _temperature: f32, _max_tokens: u32) -> AppResult<String> {
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            self.prompts.lock().unwrap().push(last);
            if messages.len() == 1 {
                Ok(self.label.to_string())
            } else {
                Ok(self.answer.to_string())
            }
        }
    }

    fn state(backend: BackendHandle, chat: ChatService) -> AppState {
        AppState {
            chat,
            predictor: CyclePredictor::new(backend.clone()),
            enhanced: EnhancedPredictor::new(backend),
            telemetry: TelemetryManager::detached(TelemetryConfig {
                anonymize_data: true,
                ..TelemetryConfig::default()
            }),
            chat_model: "fixed-model".to_string(),
        }
    }

    fn server(backend: BackendHandle, chat: ChatService) -> CodeBloomServer {
        let config = APIServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
            allowed_origins: vec!["http://localhost:5173".to_string()],
        };
        CodeBloomServer::new(config, state(backend, chat))
    }

    fn record(cycle_length: i64, date: &str) -> CycleRecord {
        CycleRecord {
            cycle_length,
            date: date.to_string(),
            symptoms: Some(SymptomData {
                cramps: Some(3),
                mood_changes: Some(2),
                energy_level: Some(3),
                bloating: Some(1),
                headaches: Some(0),
            }),
            flow_intensity: Some("medium".to_string()),
            lifestyle: Some(LifestyleData {
                stress_level: Some(2),
                exercise_intensity: Some(3),
                sleep_quality: Some(4),
                weight_change: Some(0),
            }),
        }
    }

    /// Baseline pipeline end to end: validation, training, projection.
    #[tokio::test]
    async fn test_cycle_prediction_pipeline() -> Result<()> {
        let predictor = CyclePredictor::new(BackendHandle::ndarray());
        let request = PredictionRequest {
            past_cycles: vec![28, 30, 27, 29, 28, 31, 29, 28],
            last_period_date: "2025-01-15".to_string(),
            framework: None,
        };

        let prediction = tokio::task::spawn_blocking(move || predictor.predict_request(&request)).await??;

        // observed range is 27..=31; allow one range width either side
        assert!((23..=35).contains(&prediction.predicted_cycle_length));
        assert_eq!(
            prediction.predicted_next_period,
            chrono::NaiveDate::from_ymd_opt(2025, 1, 15).unwrap()
                + chrono::Duration::days(prediction.predicted_cycle_length)
        );
        let interval = &prediction.confidence_interval;
        assert!(interval.min_days <= interval.predicted_days && interval.predicted_days <= interval.max_days);
        assert!(interval.earliest_date <= prediction.predicted_next_period);
        assert!(prediction.predicted_next_period <= interval.latest_date);
        assert_eq!(prediction.statistics.total_cycles_analyzed, 8);
        assert_eq!(prediction.statistics.min_cycle, 27);
        assert_eq!(prediction.statistics.max_cycle, 31);
        assert_eq!(prediction.framework_used, "ndarray-lstm");

        Ok(())
    }

    #[tokio::test]
    async fn test_prediction_rejects_bad_input() -> Result<()> {
        let predictor = CyclePredictor::new(BackendHandle::ndarray());

        let short = PredictionRequest {
            past_cycles: vec![28, 29, 30],
            last_period_date: "2025-01-15".to_string(),
            framework: None,
        };
        assert!(matches!(
            predictor.predict_request(&short),
            Err(PredictionError::InvalidInput(_)) | Err(PredictionError::InsufficientHistory { .. })
        ));

        let bad_date = PredictionRequest {
            past_cycles: vec![28, 29, 30, 28],
            last_period_date: "15/01/2025".to_string(),
            framework: None,
        };
        assert!(matches!(predictor.predict_request(&bad_date), Err(PredictionError::InvalidInput(_))));

        Ok(())
    }

    #[tokio::test]
    async fn test_unavailable_backend_is_reported() -> Result<()> {
        let predictor = CyclePredictor::new(BackendHandle::from_name("disabled"));
        let request = PredictionRequest {
            past_cycles: vec![28, 29, 30, 28],
            last_period_date: "2025-01-15".to_string(),
            framework: None,
        };
        assert!(matches!(
            predictor.predict_request(&request),
            Err(PredictionError::BackendUnavailable(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_enhanced_prediction_pipeline() -> Result<()> {
        let predictor = EnhancedPredictor::new(BackendHandle::ndarray());
        let request = EnhancedPredictionRequest {
            cycle_records: vec![
                record(28, "2024-09-01"),
                record(29, "2024-09-29"),
                record(27, "2024-10-28"),
                record(30, "2024-11-24"),
                record(28, "2024-12-24"),
            ],
            last_period_date: "2025-01-21".to_string(),
            framework: Some("NDARRAY-LSTM".to_string()),
        };

        let prediction = tokio::task::spawn_blocking(move || predictor.predict_request(&request)).await??;

        assert!((0.0..=100.0).contains(&prediction.confidence_score));
        assert_eq!(prediction.base.statistics.total_cycles_analyzed, 5);
        assert!(!prediction.insights.is_empty());
        assert_eq!(prediction.feature_importance.cycle_history, 0.8);

        Ok(())
    }

    #[tokio::test]
    async fn test_pcos_assessment() -> Result<()> {
        let low = calculate_pcos_risk(&PcosRiskRequest::default());
        assert_eq!(low.risk_score, 0);
        assert_eq!(low.risk_level, RiskLevel::Low);

        let high = calculate_pcos_risk(&PcosRiskRequest {
            irregular_periods: true,
            weight_gain: true,
            excess_hair_growth: true,
            acne: true,
            family_history: true,
            dark_skin_patches: true,
            cycle_length_avg: Some(40),
        });
        assert_eq!(high.risk_level, RiskLevel::High);
        assert!(high.risk_score > 60);

        Ok(())
    }

    #[tokio::test]
    async fn test_chat_guards_and_answer() -> Result<()> {
        let completion = FixedCompletion::new("RELEVANT", "Cycles between 21 and 35 days are common.");
        let chat = ChatService::new(Some(completion.clone() as Arc<dyn CompletionService>));

        let (outcome, response) = chat.respond("Is a 32 day cycle normal?").await?;
        assert_eq!(outcome, ChatOutcome::Answered);
        assert_eq!(response.response, "Cycles between 21 and 35 days are common.");
        assert!(!response.safety_triggered);
        assert_eq!(completion.prompts.lock().unwrap().len(), 2);

        let (outcome, response) = chat.respond("I have heavy bleeding and severe pain").await?;
        assert_eq!(outcome, ChatOutcome::Emergency);
        assert!(response.safety_triggered);
        assert_eq!(completion.prompts.lock().unwrap().len(), 2);

        Ok(())
    }

    #[tokio::test]
    async fn test_chat_classifier_rejection() -> Result<()> {
        let completion = FixedCompletion::new("IRRELEVANT", "unused");
        let chat = ChatService::new(Some(completion as Arc<dyn CompletionService>));

        let (outcome, response) = chat.respond("Write me a poem about the sea").await?;
        assert_eq!(outcome, ChatOutcome::OffTopicClassifier);
        assert!(!response.safety_triggered);
        Ok(())
    }

    #[tokio::test]
    async fn test_chat_without_client() -> Result<()> {
        let chat = ChatService::default();
        assert!(matches!(
            chat.respond("When does ovulation happen?").await,
            Err(AppError::ChatUnavailable)
        ));
        Ok(())
    }

    #[tokio::test]
    async fn test_http_prediction_routes() -> Result<()> {
        let routes = server(BackendHandle::ndarray(), ChatService::default()).routes();

        let resp = request()
            .method("POST")
            .path("/predict")
            .json(&json!({
                "past_cycles": [28, 29, 30, 28, 27, 29],
                "last_period_date": "2025-01-15"
            }))
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), 200);
        let body: Value = serde_json::from_slice(resp.body())?;
        assert!(body["predicted_cycle_length"].is_i64());
        assert!(body["predicted_next_period_formatted"].is_string());

        let resp = request()
            .method("POST")
            .path("/predict")
            .json(&json!({
                "past_cycles": [28, 29, 30],
                "last_period_date": "2025-01-15"
            }))
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), 422);
        let body: Value = serde_json::from_slice(resp.body())?;
        assert!(body["detail"].as_str().unwrap_or_default().contains("at least 4"));

        let resp = request().method("GET").path("/predict/frameworks").reply(&routes).await;
        assert_eq!(resp.status(), 200);
        let body: Value = serde_json::from_slice(resp.body())?;
        assert_eq!(body["default"], "ndarray-lstm");

        Ok(())
    }

    #[tokio::test]
    async fn test_http_backend_unavailable() -> Result<()> {
        let routes = server(BackendHandle::from_name("disabled"), ChatService::default()).routes();

        let resp = request()
            .method("POST")
            .path("/predict")
            .json(&json!({
                "past_cycles": [28, 29, 30, 28],
                "last_period_date": "2025-01-15"
            }))
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), 503);

        let resp = request().method("GET").path("/health").reply(&routes).await;
        let body: Value = serde_json::from_slice(resp.body())?;
        assert_eq!(body["cycle_predictor"]["status"], "no ML frameworks available");

        Ok(())
    }

    #[tokio::test]
    async fn test_http_chat_and_pcos() -> Result<()> {
        let completion = FixedCompletion::new("RELEVANT", "Tracking helps spot patterns.");
        let chat = ChatService::new(Some(completion as Arc<dyn CompletionService>));
        let routes = server(BackendHandle::ndarray(), chat).routes();

        let resp = request()
            .method("POST")
            .path("/chat")
            .json(&json!({ "message": "Should I track my cycle?" }))
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), 200);
        let body: Value = serde_json::from_slice(resp.body())?;
        assert_eq!(body["response"], "Tracking helps spot patterns.");
        assert_eq!(body["safety_triggered"], false);

        let resp = request()
            .method("POST")
            .path("/chat")
            .json(&json!({ "message": "" }))
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), 400);

        let resp = request()
            .method("POST")
            .path("/pcos/risk-assessment")
            .json(&json!({
                "irregular_periods": true,
                "weight_gain": false,
                "excess_hair_growth": true,
                "acne": false,
                "family_history": false,
                "dark_skin_patches": false
            }))
            .reply(&routes)
            .await;
        assert_eq!(resp.status(), 200);
        let body: Value = serde_json::from_slice(resp.body())?;
        assert_eq!(body["risk_level"], "Moderate");

        Ok(())
    }
}
