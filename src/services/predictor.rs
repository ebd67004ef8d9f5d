//! Baseline cycle prediction: validated history in, calendar projection out.

use chrono::NaiveDate;
use tracing::info;

use crate::core::types::{CyclePrediction, PredictionRequest};
use crate::core::{PredictionError, PredictionResult};
use crate::ml::{forecast_next, preprocessing::series_matrix, project, BackendHandle, ModelConfig};
use crate::track_performance;

pub const MIN_CYCLES: usize = 4;
pub const MIN_CYCLE_DAYS: i64 = 20;
pub const MAX_CYCLE_DAYS: i64 = 45;
pub const DEFAULT_SEQUENCE_LENGTH: usize = 6;

/// Past cycle lengths that passed boundary validation.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleHistory(Vec<i64>);

impl CycleHistory {
    pub fn new(cycles: Vec<i64>) -> PredictionResult<Self> {
        if cycles.len() < MIN_CYCLES {
            return Err(PredictionError::InvalidInput(
                "Need at least 4 past cycles for prediction".to_string(),
            ));
        }
        if cycles.iter().any(|c| !(MIN_CYCLE_DAYS..=MAX_CYCLE_DAYS).contains(c)) {
            return Err(PredictionError::InvalidInput(
                "Cycle lengths must be between 20 and 45 days".to_string(),
            ));
        }
        Ok(Self(cycles))
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

pub fn parse_date(value: &str) -> PredictionResult<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| PredictionError::InvalidInput("Date must be in YYYY-MM-DD format".to_string()))
}

/// Check an optional requested framework against the one actually serving.
pub fn resolve_framework(requested: Option<&str>, backend: &BackendHandle) -> PredictionResult<()> {
    let (Some(requested), Some(available)) = (requested, backend.name()) else {
        return Ok(());
    };
    if requested.eq_ignore_ascii_case(available) {
        Ok(())
    } else {
        Err(PredictionError::InvalidInput(format!(
            "Only \"{available}\" framework is supported"
        )))
    }
}

/// Per-request trainer and projector for single-channel histories.
#[derive(Debug, Clone)]
pub struct CyclePredictor {
    backend: BackendHandle,
    sequence_length: usize,
}

impl CyclePredictor {
    pub fn new(backend: BackendHandle) -> Self {
        Self {
            backend,
            sequence_length: DEFAULT_SEQUENCE_LENGTH,
        }
    }

    pub fn with_sequence_length(mut self, sequence_length: usize) -> Self {
        self.sequence_length = sequence_length;
        self
    }

    pub fn backend(&self) -> &BackendHandle {
        &self.backend
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }

    /// Validate a raw request body and predict.
    pub fn predict_request(&self, request: &PredictionRequest) -> PredictionResult<CyclePrediction> {
        let history = CycleHistory::new(request.past_cycles.clone())?;
        let last_period = parse_date(&request.last_period_date)?;
        resolve_framework(request.framework.as_deref(), &self.backend)?;
        self.predict(&history, last_period)
    }

    pub fn predict(&self, history: &CycleHistory, last_period: NaiveDate) -> PredictionResult<CyclePrediction> {
        let backend = self.backend.acquire()?;
        track_performance!("cycle_prediction");

        let raw = series_matrix(history.as_slice());
        let config = ModelConfig::baseline(1);
        let predicted = forecast_next(backend.as_ref(), &raw, self.sequence_length, &config)?;

        info!(
            cycles = history.len(),
            predicted,
            backend = backend.name(),
            "cycle prediction complete"
        );
        project(history.as_slice(), last_period, predicted, backend.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{NumericBackend, TrainedModel, WindowedDataset};
    use ndarray::Array2;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Counts fits and always predicts the top of the observed range.
    #[derive(Default)]
    struct SpyBackend {
        fits: AtomicUsize,
    }

    struct ConstantModel(f32);

    impl TrainedModel for ConstantModel {
        fn predict(&self, _window: &Array2<f32>) -> PredictionResult<f32> {
            Ok(self.0)
        }
    }

    impl NumericBackend for SpyBackend {
        fn name(&self) -> &str {
            "spy"
        }

        fn fit(&self, _dataset: &WindowedDataset, _config: &ModelConfig) -> PredictionResult<Box<dyn TrainedModel>> {
            self.fits.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(ConstantModel(1.0)))
        }
    }

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_history_validation() {
        assert!(CycleHistory::new(vec![28, 30, 27]).is_err());
        assert!(CycleHistory::new(vec![28, 30, 27, 19]).is_err());
        assert!(CycleHistory::new(vec![28, 30, 27, 46]).is_err());
        assert!(CycleHistory::new(vec![20, 45, 27, 29]).is_ok());
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(date("2025-01-15"), NaiveDate::from_ymd_opt(2025, 1, 15).unwrap());
        assert_eq!(
            parse_date("15/01/2025"),
            Err(PredictionError::InvalidInput("Date must be in YYYY-MM-DD format".to_string()))
        );
    }

    #[test]
    fn test_minimal_history_prediction() {
        let predictor = CyclePredictor::new(BackendHandle::ndarray());
        let history = CycleHistory::new(vec![28, 30, 27, 29]).unwrap();
        let last = date("2025-01-15");

        let result = predictor.predict(&history, last).unwrap();
        let expected_next = last + chrono::Duration::days(result.predicted_cycle_length);
        assert_eq!(result.predicted_next_period, expected_next);

        let band = &result.confidence_interval;
        assert!(band.min_days <= band.predicted_days && band.predicted_days <= band.max_days);
        assert!(band.earliest_date <= result.predicted_next_period);
        assert!(result.predicted_next_period <= band.latest_date);

        assert_eq!(result.statistics.average_cycle_length, 28.5);
        assert_eq!(result.statistics.min_cycle, 27);
        assert_eq!(result.statistics.max_cycle, 30);
        assert_eq!(result.statistics.total_cycles_analyzed, 4);
        assert_eq!(result.framework_used, "ndarray-lstm");
    }

    #[test]
    fn test_unavailable_backend_never_trains() {
        let spy = Arc::new(SpyBackend::default());
        let handle = BackendHandle::Available(spy.clone());
        let predictor = CyclePredictor::new(handle);
        let history = CycleHistory::new(vec![28, 30, 27, 29]).unwrap();

        predictor.predict(&history, date("2025-01-15")).unwrap();
        assert_eq!(spy.fits.load(Ordering::SeqCst), 1);

        let unavailable = CyclePredictor::new(BackendHandle::unavailable("not installed"));
        let result = unavailable.predict(&history, date("2025-01-15"));
        assert!(matches!(result, Err(PredictionError::BackendUnavailable(_))));
        assert_eq!(spy.fits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_denormalized_through_backend() {
        // normalized 1.0 maps back to the observed maximum
        let predictor = CyclePredictor::new(BackendHandle::Available(Arc::new(SpyBackend::default())));
        let history = CycleHistory::new(vec![28, 30, 27, 29, 26]).unwrap();

        let result = predictor.predict(&history, date("2025-01-15")).unwrap();
        assert_eq!(result.predicted_cycle_length, 30);
        assert_eq!(result.framework_used, "spy");
    }

    #[test]
    fn test_framework_mismatch() {
        let predictor = CyclePredictor::new(BackendHandle::ndarray());
        let request = PredictionRequest {
            past_cycles: vec![28, 30, 27, 29],
            last_period_date: "2025-01-15".to_string(),
            framework: Some("pytorch".to_string()),
        };
        assert!(matches!(
            predictor.predict_request(&request),
            Err(PredictionError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_repeated_predictions_stay_plausible() {
        let predictor = CyclePredictor::new(BackendHandle::ndarray());
        let history = CycleHistory::new(vec![28, 29, 28, 30, 27, 28, 29, 28]).unwrap();

        for _ in 0..3 {
            let result = predictor.predict(&history, date("2025-01-15")).unwrap();
            let stats = &result.statistics;
            // within one observed range width of the history
            let spread = stats.max_cycle - stats.min_cycle;
            assert!((stats.min_cycle - spread..=stats.max_cycle + spread).contains(&result.predicted_cycle_length));
            assert_eq!(result.statistics.total_cycles_analyzed, 8);
        }
    }
}
