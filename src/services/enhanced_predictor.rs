//! Multi-feature prediction with confidence scoring and insights.

use ndarray::Array2;
use tracing::info;

use super::predictor::{parse_date, resolve_framework, CycleHistory, DEFAULT_SEQUENCE_LENGTH};
use crate::core::types::{
    ConfidenceLevel, CycleRecord, DataQuality, EnhancedPrediction, EnhancedPredictionRequest,
    FeatureImportance,
};
use crate::core::{PredictionError, PredictionResult};
use crate::ml::{forecast_next, project, BackendHandle, ModelConfig};
use crate::track_performance;

/// Channels per row of the enhanced feature matrix.
pub const FEATURE_COUNT: usize = 11;

/// Column names in matrix order; column 0 is the prediction target.
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "cycle_length",
    "cramps",
    "mood_changes",
    "energy_level",
    "bloating",
    "headaches",
    "flow_intensity",
    "stress_level",
    "exercise_intensity",
    "sleep_quality",
    "weight_change",
];

const SCORE_RANGE: (i64, i64) = (0, 5);
const WEIGHT_CHANGE_RANGE: (i64, i64) = (-2, 2);

fn flow_code(flow: Option<&str>) -> PredictionResult<f32> {
    match flow.map(|f| f.trim().to_lowercase()).as_deref() {
        None => Ok(0.0),
        Some("light") => Ok(1.0),
        Some("medium") => Ok(2.0),
        Some("heavy") => Ok(3.0),
        Some(_) => Err(PredictionError::InvalidInput(
            "Flow intensity must be: light, medium, or heavy".to_string(),
        )),
    }
}

fn check_range(name: &str, value: Option<i64>, (lo, hi): (i64, i64)) -> PredictionResult<()> {
    match value {
        Some(v) if v < lo || v > hi => Err(PredictionError::InvalidInput(format!(
            "{name} must be between {lo} and {hi}"
        ))),
        _ => Ok(()),
    }
}

/// Boundary checks for one record beyond what serde enforces.
pub fn validate_record(record: &CycleRecord) -> PredictionResult<()> {
    parse_date(&record.date)?;
    flow_code(record.flow_intensity.as_deref())?;

    if let Some(s) = &record.symptoms {
        check_range("cramps", s.cramps, SCORE_RANGE)?;
        check_range("mood_changes", s.mood_changes, SCORE_RANGE)?;
        check_range("energy_level", s.energy_level, SCORE_RANGE)?;
        check_range("bloating", s.bloating, SCORE_RANGE)?;
        check_range("headaches", s.headaches, SCORE_RANGE)?;
    }
    if let Some(l) = &record.lifestyle {
        check_range("stress_level", l.stress_level, SCORE_RANGE)?;
        check_range("exercise_intensity", l.exercise_intensity, SCORE_RANGE)?;
        check_range("sleep_quality", l.sleep_quality, SCORE_RANGE)?;
        check_range("weight_change", l.weight_change, WEIGHT_CHANGE_RANGE)?;
    }
    Ok(())
}

/// One row per record in [`FEATURE_NAMES`] order; absent values are 0.
pub fn feature_matrix(records: &[CycleRecord]) -> PredictionResult<Array2<f32>> {
    let mut matrix = Array2::zeros((records.len(), FEATURE_COUNT));

    for (mut row, record) in matrix.rows_mut().into_iter().zip(records) {
        let symptoms = record.symptoms.clone().unwrap_or_default();
        let lifestyle = record.lifestyle.clone().unwrap_or_default();
        let value = |v: Option<i64>| v.unwrap_or(0) as f32;

        row[0] = record.cycle_length as f32;
        row[1] = value(symptoms.cramps);
        row[2] = value(symptoms.mood_changes);
        row[3] = value(symptoms.energy_level);
        row[4] = value(symptoms.bloating);
        row[5] = value(symptoms.headaches);
        row[6] = flow_code(record.flow_intensity.as_deref())?;
        row[7] = value(lifestyle.stress_level);
        row[8] = value(lifestyle.exercise_intensity);
        row[9] = value(lifestyle.sleep_quality);
        row[10] = value(lifestyle.weight_change);
    }

    Ok(matrix)
}

/// Heuristic confidence in `[10, 99]`, rounded to one decimal.
pub fn confidence_score(std_dev: f64, cycle_count: usize) -> f64 {
    let mut score: f64 = 70.0;

    if std_dev < 2.0 {
        score += 15.0;
    } else if std_dev < 4.0 {
        score += 5.0;
    } else if std_dev > 6.0 {
        score -= 10.0;
    }

    if cycle_count > 10 {
        score += 10.0;
    } else if cycle_count > 6 {
        score += 5.0;
    }

    (score.clamp(10.0, 99.0) * 10.0_f64).round() / 10.0
}

pub fn confidence_level(score: f64) -> ConfidenceLevel {
    if score >= 80.0 {
        ConfidenceLevel::High
    } else if score >= 60.0 {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

pub fn data_quality(cycle_count: usize) -> DataQuality {
    if cycle_count >= 6 {
        DataQuality::Good
    } else {
        DataQuality::Fair
    }
}

pub fn insights(average: f64, std_dev: f64, records: &[CycleRecord]) -> Vec<String> {
    let mut insights = Vec::new();

    if average < 26.0 {
        insights.push("Your cycle is shorter than average.".to_string());
    } else if average > 32.0 {
        insights.push("Your cycle is longer than average.".to_string());
    } else {
        insights.push("Your cycle length is within the normal range.".to_string());
    }

    if std_dev > 5.0 {
        insights.push("Your cycle length varies significantly.".to_string());
    } else {
        insights.push("Your cycle is quite regular.".to_string());
    }

    let tracked = records.iter().filter(|r| r.symptoms.is_some()).count();
    if tracked > 0 {
        insights.push(format!("You have tracked symptoms for {tracked} cycles."));
    }

    insights
}

/// Enhanced variant of the cycle predictor.
#[derive(Debug, Clone)]
pub struct EnhancedPredictor {
    backend: BackendHandle,
    sequence_length: usize,
}

impl EnhancedPredictor {
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

    pub fn predict_request(&self, request: &EnhancedPredictionRequest) -> PredictionResult<EnhancedPrediction> {
        let records = &request.cycle_records;
        let history = CycleHistory::new(records.iter().map(|r| r.cycle_length).collect())?;
        for record in records {
            validate_record(record)?;
        }
        let last_period = parse_date(&request.last_period_date)?;
        resolve_framework(request.framework.as_deref(), &self.backend)?;

        let backend = self.backend.acquire()?;
        track_performance!("enhanced_cycle_prediction");

        let raw = feature_matrix(records)?;
        let config = ModelConfig::enhanced(FEATURE_COUNT);
        let predicted = forecast_next(backend.as_ref(), &raw, self.sequence_length, &config)?;
        let base = project(history.as_slice(), last_period, predicted, backend.name())?;

        let std_dev = base.statistics.std_deviation;
        let count = history.len();
        let score = confidence_score(std_dev, count);

        info!(
            cycles = count,
            predicted = base.predicted_cycle_length,
            confidence = score,
            "enhanced prediction complete"
        );

        Ok(EnhancedPrediction {
            confidence_score: score,
            confidence_level: confidence_level(score),
            data_quality: data_quality(count),
            insights: insights(base.statistics.average_cycle_length, std_dev, records),
            feature_importance: FeatureImportance {
                cycle_history: 0.8,
                symptoms: 0.1,
                lifestyle: 0.1,
            },
            base,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{LifestyleData, SymptomData};
    use test_case::test_case;

    fn record(cycle_length: i64) -> CycleRecord {
        CycleRecord {
            cycle_length,
            date: "2024-12-15".to_string(),
            symptoms: None,
            flow_intensity: None,
            lifestyle: None,
        }
    }

    fn detailed(cycle_length: i64) -> CycleRecord {
        CycleRecord {
            symptoms: Some(SymptomData {
                cramps: Some(3),
                mood_changes: Some(2),
                energy_level: Some(4),
                bloating: None,
                headaches: Some(1),
            }),
            flow_intensity: Some("Medium".to_string()),
            lifestyle: Some(LifestyleData {
                stress_level: Some(2),
                exercise_intensity: Some(4),
                sleep_quality: Some(5),
                weight_change: Some(-1),
            }),
            ..record(cycle_length)
        }
    }

    #[test]
    fn test_feature_matrix_layout() {
        let matrix = feature_matrix(&[detailed(28), record(30)]).unwrap();

        assert_eq!(matrix.shape(), &[2, FEATURE_COUNT]);
        assert_eq!(
            matrix.row(0).to_vec(),
            vec![28.0, 3.0, 2.0, 4.0, 0.0, 1.0, 2.0, 2.0, 4.0, 5.0, -1.0]
        );
        assert_eq!(matrix.row(1).to_vec(), {
            let mut row = vec![0.0; FEATURE_COUNT];
            row[0] = 30.0;
            row
        });
    }

    #[test]
    fn test_invalid_record_fields() {
        let mut bad_flow = record(28);
        bad_flow.flow_intensity = Some("torrential".to_string());
        assert!(validate_record(&bad_flow).is_err());

        let mut bad_score = detailed(28);
        bad_score.symptoms.as_mut().unwrap().cramps = Some(6);
        assert!(validate_record(&bad_score).is_err());

        let mut bad_date = record(28);
        bad_date.date = "2024/12/15".to_string();
        assert!(validate_record(&bad_date).is_err());

        assert!(validate_record(&detailed(28)).is_ok());
    }

    #[test_case(1.0, 4 => 85.0 ; "regular short history")]
    #[test_case(3.0, 8 => 80.0 ; "moderate spread")]
    #[test_case(5.0, 5 => 70.0 ; "no adjustment")]
    #[test_case(7.0, 12 => 70.0 ; "irregular long history")]
    #[test_case(0.5, 12 => 95.0 ; "best case")]
    fn test_confidence_score(std_dev: f64, count: usize) -> f64 {
        confidence_score(std_dev, count)
    }

    #[test]
    fn test_confidence_level_and_quality() {
        assert_eq!(confidence_level(85.0), ConfidenceLevel::High);
        assert_eq!(confidence_level(60.0), ConfidenceLevel::Medium);
        assert_eq!(confidence_level(59.9), ConfidenceLevel::Low);
        assert_eq!(data_quality(6), DataQuality::Good);
        assert_eq!(data_quality(5), DataQuality::Fair);
    }

    #[test]
    fn test_insights() {
        let records = vec![detailed(24), record(25), detailed(24), record(25)];
        assert_eq!(
            insights(24.5, 0.5, &records),
            vec![
                "Your cycle is shorter than average.".to_string(),
                "Your cycle is quite regular.".to_string(),
                "You have tracked symptoms for 2 cycles.".to_string(),
            ]
        );

        let plain = vec![record(35); 4];
        assert_eq!(insights(34.0, 6.0, &plain).len(), 2);
    }

    #[test]
    fn test_enhanced_prediction() {
        let predictor = EnhancedPredictor::new(BackendHandle::ndarray());
        let request = EnhancedPredictionRequest {
            cycle_records: vec![detailed(28), detailed(30), record(27), detailed(29), record(28)],
            last_period_date: "2025-01-15".to_string(),
            framework: None,
        };

        let result = predictor.predict_request(&request).unwrap();
        assert_eq!(result.base.statistics.total_cycles_analyzed, 5);
        assert_eq!(result.data_quality, DataQuality::Fair);
        assert_eq!(result.confidence_score, 85.0);
        assert_eq!(result.confidence_level, ConfidenceLevel::High);
        assert_eq!(result.insights.len(), 3);
        let stats = &result.base.statistics;
        let spread = stats.max_cycle - stats.min_cycle;
        assert!((stats.min_cycle - spread..=stats.max_cycle + spread).contains(&result.base.predicted_cycle_length));
    }

    #[test]
    fn test_enhanced_unavailable_backend() {
        let predictor = EnhancedPredictor::new(BackendHandle::unavailable("disabled"));
        let request = EnhancedPredictionRequest {
            cycle_records: vec![record(28); 4],
            last_period_date: "2025-01-15".to_string(),
            framework: None,
        };
        assert!(matches!(
            predictor.predict_request(&request),
            Err(PredictionError::BackendUnavailable(_))
        ));
    }
}
