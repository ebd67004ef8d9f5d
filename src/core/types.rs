use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Chat request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

/// Chat response body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub response: String,
    #[serde(default)]
    pub safety_triggered: bool,
}

/// Baseline cycle prediction request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRequest {
    /// Past cycle lengths in days, oldest first
    pub past_cycles: Vec<i64>,
    /// Start date of the most recent period, `YYYY-MM-DD`
    pub last_period_date: String,
    #[serde(default)]
    pub framework: Option<String>,
}

/// Day-count and calendar range around the point prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub predicted_days: i64,
    pub min_days: i64,
    pub max_days: i64,
    pub earliest_date: NaiveDate,
    pub latest_date: NaiveDate,
}

/// Descriptive statistics over the raw history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleStatistics {
    pub average_cycle_length: f64,
    pub std_deviation: f64,
    pub min_cycle: i64,
    pub max_cycle: i64,
    pub total_cycles_analyzed: usize,
}

/// Result of one baseline prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CyclePrediction {
    pub predicted_cycle_length: i64,
    pub predicted_next_period: NaiveDate,
    pub predicted_next_period_formatted: String,
    pub confidence_interval: ConfidenceInterval,
    pub statistics: CycleStatistics,
    pub uncertainty_days: f64,
    pub framework_used: String,
}

/// Symptom scores for one cycle, each 0..=5.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymptomData {
    pub cramps: Option<i64>,
    pub mood_changes: Option<i64>,
    pub energy_level: Option<i64>,
    pub bloating: Option<i64>,
    pub headaches: Option<i64>,
}

/// Lifestyle factors for one cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifestyleData {
    pub stress_level: Option<i64>,
    pub exercise_intensity: Option<i64>,
    pub sleep_quality: Option<i64>,
    /// -2 significant loss, 0 stable, 2 significant gain
    pub weight_change: Option<i64>,
}

/// One tracked cycle with optional symptom and lifestyle data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CycleRecord {
    pub cycle_length: i64,
    pub date: String,
    #[serde(default)]
    pub symptoms: Option<SymptomData>,
    #[serde(default)]
    pub flow_intensity: Option<String>,
    #[serde(default)]
    pub lifestyle: Option<LifestyleData>,
}

/// Multi-feature prediction request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancedPredictionRequest {
    pub cycle_records: Vec<CycleRecord>,
    pub last_period_date: String,
    #[serde(default)]
    pub framework: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub cycle_history: f64,
    pub symptoms: f64,
    pub lifestyle: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataQuality {
    Fair,
    Good,
}

/// Multi-feature prediction with confidence scoring and insights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnhancedPrediction {
    #[serde(flatten)]
    pub base: CyclePrediction,
    pub confidence_score: f64,
    pub confidence_level: ConfidenceLevel,
    pub data_quality: DataQuality,
    pub insights: Vec<String>,
    pub feature_importance: FeatureImportance,
}

/// Self-reported PCOS indicators.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PcosRiskRequest {
    pub irregular_periods: bool,
    pub weight_gain: bool,
    pub excess_hair_growth: bool,
    pub acne: bool,
    pub family_history: bool,
    pub dark_skin_patches: bool,
    #[serde(default)]
    pub cycle_length_avg: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PcosRiskResponse {
    pub risk_score: u32,
    pub risk_level: RiskLevel,
    pub recommendation: String,
}
