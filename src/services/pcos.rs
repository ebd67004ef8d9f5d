//! Heuristic PCOS risk score. Not a diagnosis.

use crate::core::types::{PcosRiskRequest, PcosRiskResponse, RiskLevel};

const IRREGULAR_PERIODS: u32 = 30;
const EXCESS_HAIR_GROWTH: u32 = 20;
const WEIGHT_GAIN: u32 = 15;
const FAMILY_HISTORY: u32 = 15;
const ACNE: u32 = 10;
const DARK_SKIN_PATCHES: u32 = 10;
/// Added for an out-of-range average cycle when irregular periods were not reported.
const ATYPICAL_CYCLE_LENGTH: u32 = 20;

const LOW_RECOMMENDATION: &str =
    "Your symptoms do not strongly suggest PCOS. Maintain a healthy lifestyle and track your cycles.";
const MODERATE_RECOMMENDATION: &str = "You have some symptoms associated with PCOS. \
Consider monitoring your symptoms and consulting a doctor if they persist.";
const HIGH_RECOMMENDATION: &str = "Your reported symptoms are strongly associated with PCOS. \
It is highly recommended to consult a healthcare provider for a proper evaluation.";

pub fn risk_score(data: &PcosRiskRequest) -> u32 {
    let indicators = [
        (data.irregular_periods, IRREGULAR_PERIODS),
        (data.excess_hair_growth, EXCESS_HAIR_GROWTH),
        (data.weight_gain, WEIGHT_GAIN),
        (data.family_history, FAMILY_HISTORY),
        (data.acne, ACNE),
        (data.dark_skin_patches, DARK_SKIN_PATCHES),
    ];
    let mut score: u32 = indicators
        .iter()
        .filter(|(present, _)| *present)
        .map(|(_, points)| points)
        .sum();

    // a zero average is treated as not provided
    if let Some(avg) = data.cycle_length_avg.filter(|&avg| avg != 0) {
        if !(21..=35).contains(&avg) && !data.irregular_periods {
            score += ATYPICAL_CYCLE_LENGTH;
        }
    }

    score
}

pub fn calculate_pcos_risk(data: &PcosRiskRequest) -> PcosRiskResponse {
    let score = risk_score(data);

    let (risk_level, recommendation) = match score {
        0..=30 => (RiskLevel::Low, LOW_RECOMMENDATION),
        31..=60 => (RiskLevel::Moderate, MODERATE_RECOMMENDATION),
        _ => (RiskLevel::High, HIGH_RECOMMENDATION),
    };

    PcosRiskResponse {
        risk_score: score,
        risk_level,
        recommendation: recommendation.to_string(),
    }
}
