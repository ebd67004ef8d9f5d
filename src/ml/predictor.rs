//! Inference on the trailing window and calendar projection.

use chrono::{Duration, NaiveDate};
use ndarray::Array2;

use super::backend::NumericBackend;
use super::config::ModelConfig;
use super::preprocessing::{preprocess, trailing_window};
use super::stats::{calculate_uncertainty, describe};
use crate::core::types::{ConfidenceInterval, CyclePrediction};
use crate::core::{PredictionError, PredictionResult};

/// Human readable date, e.g. `Wednesday, February 12, 2025`.
pub const FORMATTED_DATE: &str = "%A, %B %d, %Y";

/// Train on `raw` (rows are cycles, column 0 is cycle length) and return the
/// denormalized next cycle length.
pub fn forecast_next(
    backend: &dyn NumericBackend,
    raw: &Array2<f32>,
    requested_sequence_length: usize,
    config: &ModelConfig,
) -> PredictionResult<f32> {
    let (dataset, params) = preprocess(raw, requested_sequence_length)?;
    let model = backend.fit(&dataset, config)?;

    let window = trailing_window(raw, &params, dataset.sequence_length);
    let normalized = model.predict(&window)?;
    if !normalized.is_finite() {
        return Err(PredictionError::PredictionFailed(
            "model produced a non-finite value".to_string(),
        ));
    }

    Ok(params.target().denormalize(normalized))
}

/// Round a raw forecast to whole days (ties to even) and project it onto the
/// calendar.
pub fn project(
    history: &[i64],
    last_period: NaiveDate,
    predicted: f32,
    framework: &str,
) -> PredictionResult<CyclePrediction> {
    if !predicted.is_finite() {
        return Err(PredictionError::PredictionFailed(format!(
            "non-finite cycle length: {predicted}"
        )));
    }
    let predicted_days = predicted.round_ties_even() as i64;
    let uncertainty = calculate_uncertainty(history);
    let half_width = uncertainty.floor() as i64;

    let out_of_range = || PredictionError::PredictionFailed(format!("date out of range: {predicted_days} days"));
    let min_days = predicted_days.checked_sub(half_width).ok_or_else(out_of_range)?;
    let max_days = predicted_days.checked_add(half_width).ok_or_else(out_of_range)?;
    let shift = |days: i64| {
        Duration::try_days(days)
            .and_then(|offset| last_period.checked_add_signed(offset))
            .ok_or_else(out_of_range)
    };

    let next_period = shift(predicted_days)?;
    let earliest = shift(min_days)?;
    let latest = shift(max_days)?;

    Ok(CyclePrediction {
        predicted_cycle_length: predicted_days,
        predicted_next_period: next_period,
        predicted_next_period_formatted: next_period.format(FORMATTED_DATE).to_string(),
        confidence_interval: ConfidenceInterval {
            predicted_days,
            min_days,
            max_days,
            earliest_date: earliest,
            latest_date: latest,
        },
        statistics: describe(history),
        uncertainty_days: uncertainty,
        framework_used: framework.to_string(),
    })
}
