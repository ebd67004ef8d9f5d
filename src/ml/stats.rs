use ndarray::Array1;

use crate::core::types::CycleStatistics;

/// Half-width of the confidence band: population standard deviation of the
/// raw cycle lengths.
pub fn calculate_uncertainty(cycles: &[i64]) -> f64 {
    let values: Array1<f64> = cycles.iter().map(|&c| c as f64).collect();
    if values.is_empty() {
        return 0.0;
    }
    values.std(0.0)
}

/// Descriptive statistics shown next to a prediction.
pub fn describe(cycles: &[i64]) -> CycleStatistics {
    let values: Array1<f64> = cycles.iter().map(|&c| c as f64).collect();

    CycleStatistics {
        average_cycle_length: values.mean().unwrap_or(0.0),
        std_deviation: calculate_uncertainty(cycles),
        min_cycle: cycles.iter().copied().min().unwrap_or(0),
        max_cycle: cycles.iter().copied().max().unwrap_or(0),
        total_cycles_analyzed: cycles.len(),
    }
}
