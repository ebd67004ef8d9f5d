//! Min-max normalization and sliding-window dataset construction.

use ndarray::{s, Array1, Array2, Array3, ArrayView2, Axis};

use crate::core::{PredictionError, PredictionResult};

/// Smallest window the windower will shrink to.
pub const MIN_SEQUENCE_LENGTH: usize = 3;

/// Observed range of one feature channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureRange {
    pub min: f32,
    pub max: f32,
}

impl FeatureRange {
    pub fn fit<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f32>,
    {
        let (min, max) = values
            .into_iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });

        if min > max {
            // no observations
            return Self { min: 0.0, max: 0.0 };
        }
        Self { min, max }
    }

    /// A constant channel carries no scale information.
    pub fn is_degenerate(&self) -> bool {
        self.max == self.min
    }

    pub fn normalize(&self, value: f32) -> f32 {
        if self.is_degenerate() {
            0.5
        } else {
            (value - self.min) / (self.max - self.min)
        }
    }

    /// Inverse of [`normalize`](Self::normalize); always `min` for a constant channel.
    pub fn denormalize(&self, value: f32) -> f32 {
        if self.is_degenerate() {
            self.min
        } else {
            value * (self.max - self.min) + self.min
        }
    }
}

/// Per-feature ranges fitted on one request's history.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizationParams {
    ranges: Vec<FeatureRange>,
}

impl NormalizationParams {
    /// Fit one range per column of `matrix` (rows are cycles).
    pub fn fit(matrix: &Array2<f32>) -> Self {
        let ranges = matrix
            .axis_iter(Axis(1))
            .map(|column| FeatureRange::fit(column.iter().copied()))
            .collect();
        Self { ranges }
    }

    pub fn n_features(&self) -> usize {
        self.ranges.len()
    }

    /// Range of the cycle-length channel.
    pub fn target(&self) -> &FeatureRange {
        &self.ranges[0]
    }

    pub fn transform(&self, matrix: &Array2<f32>) -> Array2<f32> {
        let mut normalized = matrix.clone();
        for (mut column, range) in normalized.axis_iter_mut(Axis(1)).zip(&self.ranges) {
            column.mapv_inplace(|v| range.normalize(v));
        }
        normalized
    }
}

/// Input windows and next-step targets, all normalized.
#[derive(Debug, Clone)]
pub struct WindowedDataset {
    /// `[samples, sequence_length, features]`
    pub inputs: Array3<f32>,
    /// Normalized cycle length following each window
    pub targets: Array1<f32>,
    /// Window length actually used
    pub sequence_length: usize,
}

impl WindowedDataset {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.inputs.shape()[2]
    }
}

/// Window length to use for a history of `history_len` points.
///
/// Short histories shrink the window to `max(3, history_len - 1)`; a history
/// that cannot produce a single window of that size is rejected.
pub fn effective_sequence_length(history_len: usize, requested: usize) -> PredictionResult<usize> {
    if requested == 0 {
        return Err(PredictionError::InvalidInput(
            "sequence length must be positive".to_string(),
        ));
    }

    let length = if history_len < requested + 1 {
        MIN_SEQUENCE_LENGTH.max(history_len.saturating_sub(1))
    } else {
        requested
    };

    if history_len < length + 1 {
        return Err(PredictionError::InsufficientHistory { len: history_len });
    }
    Ok(length)
}

/// Stride-1 windows over normalized rows; targets come from channel 0 of
/// the row after each window.
pub fn build_windows(normalized: ArrayView2<f32>, requested: usize) -> PredictionResult<WindowedDataset> {
    let rows = normalized.nrows();
    let sequence_length = effective_sequence_length(rows, requested)?;
    let samples = rows - sequence_length;
    let features = normalized.ncols();

    let mut inputs = Array3::zeros((samples, sequence_length, features));
    let mut targets = Array1::zeros(samples);
    for i in 0..samples {
        inputs
            .slice_mut(s![i, .., ..])
            .assign(&normalized.slice(s![i..i + sequence_length, ..]));
        targets[i] = normalized[[i + sequence_length, 0]];
    }

    Ok(WindowedDataset {
        inputs,
        targets,
        sequence_length,
    })
}

/// Single-column matrix from a cycle-length series.
pub fn series_matrix(cycles: &[i64]) -> Array2<f32> {
    Array2::from_shape_fn((cycles.len(), 1), |(i, _)| cycles[i] as f32)
}

/// Normalize `raw` and window it; returns the dataset and the fitted ranges.
pub fn preprocess(raw: &Array2<f32>, requested: usize) -> PredictionResult<(WindowedDataset, NormalizationParams)> {
    let params = NormalizationParams::fit(raw);
    let normalized = params.transform(raw);
    let dataset = build_windows(normalized.view(), requested)?;
    Ok((dataset, params))
}

/// Last `sequence_length` raw rows, normalized with `params`.
pub fn trailing_window(raw: &Array2<f32>, params: &NormalizationParams, sequence_length: usize) -> Array2<f32> {
    let start = raw.nrows().saturating_sub(sequence_length);
    params.transform(&raw.slice(s![start.., ..]).to_owned())
}
