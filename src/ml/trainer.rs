use rand::RngCore;
use tracing::debug;

use super::config::ModelConfig;
use super::lstm::SequenceModel;
use super::optimizer::Adam;
use super::preprocessing::WindowedDataset;
use crate::core::{PredictionError, PredictionResult};

/// Loss trajectory of a finished fit.
#[derive(Debug, Clone, Default)]
pub struct TrainingReport {
    pub epochs: usize,
    pub loss_history: Vec<f32>,
}

impl TrainingReport {
    pub fn final_loss(&self) -> Option<f32> {
        self.loss_history.last().copied()
    }
}

/// Full-batch Adam training of a fresh [`SequenceModel`].
#[derive(Debug, Clone)]
pub struct Trainer {
    config: ModelConfig,
}

impl Trainer {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    /// Train from an unseeded initialization.
    pub fn fit(&self, dataset: &WindowedDataset) -> PredictionResult<(SequenceModel, TrainingReport)> {
        let mut rng = rand::thread_rng();
        self.fit_with_rng(dataset, &mut rng)
    }

    pub fn fit_with_rng(
        &self,
        dataset: &WindowedDataset,
        rng: &mut dyn RngCore,
    ) -> PredictionResult<(SequenceModel, TrainingReport)> {
        if dataset.is_empty() {
            return Err(PredictionError::PredictionFailed(
                "no training windows".to_string(),
            ));
        }
        if dataset.n_features() != self.config.input_size {
            return Err(PredictionError::PredictionFailed(format!(
                "expected {} input features, got {}",
                self.config.input_size,
                dataset.n_features()
            )));
        }

        let mut model = SequenceModel::new(self.config, rng);
        let mut optimizer = Adam::new(self.config.learning_rate);
        let mut report = TrainingReport {
            epochs: self.config.epochs,
            loss_history: Vec::with_capacity(self.config.epochs),
        };

        for epoch in 0..self.config.epochs {
            let (loss, grads) = model.loss_and_gradients(&dataset.inputs, &dataset.targets, Some(&mut *rng));
            if !loss.is_finite() {
                return Err(PredictionError::PredictionFailed(format!(
                    "training diverged at epoch {}",
                    epoch + 1
                )));
            }

            optimizer.step(model.parameters_mut(), &grads);
            report.loss_history.push(loss);

            if (epoch + 1) % 20 == 0 {
                debug!(epoch = epoch + 1, loss, "training progress");
            }
        }

        Ok((model, report))
    }
}
