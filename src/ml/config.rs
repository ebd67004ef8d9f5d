//! Sequence model and training hyperparameters

use serde::{Deserialize, Serialize};

/// Architecture and training settings for one model instance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Feature channels per timestep
    pub input_size: usize,
    /// Width of each recurrent layer
    pub hidden_size: usize,
    /// Stacked recurrent layers
    pub num_layers: usize,
    /// Width of the hidden dense layer in the head
    pub head_size: usize,
    /// Dropout between recurrent layers and inside the head (training only)
    pub dropout: f32,
    /// Full-batch epochs
    pub epochs: usize,
    /// Adam step size
    pub learning_rate: f32,
}

impl ModelConfig {
    pub fn new(input_size: usize, hidden_size: usize) -> Self {
        Self {
            input_size,
            hidden_size,
            num_layers: 2,
            head_size: 32,
            dropout: 0.0,
            epochs: 50,
            learning_rate: 0.01,
        }
    }

    /// 32-wide recurrent core, 50 epochs at lr 0.01, no dropout.
    pub fn baseline(input_size: usize) -> Self {
        Self::new(input_size, 32)
    }

    /// 64-wide recurrent core, 100 epochs at lr 0.001, dropout 0.2.
    pub fn enhanced(input_size: usize) -> Self {
        Self::new(input_size, 64)
            .with_dropout(0.2)
            .with_epochs(100)
            .with_learning_rate(0.001)
    }

    pub fn with_dropout(mut self, dropout: f32) -> Self {
        self.dropout = dropout;
        self
    }

    pub fn with_epochs(mut self, epochs: usize) -> Self {
        self.epochs = epochs;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f32) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_head_size(mut self, head_size: usize) -> Self {
        self.head_size = head_size;
        self
    }
}
