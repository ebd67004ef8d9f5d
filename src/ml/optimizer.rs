//! Adam (Adaptive Moment Estimation) over every model tensor.

use ndarray::{ArrayD, Zip};

use super::lstm::Parameters;

#[derive(Debug, Clone)]
pub struct Adam {
    pub learning_rate: f32,
    pub beta1: f32,
    pub beta2: f32,
    pub epsilon: f32,
    t: i32,
    m: Vec<ArrayD<f32>>,
    v: Vec<ArrayD<f32>>,
}

impl Adam {
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            epsilon: 1e-8,
            t: 0,
            m: Vec::new(),
            v: Vec::new(),
        }
    }

    /// One update of `params` against `grads` (same structure).
    pub fn step(&mut self, params: &mut Parameters, grads: &Parameters) {
        let grads = grads.tensors();
        if self.m.len() != grads.len() {
            self.m = grads.iter().map(|g| ArrayD::zeros(g.raw_dim())).collect();
            self.v = grads.iter().map(|g| ArrayD::zeros(g.raw_dim())).collect();
            self.t = 0;
        }
        self.t += 1;

        let (beta1, beta2, eps, lr) = (self.beta1, self.beta2, self.epsilon, self.learning_rate);
        let bias1 = 1.0 - beta1.powi(self.t);
        let bias2 = 1.0 - beta2.powi(self.t);

        for (((mut weights, grad), m), v) in params
            .tensors_mut()
            .into_iter()
            .zip(grads.iter())
            .zip(self.m.iter_mut())
            .zip(self.v.iter_mut())
        {
            Zip::from(&mut weights)
                .and(grad)
                .and(m)
                .and(v)
                .for_each(|w, &g, m, v| {
                    *m = beta1 * *m + (1.0 - beta1) * g;
                    *v = beta2 * *v + (1.0 - beta2) * g * g;
                    let m_hat = *m / bias1;
                    let v_hat = *v / bias2;
                    *w -= lr * m_hat / (v_hat.sqrt() + eps);
                });
        }
    }
}
