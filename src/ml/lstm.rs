//! Two-layer LSTM with a two-layer dense head, trained with analytic
//! backpropagation through time.

use ndarray::{s, Array1, Array2, Array3, ArrayViewD, ArrayViewMutD, Axis};
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand::{Rng, RngCore};

use super::config::ModelConfig;

/// One recurrent layer. Gate blocks are laid out as input, forget, cell, output.
#[derive(Debug, Clone)]
pub struct LstmLayer {
    /// input -> gates `[input_size, 4 * hidden]`
    w_ih: Array2<f32>,
    /// hidden -> gates `[hidden, 4 * hidden]`
    w_hh: Array2<f32>,
    bias: Array1<f32>,
    hidden_size: usize,
}

/// Values kept from one forward timestep for the backward pass.
#[derive(Debug)]
struct StepCache {
    x: Array2<f32>,
    h_prev: Array2<f32>,
    c_prev: Array2<f32>,
    input_gate: Array2<f32>,
    forget_gate: Array2<f32>,
    candidate: Array2<f32>,
    output_gate: Array2<f32>,
    tanh_c: Array2<f32>,
}

impl LstmLayer {
    pub fn new<R: Rng + ?Sized>(input_size: usize, hidden_size: usize, rng: &mut R) -> Self {
        let limit = 1.0 / (hidden_size as f32).sqrt();
        let dist = Uniform::new(-limit, limit);

        Self {
            w_ih: Array2::random_using((input_size, 4 * hidden_size), dist, rng),
            w_hh: Array2::random_using((hidden_size, 4 * hidden_size), dist, rng),
            bias: Array1::random_using(4 * hidden_size, dist, rng),
            hidden_size,
        }
    }

    fn zeros_like(&self) -> Self {
        Self {
            w_ih: Array2::zeros(self.w_ih.raw_dim()),
            w_hh: Array2::zeros(self.w_hh.raw_dim()),
            bias: Array1::zeros(self.bias.raw_dim()),
            hidden_size: self.hidden_size,
        }
    }

    /// Run the layer over `steps` (each `[batch, input]`) from a zero state.
    fn forward_sequence(&self, steps: &[Array2<f32>]) -> (Vec<Array2<f32>>, Vec<StepCache>) {
        let hidden = self.hidden_size;
        let batch = steps.first().map(|x| x.nrows()).unwrap_or(0);

        let mut h = Array2::zeros((batch, hidden));
        let mut c = Array2::zeros((batch, hidden));
        let mut outputs = Vec::with_capacity(steps.len());
        let mut caches = Vec::with_capacity(steps.len());

        for x in steps {
            let gates = x.dot(&self.w_ih) + h.dot(&self.w_hh) + &self.bias;

            let input_gate = gates.slice(s![.., 0..hidden]).mapv(sigmoid);
            let forget_gate = gates.slice(s![.., hidden..2 * hidden]).mapv(sigmoid);
            let candidate = gates.slice(s![.., 2 * hidden..3 * hidden]).mapv(f32::tanh);
            let output_gate = gates.slice(s![.., 3 * hidden..]).mapv(sigmoid);

            let c_next = &forget_gate * &c + &input_gate * &candidate;
            let tanh_c = c_next.mapv(f32::tanh);
            let h_next = &output_gate * &tanh_c;

            outputs.push(h_next.clone());
            caches.push(StepCache {
                x: x.clone(),
                h_prev: h,
                c_prev: c,
                input_gate,
                forget_gate,
                candidate,
                output_gate,
                tanh_c,
            });

            h = h_next;
            c = c_next;
        }

        (outputs, caches)
    }

    /// Accumulate parameter gradients into `grads` and return the gradient
    /// with respect to each timestep's input.
    fn backward_sequence(
        &self,
        caches: &[StepCache],
        d_outputs: &[Array2<f32>],
        grads: &mut LstmLayer,
    ) -> Vec<Array2<f32>> {
        let hidden = self.hidden_size;
        let batch = caches.first().map(|cache| cache.x.nrows()).unwrap_or(0);

        let mut dh_next = Array2::<f32>::zeros((batch, hidden));
        let mut dc_next = Array2::<f32>::zeros((batch, hidden));
        let mut d_inputs = Vec::with_capacity(caches.len());

        for (cache, d_out) in caches.iter().zip(d_outputs).rev() {
            let dh = d_out + &dh_next;

            let d_output_gate = &dh * &cache.tanh_c;
            let dc = &dc_next + &(&dh * &cache.output_gate * &cache.tanh_c.mapv(tanh_derivative));

            let d_input_gate = &dc * &cache.candidate;
            let d_candidate = &dc * &cache.input_gate;
            let d_forget_gate = &dc * &cache.c_prev;
            dc_next = &dc * &cache.forget_gate;

            let mut d_gates = Array2::<f32>::zeros((batch, 4 * hidden));
            d_gates
                .slice_mut(s![.., 0..hidden])
                .assign(&(d_input_gate * &cache.input_gate.mapv(sigmoid_derivative)));
            d_gates
                .slice_mut(s![.., hidden..2 * hidden])
                .assign(&(d_forget_gate * &cache.forget_gate.mapv(sigmoid_derivative)));
            d_gates
                .slice_mut(s![.., 2 * hidden..3 * hidden])
                .assign(&(d_candidate * &cache.candidate.mapv(tanh_derivative)));
            d_gates
                .slice_mut(s![.., 3 * hidden..])
                .assign(&(d_output_gate * &cache.output_gate.mapv(sigmoid_derivative)));

            grads.w_ih += &cache.x.t().dot(&d_gates);
            grads.w_hh += &cache.h_prev.t().dot(&d_gates);
            grads.bias += &d_gates.sum_axis(Axis(0));

            dh_next = d_gates.dot(&self.w_hh.t());
            d_inputs.push(d_gates.dot(&self.w_ih.t()));
        }

        d_inputs.reverse();
        d_inputs
    }
}

/// Fully connected layer, `y = x W + b`.
#[derive(Debug, Clone)]
pub struct Dense {
    /// `[in, out]`
    weight: Array2<f32>,
    bias: Array1<f32>,
}

impl Dense {
    pub fn new<R: Rng + ?Sized>(input_size: usize, output_size: usize, rng: &mut R) -> Self {
        let limit = 1.0 / (input_size as f32).sqrt();
        let dist = Uniform::new(-limit, limit);

        Self {
            weight: Array2::random_using((input_size, output_size), dist, rng),
            bias: Array1::random_using(output_size, dist, rng),
        }
    }

    fn zeros_like(&self) -> Self {
        Self {
            weight: Array2::zeros(self.weight.raw_dim()),
            bias: Array1::zeros(self.bias.raw_dim()),
        }
    }

    fn forward(&self, x: &Array2<f32>) -> Array2<f32> {
        x.dot(&self.weight) + &self.bias
    }
}

/// Every trainable tensor of the model. Also used to hold gradients.
#[derive(Debug, Clone)]
pub struct Parameters {
    layers: Vec<LstmLayer>,
    fc1: Dense,
    fc2: Dense,
}

impl Parameters {
    fn zeros_like(&self) -> Self {
        Self {
            layers: self.layers.iter().map(LstmLayer::zeros_like).collect(),
            fc1: self.fc1.zeros_like(),
            fc2: self.fc2.zeros_like(),
        }
    }

    /// Mutable views in a fixed order matching [`tensors`](Self::tensors).
    pub fn tensors_mut(&mut self) -> Vec<ArrayViewMutD<'_, f32>> {
        let mut views = Vec::with_capacity(self.layers.len() * 3 + 4);
        for layer in self.layers.iter_mut() {
            let LstmLayer { w_ih, w_hh, bias, .. } = layer;
            views.push(w_ih.view_mut().into_dyn());
            views.push(w_hh.view_mut().into_dyn());
            views.push(bias.view_mut().into_dyn());
        }
        views.push(self.fc1.weight.view_mut().into_dyn());
        views.push(self.fc1.bias.view_mut().into_dyn());
        views.push(self.fc2.weight.view_mut().into_dyn());
        views.push(self.fc2.bias.view_mut().into_dyn());
        views
    }

    pub fn tensors(&self) -> Vec<ArrayViewD<'_, f32>> {
        let mut views = Vec::with_capacity(self.layers.len() * 3 + 4);
        for layer in &self.layers {
            views.push(layer.w_ih.view().into_dyn());
            views.push(layer.w_hh.view().into_dyn());
            views.push(layer.bias.view().into_dyn());
        }
        views.push(self.fc1.weight.view().into_dyn());
        views.push(self.fc1.bias.view().into_dyn());
        views.push(self.fc2.weight.view().into_dyn());
        views.push(self.fc2.bias.view().into_dyn());
        views
    }

    pub fn parameter_count(&self) -> usize {
        self.tensors().iter().map(|t| t.len()).sum()
    }
}

/// Intermediate values of one forward pass.
struct ForwardCache {
    layer_caches: Vec<Vec<StepCache>>,
    /// Dropout mask applied to each layer's inputs; never set for layer 0
    input_masks: Vec<Option<Vec<Array2<f32>>>>,
    last_hidden: Array2<f32>,
    pre_activation: Array2<f32>,
    head_mask: Option<Array2<f32>>,
    head_hidden: Array2<f32>,
    output: Array1<f32>,
}

/// Recurrent regressor mapping a normalized window to one normalized scalar.
#[derive(Debug, Clone)]
pub struct SequenceModel {
    config: ModelConfig,
    params: Parameters,
}

impl SequenceModel {
    /// Fresh randomly initialized model.
    pub fn new<R: Rng + ?Sized>(config: ModelConfig, rng: &mut R) -> Self {
        let mut layers = Vec::with_capacity(config.num_layers);
        layers.push(LstmLayer::new(config.input_size, config.hidden_size, rng));
        for _ in 1..config.num_layers {
            layers.push(LstmLayer::new(config.hidden_size, config.hidden_size, rng));
        }

        let fc1 = Dense::new(config.hidden_size, config.head_size, rng);
        let fc2 = Dense::new(config.head_size, 1, rng);

        Self {
            config,
            params: Parameters { layers, fc1, fc2 },
        }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn parameters(&self) -> &Parameters {
        &self.params
    }

    pub fn parameters_mut(&mut self) -> &mut Parameters {
        &mut self.params
    }

    /// Inference over `[batch, seq, features]`; dropout is disabled.
    pub fn predict(&self, inputs: &Array3<f32>) -> Array1<f32> {
        self.forward(inputs, None).output
    }

    /// Inference on a single `[seq, features]` window.
    pub fn predict_window(&self, window: &Array2<f32>) -> f32 {
        let batch = window.clone().insert_axis(Axis(0));
        self.predict(&batch)[0]
    }

    /// Mean squared error on `(inputs, targets)` and its gradient with
    /// respect to every parameter. Dropout is active when `rng` is given.
    pub fn loss_and_gradients(
        &self,
        inputs: &Array3<f32>,
        targets: &Array1<f32>,
        rng: Option<&mut dyn RngCore>,
    ) -> (f32, Parameters) {
        let cache = self.forward(inputs, rng);
        let n = targets.len().max(1) as f32;

        let diff = &cache.output - targets;
        let loss = diff.mapv(|d| d * d).sum() / n;

        let mut grads = self.params.zeros_like();

        // head
        let d_output = (diff * (2.0 / n)).insert_axis(Axis(1));
        grads.fc2.weight = cache.head_hidden.t().dot(&d_output);
        grads.fc2.bias = d_output.sum_axis(Axis(0));

        let mut d_head = d_output.dot(&self.params.fc2.weight.t());
        if let Some(mask) = &cache.head_mask {
            d_head *= mask;
        }
        let d_pre = d_head * &cache.pre_activation.mapv(|v| if v > 0.0 { 1.0 } else { 0.0 });
        grads.fc1.weight = cache.last_hidden.t().dot(&d_pre);
        grads.fc1.bias = d_pre.sum_axis(Axis(0));
        let d_last_hidden = d_pre.dot(&self.params.fc1.weight.t());

        // only the final timestep of the top layer feeds the head
        let steps = inputs.shape()[1];
        let batch = inputs.shape()[0];
        let mut d_seq: Vec<Array2<f32>> = (0..steps)
            .map(|_| Array2::zeros((batch, self.config.hidden_size)))
            .collect();
        if let Some(last) = d_seq.last_mut() {
            *last = d_last_hidden;
        }

        for (idx, layer) in self.params.layers.iter().enumerate().rev() {
            let mut d_inputs = layer.backward_sequence(&cache.layer_caches[idx], &d_seq, &mut grads.layers[idx]);
            if let Some(masks) = &cache.input_masks[idx] {
                for (d_input, mask) in d_inputs.iter_mut().zip(masks) {
                    *d_input *= mask;
                }
            }
            d_seq = d_inputs;
        }

        (loss, grads)
    }

    fn forward(&self, inputs: &Array3<f32>, mut rng: Option<&mut dyn RngCore>) -> ForwardCache {
        let (batch, steps, _) = inputs.dim();
        let dropout = self.config.dropout;

        let mut sequence: Vec<Array2<f32>> = (0..steps)
            .map(|t| inputs.slice(s![.., t, ..]).to_owned())
            .collect();

        let mut layer_caches = Vec::with_capacity(self.params.layers.len());
        let mut input_masks = Vec::with_capacity(self.params.layers.len());

        for (idx, layer) in self.params.layers.iter().enumerate() {
            let masks = match rng.as_deref_mut() {
                Some(r) if idx > 0 && dropout > 0.0 => {
                    let masks: Vec<Array2<f32>> = sequence
                        .iter()
                        .map(|x| dropout_mask(x.dim(), dropout, r))
                        .collect();
                    for (x, mask) in sequence.iter_mut().zip(&masks) {
                        *x *= mask;
                    }
                    Some(masks)
                }
                _ => None,
            };

            let (outputs, caches) = layer.forward_sequence(&sequence);
            layer_caches.push(caches);
            input_masks.push(masks);
            sequence = outputs;
        }

        let last_hidden = sequence
            .pop()
            .unwrap_or_else(|| Array2::zeros((batch, self.config.hidden_size)));

        let pre_activation = self.params.fc1.forward(&last_hidden);
        let mut head_hidden = pre_activation.mapv(|v| v.max(0.0));
        let head_mask = match rng.as_deref_mut() {
            Some(r) if dropout > 0.0 => {
                let mask = dropout_mask(head_hidden.dim(), dropout, r);
                head_hidden *= &mask;
                Some(mask)
            }
            _ => None,
        };

        let output = self.params.fc2.forward(&head_hidden).column(0).to_owned();

        ForwardCache {
            layer_caches,
            input_masks,
            last_hidden,
            pre_activation,
            head_mask,
            head_hidden,
            output,
        }
    }
}

/// Inverted dropout: kept units are scaled by `1 / (1 - p)`.
fn dropout_mask(dim: (usize, usize), p: f32, rng: &mut dyn RngCore) -> Array2<f32> {
    let keep = 1.0 - p;
    let scale = 1.0 / keep;
    Array2::from_shape_fn(dim, |_| if rng.gen::<f32>() < keep { scale } else { 0.0 })
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// Derivative of the sigmoid expressed through its output.
fn sigmoid_derivative(y: f32) -> f32 {
    y * (1.0 - y)
}

/// Derivative of tanh expressed through its output.
fn tanh_derivative(y: f32) -> f32 {
    1.0 - y * y
}
