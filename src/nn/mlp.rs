//! Multi-Layer Perceptron used as the actor and critic approximators
//!
//! The trainer treats both networks as black boxes (`state -> mean` and
//! `state -> value`); this is the default architecture.

use burn::{
    module::Module,
    nn::{Linear, LinearConfig},
    prelude::*,
    tensor::{activation::relu, backend::Backend},
};

/// Configuration for Multi-Layer Perceptron
#[derive(Config, Debug)]
pub struct MLPConfig {
    /// Input dimension
    pub input_dim: usize,
    /// Hidden layer dimensions (e.g., [256, 64] for two hidden layers)
    pub hidden_layers: Vec<usize>,
    /// Output dimension
    pub output_dim: usize,
    /// Squash the output layer with tanh (default: false)
    ///
    /// The actor uses this to keep its Gaussian mean in [-1, 1].
    #[config(default = "false")]
    pub use_tanh_output: bool,
}

/// Multi-Layer Perceptron
///
/// Hidden layers use ReLU, the output layer is linear unless `tanh_output` is set.
#[derive(Module, Debug)]
pub struct MLP<B: Backend> {
    layers: Vec<Linear<B>>,
    tanh_output: bool,
}

impl MLPConfig {
    /// Initialize the MLP with the given configuration
    pub fn init<B: Backend>(&self, device: &B::Device) -> MLP<B> {
        let mut dims = Vec::with_capacity(self.hidden_layers.len() + 2);
        dims.push(self.input_dim);
        dims.extend_from_slice(&self.hidden_layers);
        dims.push(self.output_dim);

        let layers = dims
            .windows(2)
            .map(|pair| LinearConfig::new(pair[0], pair[1]).init(device))
            .collect();

        MLP {
            layers,
            tanh_output: self.use_tanh_output,
        }
    }
}

impl<B: Backend> MLP<B> {
    /// Forward pass over any tensor rank; the last dimension holds the features
    pub fn forward<const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        let last = self.layers.len() - 1;
        let mut x = input;

        for (i, layer) in self.layers.iter().enumerate() {
            x = layer.forward(x);
            if i < last {
                x = relu(x);
            }
        }

        if self.tanh_output {
            x = x.tanh();
        }

        x
    }
}
