use burn::{
    module::Module,
    nn::{Dropout, DropoutConfig, Embedding},
    tensor::{backend::Backend, Int, Tensor},
};

use crate::pipelines::sentiment::{InferenceHead, Mode, ModelConfig, Network, Weights};

use super::embedding::EmbeddingTable;

/// The quasi-recurrent layer
pub mod layer;

/// Densely connected QRNN
pub mod dense;

pub use layer::{Layer, LayerConfig};

/// Stacked QRNN layers with dropout between them
#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    /// Frozen embedding lookup
    pub embedding: Embedding<B>,

    /// QRNN layers
    pub layers: Vec<Layer<B>>,

    /// Dropout after each layer while training
    pub dropout: Dropout,

    /// Pooling and classification head
    pub head: InferenceHead<B>,
}

impl<B: Backend> Network<B> for Model<B> {
    fn init(config: &ModelConfig, embeddings: &EmbeddingTable<B>, device: &B::Device) -> Self {
        let layers = (0..config.num_layers)
            .map(|i| {
                let d_input = if i == 0 {
                    embeddings.embedding_dim()
                } else {
                    config.hidden_size
                };

                log::debug!("Initializing QRNN layer {}", i);

                LayerConfig::new(d_input, config.hidden_size)
                    .with_window_size(config.window_size)
                    .with_zoneout(config.zoneout)
                    .init(device)
            })
            .collect();

        Self {
            embedding: embeddings.layer(device),
            layers,
            dropout: DropoutConfig::new(config.dropout).init(),
            head: InferenceHead::new(
                config.hidden_size,
                config.num_classes,
                config.batch_size,
                device,
            ),
        }
    }

    fn forward(&self, tokens: Tensor<B, 2, Int>, mode: Mode) -> Tensor<B, 3> {
        let mut x = self.embedding.forward(tokens);

        for layer in &self.layers {
            x = layer.forward(x, mode);
            x = mode.dropout(&self.dropout, x);
        }

        x
    }

    /// Each layer's weight followed by its bias
    fn weights(&self) -> Option<Weights<B>> {
        let weights = self
            .layers
            .iter()
            .flat_map(|layer| {
                let (weight, bias) = layer.weights();

                std::iter::once(weight).chain(bias)
            })
            .collect();

        Some(weights)
    }

    fn head(&self) -> &InferenceHead<B> {
        &self.head
    }
}
