use burn::{
    module::Module,
    nn::{Dropout, DropoutConfig, Embedding},
    tensor::{backend::Backend, Int, Tensor},
};

use crate::{
    models::embedding::EmbeddingTable,
    pipelines::sentiment::{InferenceHead, Mode, ModelConfig, Network, Weights},
};

use super::{Layer, LayerConfig};

/// Densely connected QRNN: every layer reads the embeddings concatenated with the outputs of all
/// earlier layers, and the last layer's output is the hidden state
#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    /// Frozen embedding lookup
    pub embedding: Embedding<B>,

    /// QRNN layers of growing input width
    pub layers: Vec<Layer<B>>,

    /// Dropout on each layer's output while training
    pub dropout: Dropout,

    /// Pooling and classification head
    pub head: InferenceHead<B>,
}

impl<B: Backend> Network<B> for Model<B> {
    fn init(config: &ModelConfig, embeddings: &EmbeddingTable<B>, device: &B::Device) -> Self {
        let layers = (0..config.num_layers)
            .map(|i| {
                let d_input = embeddings.embedding_dim() + i * config.hidden_size;

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
        let mut features = self.embedding.forward(tokens);
        let mut output = features.clone();

        for (i, layer) in self.layers.iter().enumerate() {
            output = mode.dropout(&self.dropout, layer.forward(features.clone(), mode));

            if i + 1 < self.layers.len() {
                features = Tensor::cat(vec![features, output.clone()], 2);
            }
        }

        output
    }

    /// All layer weights, then all layer biases
    fn weights(&self) -> Option<Weights<B>> {
        let (weights, biases): (Vec<_>, Vec<_>) =
            self.layers.iter().map(|layer| layer.weights()).unzip();

        Some(weights.into_iter().chain(biases.into_iter().flatten()).collect())
    }

    fn head(&self) -> &InferenceHead<B> {
        &self.head
    }
}
