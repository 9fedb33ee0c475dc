use burn::{
    module::Module,
    nn::{Dropout, DropoutConfig, Embedding, Linear, LinearConfig},
    tensor::{activation::sigmoid, backend::Backend, Int, Tensor},
};

use crate::pipelines::sentiment::{InferenceHead, Mode, ModelConfig, Network};

use super::embedding::EmbeddingTable;

/// Stacked dense layers applied independently at every timestep
#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    /// Frozen embedding lookup
    pub embedding: Embedding<B>,

    /// Dense layers, each followed by a sigmoid
    pub layers: Vec<Linear<B>>,

    /// Dropout between layers while training
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

                LinearConfig::new(d_input, config.hidden_size).init(device)
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
            x = sigmoid(layer.forward(x));
            x = mode.dropout(&self.dropout, x);
        }

        x
    }

    fn head(&self) -> &InferenceHead<B> {
        &self.head
    }
}
