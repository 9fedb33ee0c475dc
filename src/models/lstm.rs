use burn::{
    module::Module,
    nn::{
        lstm::{Lstm, LstmConfig},
        Embedding,
    },
    tensor::{backend::Backend, Int, Tensor},
};

use crate::pipelines::sentiment::{InferenceHead, Mode, ModelConfig, Network};

use super::embedding::EmbeddingTable;

/// Stacked LSTM unrolled over the whole sequence from a zero initial state
#[derive(Module, Debug)]
pub struct Model<B: Backend> {
    /// Frozen embedding lookup
    pub embedding: Embedding<B>,

    /// LSTM layers, each feeding its hidden states to the next
    pub layers: Vec<Lstm<B>>,

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

                LstmConfig::new(d_input, config.hidden_size, true).init(device)
            })
            .collect();

        Self {
            embedding: embeddings.layer(device),
            layers,
            head: InferenceHead::new(
                config.hidden_size,
                config.num_classes,
                config.batch_size,
                device,
            ),
        }
    }

    fn forward(&self, tokens: Tensor<B, 2, Int>, _mode: Mode) -> Tensor<B, 3> {
        let mut x = self.embedding.forward(tokens);

        for layer in &self.layers {
            // No state is passed, so each layer starts from zeros
            let (_cell_states, hidden_states) = layer.forward(x, None);
            x = hidden_states;
        }

        x
    }

    fn head(&self) -> &InferenceHead<B> {
        &self.head
    }
}
