use burn::{
    module::Module,
    nn::Dropout,
    tensor::{backend::Backend, Int, Tensor},
};

use crate::models::embedding::EmbeddingTable;

use super::{batcher::Batch, head::Inference, InferenceHead, ModelConfig};

/// Flattened learnable tensors a network exposes for L2 regularization
pub type Weights<B> = Vec<Tensor<B, 1>>;

/// Whether a forward pass is part of a training step or an evaluation
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Mode {
    /// Dropout and zoneout are active
    Train,

    /// Every stochastic layer is the identity
    Eval,
}

impl Mode {
    /// True when stochastic regularization should fire
    pub fn is_train(&self) -> bool {
        matches!(self, Mode::Train)
    }

    /// Apply dropout in training mode only
    pub fn dropout<B: Backend, const D: usize>(
        &self,
        dropout: &Dropout,
        x: Tensor<B, D>,
    ) -> Tensor<B, D> {
        match self {
            Mode::Train => dropout.forward(x),
            Mode::Eval => x,
        }
    }
}

/// A trait for networks that can be used for sentiment classification. Implementors supply the
/// sequence encoder; pooling, loss and scoring are shared through the [`InferenceHead`].
pub trait Network<B: Backend>: Module<B> {
    /// Build the network against a shared embedding table
    fn init(config: &ModelConfig, embeddings: &EmbeddingTable<B>, device: &B::Device) -> Self;

    /// Encode token ids into per-timestep hidden states: [batch, seq] -> [batch, seq, hidden]
    fn forward(&self, tokens: Tensor<B, 2, Int>, mode: Mode) -> Tensor<B, 3>;

    /// The learnable tensors eligible for L2 regularization, if any
    fn weights(&self) -> Option<Weights<B>> {
        None
    }

    /// The pooling and classification head
    fn head(&self) -> &InferenceHead<B>;

    /// Run a batch through the encoder and the head
    fn inference(&self, batch: Batch<B>, mode: Mode) -> Inference<B> {
        let hidden = self.forward(batch.tokens, mode);

        self.head().forward(hidden, batch.mask, batch.labels)
    }
}
