use std::marker::PhantomData;

use burn::{
    module::AutodiffModule,
    optim::Optimizer,
    tensor::{backend::AutodiffBackend, ElementConversion},
};

use crate::models::embedding::EmbeddingTable;

use super::{
    batcher::Batch,
    head::Metrics,
    learning::{self, Learning, TrainingCounters},
    Mode, ModelConfig, Network,
};

/// Model Error
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ModelError {
    /// The embedding table does not cover the declared vocabulary
    #[error("the embedding table has {actual} rows, expected a vocabulary of {expected}")]
    VocabularyMismatch {
        /// The declared vocabulary size
        expected: usize,
        /// Rows in the embedding table
        actual: usize,
    },

    /// The embedding table width differs from the configured embedding size
    #[error("the embedding table has {actual} columns, expected {expected}")]
    EmbeddingDimMismatch {
        /// The configured embedding size
        expected: usize,
        /// Columns in the embedding table
        actual: usize,
    },

    /// A batch does not have the declared [batch_size, seq_len] shape
    #[error("expected a batch of shape {expected:?}, got {actual:?}")]
    BatchShape {
        /// The declared shape
        expected: [usize; 2],
        /// The shape of the batch
        actual: [usize; 2],
    },

    /// A token id has no row in the embedding table
    #[error("token id {token} is outside a vocabulary of {vocab_size}")]
    TokenOutOfRange {
        /// The largest token id in the batch
        token: usize,
        /// The declared vocabulary size
        vocab_size: usize,
    },

    /// A label is not one of the model's classes
    #[error("label {label} is outside the {num_classes} classes")]
    LabelOutOfRange {
        /// The largest label in the batch
        label: usize,
        /// The number of classes
        num_classes: usize,
    },
}

/// A sentiment classifier: a network variant, its optimizer and the persistent training
/// counters. The training driver feeds it batches and reads back the latest metrics.
pub struct SentimentModel<B, N, O = ()> {
    /// The network, including its embedding lookup and head
    network: N,

    /// Optimizer setup
    learning: Learning<O>,

    /// Epoch and best dev accuracy
    counters: TrainingCounters,

    /// The configuration the model was built from
    config: ModelConfig,

    /// Metrics of the most recent batch
    metrics: Metrics,

    backend: PhantomData<B>,
}

impl<B, N> SentimentModel<B, N>
where
    B: AutodiffBackend,
    N: Network<B> + AutodiffModule<B>,
{
    /// Build a model: validate the embedding table, initialize the network (forward layers and
    /// head), then attach the optimizer and fresh counters
    pub fn new(
        config: &ModelConfig,
        embeddings: &EmbeddingTable<B>,
        device: &B::Device,
    ) -> Result<SentimentModel<B, N, impl Optimizer<N, B>>, ModelError> {
        let [vocab_size, embedding_dim] = embeddings.dims();

        if vocab_size != config.vocab_size {
            return Err(ModelError::VocabularyMismatch {
                expected: config.vocab_size,
                actual: vocab_size,
            });
        }

        if embedding_dim != config.embedding_dim {
            return Err(ModelError::EmbeddingDimMismatch {
                expected: config.embedding_dim,
                actual: embedding_dim,
            });
        }

        let network = N::init(config, embeddings, device);

        Ok(SentimentModel {
            network,
            learning: learning::setup::<B, N>(config),
            counters: TrainingCounters::default(),
            config: config.clone(),
            metrics: Metrics::default(),
            backend: PhantomData,
        })
    }
}

impl<B, N, O> SentimentModel<B, N, O>
where
    B: AutodiffBackend,
    N: Network<B> + AutodiffModule<B>,
    O: Optimizer<N, B>,
{
    /// Run a training step: forward in train mode, then one optimizer update minimizing the summed
    /// cross-entropy
    pub fn optimize(&mut self, batch: Batch<B>) -> Result<Metrics, ModelError> {
        self.check(&batch)?;

        let inference = self.network.inference(batch, Mode::Train);
        self.metrics = inference.metrics();

        let loss = self
            .learning
            .regularize(inference.loss, self.network.weights());

        self.network = self.learning.step(self.network.clone(), loss);

        Ok(self.metrics)
    }

    /// Score a batch in evaluation mode without updating anything but the latest metrics
    pub fn evaluate(&mut self, batch: Batch<B>) -> Result<Metrics, ModelError> {
        self.check(&batch)?;

        self.metrics = self.network.inference(batch, Mode::Eval).metrics();

        Ok(self.metrics)
    }

    fn check(&self, batch: &Batch<B>) -> Result<(), ModelError> {
        let expected = [self.config.batch_size, self.config.seq_len];
        let actual = batch.dims();

        if actual != expected || batch.labels.dims() != [expected[0]] {
            return Err(ModelError::BatchShape { expected, actual });
        }

        // Ids come from usize values, so only the upper bound can be violated
        let token = batch.tokens.clone().max().into_scalar().elem::<i64>() as usize;
        if token >= self.config.vocab_size {
            return Err(ModelError::TokenOutOfRange {
                token,
                vocab_size: self.config.vocab_size,
            });
        }

        let label = batch.labels.clone().max().into_scalar().elem::<i64>() as usize;
        if label >= self.config.num_classes {
            return Err(ModelError::LabelOutOfRange {
                label,
                num_classes: self.config.num_classes,
            });
        }

        Ok(())
    }

    /// Metrics of the most recent batch
    pub fn metrics(&self) -> Metrics {
        self.metrics
    }

    /// Cost of the most recent batch
    pub fn cost(&self) -> f32 {
        self.metrics.cost
    }

    /// Accuracy of the most recent batch
    pub fn accuracy(&self) -> f32 {
        self.metrics.accuracy
    }

    /// Sum of predicted classes for the most recent batch
    pub fn average_guess(&self) -> i64 {
        self.metrics.average_guess
    }

    /// Number of completed epochs
    pub fn epoch(&self) -> usize {
        self.counters.epoch
    }

    /// Best dev accuracy seen so far
    pub fn best_dev_acc(&self) -> f32 {
        self.counters.best_dev_acc
    }

    /// The training counters
    pub fn counters(&self) -> TrainingCounters {
        self.counters
    }

    /// Restore counters, e.g. from a checkpoint
    pub fn set_counters(&mut self, counters: TrainingCounters) {
        self.counters = counters;
    }

    /// Mark an epoch as completed, returning the new epoch count
    pub fn advance_epoch(&mut self) -> usize {
        self.counters.advance_epoch()
    }

    /// Record a dev accuracy, returning whether it is a new best
    pub fn record_dev_accuracy(&mut self, accuracy: f32) -> bool {
        self.counters.record_dev_accuracy(accuracy)
    }

    /// The configuration the model was built from
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// The underlying network
    pub fn network(&self) -> &N {
        &self.network
    }

    /// Replace the network parameters with a saved record
    pub fn load_record(&mut self, record: N::Record) {
        self.network = self.network.clone().load_record(record);
    }
}
