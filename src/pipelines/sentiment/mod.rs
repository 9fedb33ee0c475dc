/// Model and training configuration
pub mod config;

/// Sentiment Items
pub mod item;

/// Batcher
pub mod batcher;

/// The forward contract shared by every network variant
pub mod network;

/// Pooling, loss and scoring
pub mod head;

/// Optimizer setup and training counters
pub mod learning;

/// The model orchestrator
pub mod model;

/// Training
pub mod training;

/// Evaluation
pub mod evaluation;

pub use batcher::{Batch, Batcher};
pub use config::{ModelConfig, Training};
pub use evaluation::evaluate;
pub use head::{Inference, InferenceHead, Metrics};
pub use item::Item;
pub use learning::TrainingCounters;
pub use model::{ModelError, SentimentModel};
pub use network::{Mode, Network, Weights};
pub use training::train;
