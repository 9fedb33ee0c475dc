use burn::LearningRate;

/// The model configuration shared by every sentiment network variant
#[derive(burn::config::Config, Debug)]
pub struct ModelConfig {
    /// The network variant name (e.g., "qrnn")
    pub variant: String,

    /// Size of the vocabulary, which must match the rows of the embedding table
    pub vocab_size: usize,

    /// The fixed number of items in every batch
    pub batch_size: usize,

    /// The fixed number of timesteps in every sequence
    pub seq_len: usize,

    /// Width of the embedding vectors
    #[config(default = 300)]
    pub embedding_dim: usize,

    /// Size of the hidden state produced by each variant
    #[config(default = 256)]
    pub hidden_size: usize,

    /// Number of stacked layers
    #[config(default = 4)]
    pub num_layers: usize,

    /// Dropout rate applied between layers while training
    #[config(default = 0.3)]
    pub dropout: f64,

    /// QRNN convolution window
    #[config(default = 2)]
    pub window_size: usize,

    /// QRNN zoneout probability
    #[config(default = 0.0)]
    pub zoneout: f64,

    /// Number of output classes
    #[config(default = 2)]
    pub num_classes: usize,

    /// RMSProp learning rate
    #[config(default = 1e-3)]
    pub learning_rate: LearningRate,

    /// RMSProp decay of the squared gradient average
    #[config(default = 0.9)]
    pub rmsprop_alpha: f32,

    /// RMSProp epsilon
    #[config(default = 1e-10)]
    pub rmsprop_epsilon: f32,

    /// L2 coefficient for the variant weights
    #[config(default = 4e-6)]
    pub l2_beta: f64,

    /// Whether the L2 penalty is added to the cost. Off unless explicitly requested.
    #[config(default = false)]
    pub l2_regularization: bool,
}

/// Define configuration struct for the experiment
#[derive(burn::config::Config, Debug)]
pub struct Training {
    /// Number of epochs
    #[config(default = 10)]
    pub num_epochs: usize,

    /// Seed for shuffling and dropout
    #[config(default = 42)]
    pub seed: u64,

    /// Number of data loader workers
    #[config(default = 4)]
    pub num_workers: usize,

    /// The location of the top-level data directory
    #[config(default = "\"data\".to_string()")]
    pub data_dir: String,

    /// Where the config, checkpoints and counters are written
    #[config(default = "\"artifacts\".to_string()")]
    pub artifact_dir: String,

    /// The model configuration
    pub model: ModelConfig,
}
