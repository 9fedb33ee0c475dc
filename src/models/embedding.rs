//! Pre-trained embedding tables and the frozen lookup layer built from them

use std::path::Path;

use burn::{
    module::{Module, Param},
    nn::{Embedding, EmbeddingConfig, EmbeddingRecord},
    tensor::{backend::Backend, Data, Int, Shape, Tensor},
};
use candle_core::{safetensors, DType, Device};

use crate::utils::files::read_file;

/// The tensor name looked up in safetensors files by default
pub static DEFAULT_TENSOR_NAME: &str = "embeddings";

/// Embedding Error
#[derive(thiserror::Error, Debug)]
pub enum EmbeddingError {
    /// The file could not be read
    #[error("unable to read embeddings: {0}")]
    Io(#[from] std::io::Error),

    /// The safetensors file could not be decoded
    #[error("unable to decode safetensors embeddings: {0}")]
    Safetensors(#[from] candle_core::Error),

    /// The named tensor is missing from the safetensors file
    #[error("no tensor named {0} in the embeddings file")]
    MissingTensor(String),

    /// A row could not be parsed as floats
    #[error("invalid value on embeddings line {line}: {value}")]
    InvalidValue {
        /// 1-based line number
        line: usize,
        /// The offending token
        value: String,
    },

    /// Rows have different widths
    #[error("embeddings line {line} has {actual} values, expected {expected}")]
    Ragged {
        /// 1-based line number
        line: usize,
        /// Width of the first row
        expected: usize,
        /// Width of this row
        actual: usize,
    },

    /// The file holds no vectors
    #[error("the embeddings file is empty")]
    Empty,
}

/// A [vocab_size, embedding_dim] table of pre-trained vectors. Cloning is cheap and shares the
/// underlying storage, so one table can back every model built against it.
#[derive(Clone, Debug)]
pub struct EmbeddingTable<B: Backend> {
    weights: Tensor<B, 2>,
}

impl<B: Backend> EmbeddingTable<B> {
    /// Wrap an existing tensor
    pub fn new(weights: Tensor<B, 2>) -> Self {
        Self { weights }
    }

    /// A zero table, used as a placeholder when the weights come from a saved record
    pub fn zeros(vocab_size: usize, embedding_dim: usize, device: &B::Device) -> Self {
        Self::new(Tensor::zeros([vocab_size, embedding_dim], device))
    }

    /// Build a table from row-major values
    pub fn from_rows(
        values: Vec<f32>,
        vocab_size: usize,
        embedding_dim: usize,
        device: &B::Device,
    ) -> Self {
        let data = Data::new(values, Shape::new([vocab_size, embedding_dim]));

        Self::new(Tensor::from_data(data.convert::<B::FloatElem>(), device))
    }

    /// Load a table from a safetensors file
    pub fn from_safetensors(
        path: impl AsRef<Path>,
        tensor_name: &str,
        device: &B::Device,
    ) -> Result<Self, EmbeddingError> {
        let tensors = safetensors::load(path, &Device::Cpu)?;

        let tensor = tensors
            .get(tensor_name)
            .ok_or_else(|| EmbeddingError::MissingTensor(tensor_name.to_string()))?;

        let (vocab_size, embedding_dim) = tensor.dims2()?;
        let values = tensor.to_dtype(DType::F32)?.flatten_all()?.to_vec1::<f32>()?;

        Ok(Self::from_rows(values, vocab_size, embedding_dim, device))
    }

    /// Load a table from a text file holding one whitespace-separated vector per line. The line
    /// index is the token id.
    pub async fn from_text(path: &str, device: &B::Device) -> Result<Self, EmbeddingError> {
        let lines = read_file(path).await?;

        let mut values = Vec::new();
        let mut embedding_dim = None;
        let mut vocab_size = 0;

        for (index, line) in lines.iter().enumerate() {
            if line.trim().is_empty() {
                continue;
            }

            let row = line
                .split_whitespace()
                .map(|value| {
                    value.parse::<f32>().map_err(|_| EmbeddingError::InvalidValue {
                        line: index + 1,
                        value: value.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;

            let expected = *embedding_dim.get_or_insert(row.len());
            if row.len() != expected {
                return Err(EmbeddingError::Ragged {
                    line: index + 1,
                    expected,
                    actual: row.len(),
                });
            }

            values.extend(row);
            vocab_size += 1;
        }

        let embedding_dim = embedding_dim.ok_or(EmbeddingError::Empty)?;

        Ok(Self::from_rows(values, vocab_size, embedding_dim, device))
    }

    /// Load from either a `.safetensors` file or a text file, based on the extension
    pub async fn load(path: &str, device: &B::Device) -> Result<Self, EmbeddingError> {
        if path.ends_with(".safetensors") {
            Self::from_safetensors(path, DEFAULT_TENSOR_NAME, device)
        } else {
            Self::from_text(path, device).await
        }
    }

    /// The [vocab_size, embedding_dim] shape of the table
    pub fn dims(&self) -> [usize; 2] {
        self.weights.dims()
    }

    /// The number of rows in the table
    pub fn vocab_size(&self) -> usize {
        self.dims()[0]
    }

    /// The width of each vector
    pub fn embedding_dim(&self) -> usize {
        self.dims()[1]
    }

    /// Look token ids up directly: [batch, seq] -> [batch, seq, embedding_dim]
    pub fn lookup(&self, ids: Tensor<B, 2, Int>) -> Tensor<B, 3> {
        let [batch_size, seq_len] = ids.dims();

        self.weights
            .clone()
            .select(0, ids.reshape([batch_size * seq_len]))
            .reshape([batch_size, seq_len, self.embedding_dim()])
    }

    /// Build an embedding layer holding this table's weights. The layer's parameters are frozen,
    /// so optimizers never move them.
    pub fn layer(&self, device: &B::Device) -> Embedding<B> {
        let [vocab_size, embedding_dim] = self.dims();

        EmbeddingConfig::new(vocab_size, embedding_dim)
            .init(device)
            .load_record(EmbeddingRecord {
                weight: Param::from_tensor(self.weights.clone().to_device(device)),
            })
            .no_grad()
    }
}
