use burn::{
    data::dataloader,
    tensor::{backend::Backend, Data, ElementConversion, Int, Shape, Tensor},
};
use derive_new::new;

use crate::utils::tensors::pad_to;

use super::{Item, ModelConfig};

/// The padding token id used when a sequence is shorter than the declared length
pub const PAD_TOKEN_ID: usize = 0;

/// A fixed-shape batch of tokenized sentences
#[derive(Clone, Debug, new)]
pub struct Batch<B: Backend> {
    /// Token ids as 2D tensor: [batch_size, seq_len]
    pub tokens: Tensor<B, 2, Int>,

    /// Validity mask: [batch_size, seq_len], 1.0 for real tokens and 0.0 for padding
    pub mask: Tensor<B, 2>,

    /// Class ids for the batch: [batch_size]
    pub labels: Tensor<B, 1, Int>,
}

impl<B: Backend> Batch<B> {
    /// The [batch_size, seq_len] shape of the batch
    pub fn dims(&self) -> [usize; 2] {
        self.tokens.dims()
    }
}

/// Struct for batching sentiment classification items
#[derive(Clone)]
pub struct Batcher<B: Backend> {
    /// The declared sequence length
    seq_len: usize,

    /// Device on which to perform computation (e.g., CPU or CUDA device)
    device: B::Device,
}

impl<B: Backend> Batcher<B> {
    /// Creates a new batcher
    pub fn new(config: &ModelConfig, device: B::Device) -> Self {
        Self {
            seq_len: config.seq_len,
            device,
        }
    }
}

/// Implement Batcher trait for Batcher struct for training and evaluation
impl<B: Backend, I: Item> dataloader::batcher::Batcher<I, Batch<B>> for Batcher<B> {
    /// Collects a vector of sentiment items into a batch
    fn batch(&self, items: Vec<I>) -> Batch<B> {
        let batch_size = items.len();

        let tokens_list = items.iter().map(|item| item.tokens().to_vec()).collect();
        let (tokens, mask) = pad_to(PAD_TOKEN_ID, tokens_list, self.seq_len, &self.device);

        let labels: Vec<B::IntElem> = items
            .iter()
            .map(|item| (item.label() as i64).elem::<B::IntElem>())
            .collect();

        let labels = Tensor::from_data(Data::new(labels, Shape::new([batch_size])), &self.device);

        Batch {
            tokens,
            mask,
            labels,
        }
    }
}

#[cfg(test)]
mod tests {
    use burn::{backend::NdArray, data::dataloader::batcher::Batcher as _};
    use pretty_assertions::assert_eq;

    use crate::datasets::tokenized;

    use super::*;

    type TestBackend = NdArray;

    #[test]
    fn builds_fixed_shape_batches() {
        let config = ModelConfig::new("vanilla".to_string(), 100, 3, 5);
        let batcher = Batcher::<TestBackend>::new(&config, Default::default());

        let batch = batcher.batch(vec![
            tokenized::Item::new(vec![4, 8, 15], 1),
            tokenized::Item::new(vec![16, 23, 42, 4, 8, 15, 16], 0),
            tokenized::Item::new(vec![], 1),
        ]);

        assert_eq!(batch.dims(), [3, 5]);
        assert_eq!(
            batch.tokens.into_data().convert::<i64>().value,
            vec![4, 8, 15, 0, 0, 16, 23, 42, 4, 8, 0, 0, 0, 0, 0]
        );
        assert_eq!(
            batch.mask.sum().into_scalar().elem::<f32>(),
            8.0,
        );
        assert_eq!(batch.labels.into_data().convert::<i64>().value, vec![1, 0, 1]);
    }
}
