use burn::{
    module::Module,
    nn::{Linear, LinearConfig},
    tensor::{
        activation::{log_softmax, softmax},
        backend::Backend,
        ElementConversion, Int, Tensor,
    },
};
use serde::{Deserialize, Serialize};

use crate::utils::tensors::scalar;

/// Masked mean pooling followed by a linear projection to class logits
#[derive(Module, Debug)]
pub struct InferenceHead<B: Backend> {
    /// Linear layer projecting the pooled state to class logits
    pub output: Linear<B>,

    /// The declared batch size used to normalize the cost and accuracy
    pub batch_size: usize,
}

/// The tensors produced for a single batch
#[derive(Debug, Clone)]
pub struct Inference<B: Backend> {
    /// Class logits: [batch_size, num_classes]
    pub logits: Tensor<B, 2>,

    /// Predicted class ids: [batch_size]
    pub predictions: Tensor<B, 1, Int>,

    /// Cross-entropy summed over the batch, the quantity the optimizer minimizes
    pub loss: Tensor<B, 1>,

    /// Summed cross-entropy divided by the declared batch size
    pub cost: Tensor<B, 1>,

    /// Correct predictions divided by the declared batch size
    pub accuracy: Tensor<B, 1>,

    /// Sum of predicted class ids, useful to spot a model collapsing onto one class
    pub average_guess: Tensor<B, 1, Int>,
}

/// Host-side values of an [`Inference`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// The cost
    pub cost: f32,

    /// The accuracy, in [0, 1]
    pub accuracy: f32,

    /// Sum of predicted class ids
    pub average_guess: i64,
}

impl<B: Backend> InferenceHead<B> {
    /// Create a head for the given hidden size
    pub fn new(
        hidden_size: usize,
        num_classes: usize,
        batch_size: usize,
        device: &B::Device,
    ) -> Self {
        Self {
            output: LinearConfig::new(hidden_size, num_classes).init(device),
            batch_size,
        }
    }

    /// Pool, project and score: hidden [batch, seq, hidden], mask [batch, seq], labels [batch]
    pub fn forward(
        &self,
        hidden: Tensor<B, 3>,
        mask: Tensor<B, 2>,
        labels: Tensor<B, 1, Int>,
    ) -> Inference<B> {
        let logits = self.output.forward(pool(hidden, mask));

        score(logits, labels, self.batch_size)
    }
}

impl<B: Backend> Inference<B> {
    /// Read the scalars back to the host
    pub fn metrics(&self) -> Metrics {
        Metrics {
            cost: scalar(self.cost.clone()),
            accuracy: scalar(self.accuracy.clone()),
            average_guess: self.average_guess.clone().into_scalar().elem::<i64>(),
        }
    }
}

/// Average hidden states over the valid timesteps: [batch, seq, hidden] -> [batch, hidden].
/// Rows without any valid timestep pool to zeros.
pub fn pool<B: Backend>(hidden: Tensor<B, 3>, mask: Tensor<B, 2>) -> Tensor<B, 2> {
    let mask = mask.unsqueeze_dim::<3>(2);

    let total = hidden.mul(mask.clone()).sum_dim(1);
    let count = mask.sum_dim(1).clamp_min(1.0);

    total.div(count).squeeze(1)
}

/// Compute predictions, cost, accuracy and average guess from logits. Cost and accuracy are
/// normalized by the declared batch size rather than the number of rows.
pub fn score<B: Backend>(
    logits: Tensor<B, 2>,
    labels: Tensor<B, 1, Int>,
    batch_size: usize,
) -> Inference<B> {
    let predictions: Tensor<B, 1, Int> = softmax(logits.clone(), 1).argmax(1).squeeze(1);

    let loss = log_softmax(logits.clone(), 1)
        .gather(1, labels.clone().unsqueeze_dim(1))
        .sum()
        .neg();

    let cost = loss.clone().div_scalar(batch_size as f32);

    let accuracy = predictions
        .clone()
        .equal(labels)
        .int()
        .sum()
        .float()
        .div_scalar(batch_size as f32);

    let average_guess = predictions.clone().sum();

    Inference {
        logits,
        predictions,
        loss,
        cost,
        accuracy,
        average_guess,
    }
}

#[cfg(test)]
mod tests {
    use burn::backend::NdArray;
    use pretty_assertions::assert_eq;

    use super::*;

    type TestBackend = NdArray;

    fn assert_close(actual: Vec<f32>, expected: Vec<f32>) {
        assert_eq!(actual.len(), expected.len());

        for (a, e) in actual.iter().zip(expected.iter()) {
            assert!((a - e).abs() < 1e-5, "{actual:?} != {expected:?}");
        }
    }

    fn hidden() -> Tensor<TestBackend, 3> {
        Tensor::from_floats(
            [
                [[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]],
                [[-1.0, 0.0], [0.5, 0.5], [2.0, -4.0]],
            ],
            &Default::default(),
        )
    }

    #[test]
    fn full_mask_pools_to_the_mean() {
        let mask = Tensor::ones([2, 3], &Default::default());

        let pooled = pool(hidden(), mask);

        assert_eq!(pooled.dims(), [2, 2]);
        assert_close(
            pooled.into_data().convert::<f32>().value,
            hidden().mean_dim(1).into_data().convert::<f32>().value,
        );
    }

    #[test]
    fn single_valid_timestep_pools_to_that_timestep() {
        let mask = Tensor::from_floats([[0.0, 1.0, 0.0], [0.0, 0.0, 1.0]], &Default::default());

        let pooled = pool(hidden(), mask);

        assert_close(
            pooled.into_data().convert::<f32>().value,
            vec![3.0, 4.0, 2.0, -4.0],
        );
    }

    #[test]
    fn empty_mask_pools_to_zeros() {
        let mask = Tensor::zeros([2, 3], &Default::default());

        let pooled = pool(hidden(), mask);

        assert_close(pooled.into_data().convert::<f32>().value, vec![0.0; 4]);
    }

    #[test]
    fn scores_half_correct_batch() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_floats(
            [[2.0, 0.0], [0.0, 2.0], [2.0, 0.0], [0.0, 2.0]],
            &device,
        );
        let labels = Tensor::<TestBackend, 1, Int>::from_ints([0, 0, 1, 1], &device);

        let metrics = score(logits, labels, 4).metrics();

        let right = (1.0f32 + (-2.0f32).exp()).ln();
        let wrong = (1.0f32 + 2.0f32.exp()).ln();

        assert_eq!(metrics.accuracy, 0.5);
        assert_eq!(metrics.average_guess, 2);
        assert!((metrics.cost - (2.0 * right + 2.0 * wrong) / 4.0).abs() < 1e-5);
    }

    #[test]
    fn normalizes_by_the_declared_batch_size() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_floats([[0.0, 3.0], [0.0, 3.0]], &device);
        let labels = Tensor::<TestBackend, 1, Int>::from_ints([1, 0], &device);

        let half = score(logits.clone(), labels.clone(), 2).metrics();
        let quarter = score(logits, labels, 4).metrics();

        assert_eq!(half.accuracy, 0.5);
        assert_eq!(quarter.accuracy, 0.25);
        assert!((half.cost - 2.0 * quarter.cost).abs() < 1e-5);
    }

    #[test]
    fn loss_is_the_unnormalized_sum() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0], [0.0, 3.0]], &device);
        let labels = Tensor::<TestBackend, 1, Int>::from_ints([1, 1], &device);

        let inference = score(logits, labels, 4);
        let loss = scalar(inference.loss.clone());

        let expected = (1.0f32 + 1.0f32.exp()).ln() + (1.0f32 + (-3.0f32).exp()).ln();

        assert!((loss - expected).abs() < 1e-5, "{loss} != {expected}");
        assert!((inference.metrics().cost - loss / 4.0).abs() < 1e-5);
    }

    #[test]
    fn head_outputs_stay_in_range() {
        let device = Default::default();
        let head = InferenceHead::<TestBackend>::new(2, 2, 2, &device);
        let mask = Tensor::from_floats([[1.0, 1.0, 0.0], [1.0, 0.0, 0.0]], &device);
        let labels = Tensor::from_ints([1, 0], &device);

        let inference = head.forward(hidden(), mask, labels);
        let metrics = inference.metrics();

        assert_eq!(inference.logits.dims(), [2, 2]);
        assert!((0.0..=1.0).contains(&metrics.accuracy));
        assert!(metrics.cost >= 0.0);
        assert!((0..=2).contains(&metrics.average_guess));
    }
}
