use burn::{
    module::AutodiffModule,
    optim::{GradientsParams, Optimizer, RmsPropConfig},
    tensor::{
        backend::{AutodiffBackend, Backend},
        Tensor,
    },
    LearningRate,
};
use serde::{Deserialize, Serialize};

use super::{ModelConfig, Weights};

/// Persistent training progress. Never reset during a model's lifetime; the training driver
/// advances it and saves it next to the checkpoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingCounters {
    /// Number of completed epochs
    pub epoch: usize,

    /// Best accuracy seen on the dev split
    pub best_dev_acc: f32,
}

impl TrainingCounters {
    /// Mark an epoch as completed, returning the new epoch count
    pub fn advance_epoch(&mut self) -> usize {
        self.epoch += 1;
        self.epoch
    }

    /// Keep the dev accuracy if it beats the best so far, returning whether it did
    pub fn record_dev_accuracy(&mut self, accuracy: f32) -> bool {
        if accuracy > self.best_dev_acc {
            self.best_dev_acc = accuracy;
            true
        } else {
            false
        }
    }
}

/// The optimizer attached to a model's loss
pub struct Learning<O> {
    /// RMSProp, wrapped for the network's module type
    optim: O,

    /// Constant learning rate
    learning_rate: LearningRate,

    /// L2 coefficient, when regularization was requested
    l2_beta: Option<f64>,
}

/// Attach RMSProp to a network type
pub fn setup<B, M>(config: &ModelConfig) -> Learning<impl Optimizer<M, B>>
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let optim = RmsPropConfig::new()
        .with_alpha(config.rmsprop_alpha)
        .with_epsilon(config.rmsprop_epsilon)
        .with_momentum(0.0)
        .init::<B, M>();

    Learning {
        optim,
        learning_rate: config.learning_rate,
        l2_beta: config.l2_regularization.then_some(config.l2_beta),
    }
}

impl<O> Learning<O> {
    /// The learning rate used for every step
    pub fn learning_rate(&self) -> LearningRate {
        self.learning_rate
    }

    /// Add the L2 penalty to the loss when regularization is enabled and the network exposes
    /// weights
    pub fn regularize<B: Backend>(
        &self,
        loss: Tensor<B, 1>,
        weights: Option<Weights<B>>,
    ) -> Tensor<B, 1> {
        match (self.l2_beta, weights.and_then(l2_loss)) {
            (Some(beta), Some(penalty)) => loss + penalty.mul_scalar(beta),
            _ => loss,
        }
    }

    /// Take one gradient step minimizing the loss
    pub fn step<B, M>(&mut self, module: M, loss: Tensor<B, 1>) -> M
    where
        B: AutodiffBackend,
        M: AutodiffModule<B>,
        O: Optimizer<M, B>,
    {
        let grads = GradientsParams::from_grads(loss.backward(), &module);

        self.optim.step(self.learning_rate, module, grads)
    }
}

/// Half the summed squares of every weight, or `None` when there are no weights
pub fn l2_loss<B: Backend>(weights: Weights<B>) -> Option<Tensor<B, 1>> {
    weights
        .into_iter()
        .map(|w| w.clone().mul(w).sum())
        .reduce(|total, w| total + w)
        .map(|total| total.div_scalar(2.0))
}
