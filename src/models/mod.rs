/// Shared pre-trained embedding tables
pub mod embedding;

/// Feed-forward baseline
pub mod vanilla;

/// Quasi-recurrent networks, simple and densely connected
pub mod qrnn;

/// Stacked LSTM
pub mod lstm;

pub use embedding::{EmbeddingError, EmbeddingTable};

#[cfg(test)]
mod tests {
    use burn::{
        backend::NdArray,
        tensor::{Data, Distribution, Int, Shape, Tensor},
    };
    use pretty_assertions::assert_eq;

    use crate::pipelines::sentiment::{Mode, ModelConfig, Network};

    use super::*;

    type TestBackend = NdArray;

    const BATCH_SIZE: usize = 4;
    const SEQ_LEN: usize = 20;
    const VOCAB_SIZE: usize = 1000;

    fn hidden_dims<N: Network<TestBackend>>() -> [usize; 3] {
        let device = Default::default();
        let config = ModelConfig::new("test".to_string(), VOCAB_SIZE, BATCH_SIZE, SEQ_LEN);
        let table = EmbeddingTable::new(Tensor::random(
            [VOCAB_SIZE, config.embedding_dim],
            Distribution::Default,
            &device,
        ));

        let network = N::init(&config, &table, &device);
        let ids: Vec<i32> = (0..(BATCH_SIZE * SEQ_LEN) as i32)
            .map(|i| i * 7 % VOCAB_SIZE as i32)
            .collect();
        let tokens = Tensor::<TestBackend, 2, Int>::from_ints(
            Data::new(ids, Shape::new([BATCH_SIZE, SEQ_LEN])),
            &device,
        );

        network.forward(tokens, Mode::Eval).dims()
    }

    #[test]
    fn vanilla_yields_hidden_states() {
        assert_eq!(hidden_dims::<vanilla::Model<TestBackend>>(), [4, 20, 256]);
    }

    #[test]
    fn qrnn_yields_hidden_states() {
        assert_eq!(hidden_dims::<qrnn::Model<TestBackend>>(), [4, 20, 256]);
    }

    #[test]
    fn dense_qrnn_yields_hidden_states() {
        assert_eq!(hidden_dims::<qrnn::dense::Model<TestBackend>>(), [4, 20, 256]);
    }

    #[test]
    fn lstm_yields_hidden_states() {
        assert_eq!(hidden_dims::<lstm::Model<TestBackend>>(), [4, 20, 256]);
    }

    #[test]
    fn only_qrnn_variants_expose_weights() {
        let device = Default::default();
        let config = ModelConfig::new("test".to_string(), 10, 2, 3)
            .with_embedding_dim(4)
            .with_hidden_size(5);
        let table = EmbeddingTable::<TestBackend>::zeros(10, 4, &device);

        let vanilla = vanilla::Model::init(&config, &table, &device);
        let lstm = lstm::Model::init(&config, &table, &device);
        let qrnn = qrnn::Model::init(&config, &table, &device);
        let dense = qrnn::dense::Model::init(&config, &table, &device);

        assert!(vanilla.weights().is_none());
        assert!(lstm.weights().is_none());

        // Four layers, each with a weight and a bias
        assert_eq!(qrnn.weights().map(|w| w.len()), Some(8));

        // Dense layers are listed weights first: the first layer reads 4 features, the last
        // reads 4 + 3 * 5
        let dense_weights = dense.weights().unwrap();
        assert_eq!(dense_weights.len(), 8);
        assert_eq!(dense_weights[0].dims(), [3 * 5 * 4 * 2]);
        assert_eq!(dense_weights[3].dims(), [3 * 5 * 19 * 2]);
        assert_eq!(dense_weights[4].dims(), [3 * 5]);
    }
}
