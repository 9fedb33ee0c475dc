use burn::{
    config::Config as _,
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    module::AutodiffModule,
    record::{CompactRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};

use crate::models::embedding::EmbeddingTable;

use super::{
    batcher::Batcher, head::Metrics, model::SentimentModel, training::mean, Item, ModelConfig,
    Network,
};

/// Score a dataset split with a trained artifact directory, returning metrics averaged over the
/// full batches of the split
pub fn evaluate<B, N, I, D>(
    device: B::Device,  // Device on which to perform computation
    artifact_dir: &str, // Directory containing the config and model files
    dataset: D,         // The split to score
    num_workers: usize, // Number of data loader workers
) -> anyhow::Result<Metrics>
where
    B: AutodiffBackend,
    N: Network<B> + AutodiffModule<B> + 'static,
    I: Item + 'static,
    D: Dataset<I> + 'static,
{
    // Load experiment configuration
    let config = ModelConfig::load(format!("{artifact_dir}/config.json").as_str())
        .map_err(|e| anyhow!("Unable to load config file: {}", e))?;

    log::info!("Loading {} weights from {}", config.variant, artifact_dir);

    let record = CompactRecorder::new()
        .load(format!("{artifact_dir}/model").into(), &device)
        .map_err(|e| anyhow!("Unable to load trained model weights: {}", e))?;

    // The embedding table is part of the saved record, so a blank table of the right shape is
    // enough to build the network
    let embeddings = EmbeddingTable::zeros(config.vocab_size, config.embedding_dim, &device);

    let mut model = SentimentModel::<B, N>::new(&config, &embeddings, &device)?;
    model.load_record(record);

    let dataloader = DataLoaderBuilder::new(Batcher::<B>::new(&config, device))
        .batch_size(config.batch_size)
        .num_workers(num_workers)
        .build(dataset);

    let mut metrics = Vec::new();

    for batch in dataloader.iter() {
        if batch.dims()[0] != config.batch_size {
            log::debug!("Skipping a short batch of {}", batch.dims()[0]);
            continue;
        }

        metrics.push(model.evaluate(batch)?);
    }

    log::info!("Scored {} batches", metrics.len());

    Ok(mean(&metrics))
}

#[cfg(test)]
mod tests {
    use burn::{
        backend::{Autodiff, NdArray},
        data::dataloader::batcher::Batcher as _,
        module::Module,
        tensor::{Distribution, Tensor},
    };

    use crate::{
        datasets::tokenized::{self, Item},
        models::qrnn,
    };

    use super::*;

    type TestBackend = Autodiff<NdArray>;

    #[test]
    fn reloads_a_saved_model() {
        let artifact_dir = std::env::temp_dir().join(format!(
            "burn-sentiment-evaluation-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&artifact_dir).unwrap();
        let artifact_dir = artifact_dir.to_string_lossy().to_string();

        let device = Default::default();
        let config = ModelConfig::new("qrnn".to_string(), 10, 2, 4)
            .with_embedding_dim(3)
            .with_hidden_size(5)
            .with_num_layers(2);
        let embeddings = EmbeddingTable::<TestBackend>::new(Tensor::random(
            [10, 3],
            Distribution::Default,
            &device,
        ));

        let mut model = SentimentModel::<TestBackend, qrnn::Model<TestBackend>>::new(
            &config,
            &embeddings,
            &device,
        )
        .unwrap();

        let items = vec![Item::new(vec![1, 2, 3], 1), Item::new(vec![4, 5], 0)];
        let batch = Batcher::<TestBackend>::new(&config, device).batch(items.clone());
        let expected = model.evaluate(batch).unwrap();

        config.save(format!("{artifact_dir}/config.json")).unwrap();
        CompactRecorder::new()
            .record(
                model.network().clone().into_record(),
                format!("{artifact_dir}/model").into(),
            )
            .unwrap();

        let metrics = evaluate::<TestBackend, qrnn::Model<TestBackend>, _, _>(
            device,
            &artifact_dir,
            tokenized::Dataset::from_items(items),
            1,
        )
        .unwrap();

        // Compact records store half precision floats
        assert!((metrics.cost - expected.cost).abs() < 1e-2);
        assert!((0.0..=1.0).contains(&metrics.accuracy));

        std::fs::remove_dir_all(&artifact_dir).unwrap();
    }
}
