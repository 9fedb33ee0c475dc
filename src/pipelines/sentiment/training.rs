use std::path::Path;

use burn::{
    config::Config as _,
    data::{dataloader::DataLoaderBuilder, dataset::Dataset},
    module::AutodiffModule,
    optim::Optimizer,
    record::{CompactRecorder, Recorder},
    tensor::backend::AutodiffBackend,
};

use crate::{models::embedding::EmbeddingTable, utils::files::write_file};

use super::{
    batcher::Batcher, head::Metrics, learning::TrainingCounters, model::SentimentModel, Item,
    Network, Training,
};

/// Train a network variant, checkpointing whenever dev accuracy improves. Training resumes from
/// the checkpoint and counters in the artifact directory when they exist.
pub async fn train<B, N, I, D>(
    device: B::Device,             // Device on which to perform computation
    embeddings: EmbeddingTable<B>, // Pre-trained embedding table
    dataset_train: D,              // Training dataset
    dataset_dev: D,                // Dev dataset used to pick checkpoints
    config: Training,              // Experiment configuration
) -> anyhow::Result<TrainingCounters>
where
    B: AutodiffBackend,
    N: Network<B> + AutodiffModule<B> + 'static,
    I: Item + 'static,
    D: Dataset<I> + 'static,
{
    let artifact_dir = config.artifact_dir.as_str();

    tokio::fs::create_dir_all(artifact_dir).await?;

    B::seed(config.seed);

    let mut model = SentimentModel::<B, N>::new(&config.model, &embeddings, &device)?;

    if Path::new(&counters_path(artifact_dir)).exists() {
        let counters = restore(&mut model, artifact_dir, &device).await?;

        log::info!(
            "Resuming after epoch {} with best dev accuracy {:.4}",
            counters.epoch,
            counters.best_dev_acc
        );
    } else {
        config
            .model
            .save(format!("{artifact_dir}/config.json"))
            .map_err(|e| anyhow!("Unable to save config file: {}", e))?;
    }

    // Initialize batchers for training and dev data
    let batcher_train = Batcher::<B>::new(&config.model, device.clone());
    let batcher_dev = Batcher::<B>::new(&config.model, device.clone());

    // Initialize data loaders for training and dev data
    let dataloader_train = DataLoaderBuilder::new(batcher_train)
        .batch_size(config.model.batch_size)
        .shuffle(config.seed)
        .num_workers(config.num_workers)
        .build(dataset_train);

    let dataloader_dev = DataLoaderBuilder::new(batcher_dev)
        .batch_size(config.model.batch_size)
        .num_workers(config.num_workers)
        .build(dataset_dev);

    while model.epoch() < config.num_epochs {
        let mut train_metrics = Vec::new();

        for batch in dataloader_train.iter() {
            // The last batch of an epoch can be short, and the head is built for a fixed size
            if batch.dims()[0] != config.model.batch_size {
                log::debug!("Skipping a short training batch of {}", batch.dims()[0]);
                continue;
            }

            train_metrics.push(model.optimize(batch)?);
        }

        let mut dev_metrics = Vec::new();

        for batch in dataloader_dev.iter() {
            if batch.dims()[0] != config.model.batch_size {
                log::debug!("Skipping a short dev batch of {}", batch.dims()[0]);
                continue;
            }

            dev_metrics.push(model.evaluate(batch)?);
        }

        let train = mean(&train_metrics);
        let dev = mean(&dev_metrics);
        let epoch = model.advance_epoch();

        log::info!(
            "Epoch {}: train cost {:.4}, train accuracy {:.4}, dev cost {:.4}, dev accuracy {:.4}",
            epoch,
            train.cost,
            train.accuracy,
            dev.cost,
            dev.accuracy
        );

        if model.record_dev_accuracy(dev.accuracy) {
            log::info!("New best dev accuracy {:.4}, saving checkpoint", dev.accuracy);

            CompactRecorder::new()
                .record(
                    model.network().clone().into_record(),
                    format!("{artifact_dir}/model").into(),
                )
                .map_err(|e| anyhow!("Unable to save model checkpoint: {}", e))?;
        }

        save_counters(artifact_dir, model.counters()).await?;
    }

    Ok(model.counters())
}

/// Average per-batch metrics. Accuracy and cost are means, the guess count is summed.
pub fn mean(metrics: &[Metrics]) -> Metrics {
    if metrics.is_empty() {
        return Metrics::default();
    }

    let n = metrics.len() as f32;

    Metrics {
        cost: metrics.iter().map(|m| m.cost).sum::<f32>() / n,
        accuracy: metrics.iter().map(|m| m.accuracy).sum::<f32>() / n,
        average_guess: metrics.iter().map(|m| m.average_guess).sum(),
    }
}

fn counters_path(artifact_dir: &str) -> String {
    format!("{artifact_dir}/counters.json")
}

/// Write the counters next to the checkpoint
pub async fn save_counters(artifact_dir: &str, counters: TrainingCounters) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(&counters)?;

    write_file(&counters_path(artifact_dir), &json).await?;

    Ok(())
}

/// Read counters saved by [`save_counters`]
pub async fn load_counters(artifact_dir: &str) -> anyhow::Result<TrainingCounters> {
    let json = tokio::fs::read_to_string(counters_path(artifact_dir))
        .await
        .map_err(|e| anyhow!("Unable to read counters file: {}", e))?;

    Ok(serde_json::from_str(&json)?)
}

async fn restore<B, N, O>(
    model: &mut SentimentModel<B, N, O>,
    artifact_dir: &str,
    device: &B::Device,
) -> anyhow::Result<TrainingCounters>
where
    B: AutodiffBackend,
    N: Network<B> + AutodiffModule<B>,
    O: Optimizer<N, B>,
{
    let counters = load_counters(artifact_dir).await?;

    // Counters can be saved before any epoch improved on the dev split
    if counters.best_dev_acc > 0.0 {
        let record = CompactRecorder::new()
            .load(format!("{artifact_dir}/model").into(), device)
            .map_err(|e| anyhow!("Unable to load model checkpoint: {}", e))?;

        model.load_record(record);
    }

    model.set_counters(counters);

    Ok(counters)
}
