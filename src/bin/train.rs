//! Command line tool to train a sentiment classifier

use anyhow::anyhow;
use burn::backend::{libtorch::LibTorchDevice, Autodiff, LibTorch};
use burn_sentiment::{
    cli::Variant,
    datasets::{tokenized, LoadableDataset},
    models::{lstm, qrnn, vanilla, EmbeddingTable},
    pipelines::sentiment::{self, ModelConfig, Network, Training},
};
use pico_args::Arguments;

type Backend = Autodiff<LibTorch>;

const HELP: &str = "\
Usage: train VARIANT [OPTIONS]

Arguments:
  VARIANT              The network to train ('vanilla', 'qrnn', 'dense-qrnn' or 'lstm')

Options:
  -h, --help           Print help
  -d, --data-dir       The path to the top-level data directory (defaults to 'data')
  -e, --embeddings     The embedding table (defaults to '<data-dir>/embeddings.safetensors')
  -a, --artifact-dir   Output directory for config, checkpoints and counters (defaults to 'artifacts')
  -n, --num-epochs     Number of epochs to train for
  -b, --batch-size     Batch size (defaults to 32)
  -s, --seq-len        Sequence length (defaults to 50)
  --l2                 Add the L2 penalty to the cost of QRNN variants
  --cpu                Train on the CPU instead of the first CUDA device
";

#[derive(Debug)]
struct Args {
    variant: String,
    data_dir: Option<String>,
    embeddings: Option<String>,
    artifact_dir: Option<String>,
    num_epochs: Option<usize>,
    batch_size: usize,
    seq_len: usize,
    l2: bool,
    cpu: bool,
}

impl Args {
    fn parse() -> anyhow::Result<Option<Self>> {
        let mut pargs = Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            return Ok(None);
        }

        let args = Args {
            data_dir: pargs.opt_value_from_str(["-d", "--data-dir"])?,
            embeddings: pargs.opt_value_from_str(["-e", "--embeddings"])?,
            artifact_dir: pargs.opt_value_from_str(["-a", "--artifact-dir"])?,
            num_epochs: pargs.opt_value_from_str(["-n", "--num-epochs"])?,
            batch_size: pargs
                .opt_value_from_str(["-b", "--batch-size"])?
                .unwrap_or(32),
            seq_len: pargs.opt_value_from_str(["-s", "--seq-len"])?.unwrap_or(50),
            l2: pargs.contains("--l2"),
            cpu: pargs.contains("--cpu"),
            variant: pargs.free_from_str().map_err(|e| match e {
                pico_args::Error::MissingArgument => anyhow!("Missing required argument: VARIANT"),
                _ => anyhow!("{}", e),
            })?,
        };

        Ok(Some(args))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init();

    let Some(args) = Args::parse()? else {
        print!("{}", HELP);

        return Ok(());
    };

    let variant = Variant::try_from(args.variant.as_str())?;

    match variant {
        Variant::Vanilla => handle::<vanilla::Model<Backend>>(&variant, &args).await,
        Variant::Qrnn => handle::<qrnn::Model<Backend>>(&variant, &args).await,
        Variant::DenseQrnn => handle::<qrnn::dense::Model<Backend>>(&variant, &args).await,
        Variant::Lstm => handle::<lstm::Model<Backend>>(&variant, &args).await,
    }
}

async fn handle<N>(variant: &Variant, args: &Args) -> anyhow::Result<()>
where
    N: Network<Backend> + burn::module::AutodiffModule<Backend> + 'static,
{
    let device = if args.cpu {
        LibTorchDevice::Cpu
    } else {
        LibTorchDevice::Cuda(0)
    };

    let data_dir = args.data_dir.clone().unwrap_or_else(|| "data".to_string());

    let embeddings_path = args
        .embeddings
        .clone()
        .unwrap_or_else(|| format!("{data_dir}/embeddings.safetensors"));

    let embeddings = EmbeddingTable::<Backend>::load(&embeddings_path, &device).await?;

    let model = ModelConfig::new(
        variant.to_string(),
        embeddings.vocab_size(),
        args.batch_size,
        args.seq_len,
    )
    .with_embedding_dim(embeddings.embedding_dim())
    .with_l2_regularization(args.l2);

    let mut config = Training::new(model).with_data_dir(data_dir);

    if let Some(num_epochs) = args.num_epochs {
        config.num_epochs = num_epochs;
    }

    if let Some(artifact_dir) = &args.artifact_dir {
        config.artifact_dir = artifact_dir.to_string();
    }

    let train = tokenized::Dataset::load(&config.data_dir, "train").await?;
    let dev = tokenized::Dataset::load(&config.data_dir, "dev").await?;

    let counters = sentiment::train::<Backend, N, tokenized::Item, tokenized::Dataset>(
        device, embeddings, train, dev, config,
    )
    .await?;

    log::info!(
        "Finished {} epochs, best dev accuracy {:.4}",
        counters.epoch,
        counters.best_dev_acc
    );

    Ok(())
}
