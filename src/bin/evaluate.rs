//! Command line tool to score a trained sentiment classifier on a dataset split

use anyhow::anyhow;
use burn::backend::{libtorch::LibTorchDevice, Autodiff, LibTorch};
use burn_sentiment::{
    cli::Variant,
    datasets::{tokenized, LoadableDataset},
    models::{lstm, qrnn, vanilla},
    pipelines::sentiment::{self, Metrics, Network},
};
use pico_args::Arguments;

type Backend = Autodiff<LibTorch>;

const HELP: &str = "\
Usage: evaluate VARIANT [OPTIONS]

Arguments:
  VARIANT              The trained network ('vanilla', 'qrnn', 'dense-qrnn' or 'lstm')

Options:
  -h, --help           Print help
  -d, --data-dir       The path to the top-level data directory (defaults to 'data')
  -a, --artifact-dir   The directory written by training (defaults to 'artifacts')
  --split              The split to score (defaults to 'test')
  --cpu                Run on the CPU instead of the first CUDA device
";

#[derive(Debug)]
struct Args {
    variant: String,
    data_dir: String,
    artifact_dir: String,
    split: String,
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
            data_dir: pargs
                .opt_value_from_str(["-d", "--data-dir"])?
                .unwrap_or_else(|| "data".to_string()),
            artifact_dir: pargs
                .opt_value_from_str(["-a", "--artifact-dir"])?
                .unwrap_or_else(|| "artifacts".to_string()),
            split: pargs
                .opt_value_from_str("--split")?
                .unwrap_or_else(|| "test".to_string()),
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

    let metrics = match variant {
        Variant::Vanilla => handle::<vanilla::Model<Backend>>(&args).await?,
        Variant::Qrnn => handle::<qrnn::Model<Backend>>(&args).await?,
        Variant::DenseQrnn => handle::<qrnn::dense::Model<Backend>>(&args).await?,
        Variant::Lstm => handle::<lstm::Model<Backend>>(&args).await?,
    };

    println!(
        "\n=== {variant} on {split} ===\
         \n- Cost: {cost:.4}\
         \n- Accuracy: {accuracy:.4}\
         \n- Positive guesses: {guess}\
         \n================",
        split = args.split,
        cost = metrics.cost,
        accuracy = metrics.accuracy,
        guess = metrics.average_guess,
    );

    Ok(())
}

async fn handle<N>(args: &Args) -> anyhow::Result<Metrics>
where
    N: Network<Backend> + burn::module::AutodiffModule<Backend> + 'static,
{
    let device = if args.cpu {
        LibTorchDevice::Cpu
    } else {
        LibTorchDevice::Cuda(0)
    };

    let split = tokenized::Dataset::load(&args.data_dir, &args.split).await?;

    sentiment::evaluate::<Backend, N, tokenized::Item, tokenized::Dataset>(
        device,
        &args.artifact_dir,
        split,
        4,
    )
}
