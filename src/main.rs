use clap::Parser;
use promsentinel::collector::CollectMode;
use promsentinel::config::AppConfig;
use promsentinel::logging::{self, LogConfig};
use promsentinel::pipeline::{Pipeline, PipelineOutcome};
use promsentinel::report;
use promsentinel::source::PrometheusSource;
use promsentinel::{Error, Result};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

/// Samples a metric from a Prometheus-compatible backend and flags
/// statistically anomalous values with an isolation forest.
#[derive(Debug, Parser)]
#[command(name = "promsentinel", version, about)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Query expression to evaluate
    #[arg(short, long)]
    query: Option<String>,

    /// Number of samples to collect
    #[arg(short = 'n', long)]
    samples: Option<usize>,

    /// Expected anomalous fraction, in (0, 0.5]
    #[arg(long)]
    contamination: Option<f64>,

    /// RNG seed for reproducible runs
    #[arg(long)]
    seed: Option<u64>,

    /// Base URL of the backend
    #[arg(long, env = "PROM_URL")]
    url: Option<String>,

    /// Acquisition mode: instant or poll
    #[arg(long)]
    mode: Option<String>,

    /// Write a commented sample configuration file and exit
    #[arg(long)]
    generate_config: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.generate_config {
        let path = PathBuf::from("promsentinel.toml.example");
        return match AppConfig::generate_sample_config(&path) {
            Ok(()) => {
                println!("sample configuration written to {}", path.display());
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{e}");
                ExitCode::FAILURE
            }
        };
    }

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let _log_guard = match logging::init_logging(&LogConfig::from_section(&config.log)) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("failed to initialize logging: {e}");
            return ExitCode::FAILURE;
        }
    };

    match run(&config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            // one line, no internal detail beyond the failure itself
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::load(cli.config.as_deref())?;

    if let Some(ref query) = cli.query {
        config.detection.query = query.clone();
    }
    if let Some(samples) = cli.samples {
        config.detection.sample_count = samples;
    }
    if let Some(contamination) = cli.contamination {
        config.detection.contamination = contamination;
    }
    if let Some(seed) = cli.seed {
        config.detection.seed = seed;
    }
    if let Some(ref url) = cli.url {
        config.source.url = url.clone();
    }
    if let Some(ref mode) = cli.mode {
        config.source.mode = match mode.as_str() {
            "instant" => CollectMode::Instant,
            "poll" => CollectMode::Poll,
            other => {
                return Err(Error::Config(format!(
                    "unknown mode {other:?}, expected \"instant\" or \"poll\""
                )))
            }
        };
    }

    config.validate()?;
    Ok(config)
}

async fn run(config: &AppConfig) -> Result<()> {
    let source = PrometheusSource::new(&config.source.url, config.source_timeout())?;
    let pipeline = Pipeline::new(config.pipeline_config())?;

    // retries cover transient source failures only; the pipeline itself
    // never retries
    let outcome = config
        .retry_strategy()
        .execute(|| pipeline.run(&source))
        .await?;

    match outcome {
        PipelineOutcome::NoData => {
            println!("No metric data.");
        }
        PipelineOutcome::Report(report) => {
            print!("{}", report::render_table(&report));
            println!("{}", report::render_summary(&report));
        }
    }

    Ok(())
}
