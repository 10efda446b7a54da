//! Motion Activity CLI
//!
//! Train an activity classifier and classify recorded or piped sensor data.

use chrono::Utc;
use clap::{Parser, Subcommand};
use motion_activity::{
    config::{ClassifierConfig, ConfigError},
    stats::{create_shared_stats_with_persistence, PredictionStats},
    trainer::{ArtifactTrainer, Predictor, Trainer, TrainingError, TrainingRequest},
    Classifier, ReplaySource, VERSION,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[cfg(feature = "remote")]
use motion_activity::trainer::HttpTrainer;

#[derive(Parser)]
#[command(name = "motion-activity")]
#[command(version = VERSION)]
#[command(about = "Classify physical activity from motion sensor data", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train the classifier and print a label for every prediction
    Run {
        /// JSON-lines sensor events to replay (stdin if omitted)
        #[arg(long, short)]
        input: Option<PathBuf>,

        /// Load a model artifact instead of training remotely
        #[arg(long, short)]
        model: Option<PathBuf>,

        /// Replay rate in events per second (as fast as possible if omitted)
        #[arg(long)]
        rate: Option<f64>,

        /// Serve status on this localhost port (requires server feature)
        #[arg(long)]
        serve: Option<u16>,
    },

    /// Train the classifier and report the outcome
    Train {
        /// Load a model artifact instead of training remotely
        #[arg(long, short)]
        model: Option<PathBuf>,
    },

    /// Show configuration and the training request it produces
    Config,

    /// Show statistics persisted by previous runs
    Status,
}

/// Trainer selected on the command line.
enum CliTrainer {
    Artifact(ArtifactTrainer),
    #[cfg(feature = "remote")]
    Http(HttpTrainer),
}

impl Trainer for CliTrainer {
    async fn train(&self, request: &TrainingRequest) -> Result<Box<dyn Predictor>, TrainingError> {
        match self {
            CliTrainer::Artifact(trainer) => trainer.train(request).await,
            #[cfg(feature = "remote")]
            CliTrainer::Http(trainer) => trainer.train(request).await,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            input,
            model,
            rate,
            serve,
        } => cmd_run(cli.config.as_deref(), input, model, rate, serve).await,
        Commands::Train { model } => cmd_train(cli.config.as_deref(), model).await,
        Commands::Config => cmd_config(cli.config.as_deref()),
        Commands::Status => cmd_status(cli.config.as_deref()),
    }
}

async fn cmd_run(
    config_path: Option<&Path>,
    input: Option<PathBuf>,
    model: Option<PathBuf>,
    rate: Option<f64>,
    serve: Option<u16>,
) -> anyhow::Result<()> {
    println!("Motion Activity v{VERSION}");
    println!();

    let config = load_config(config_path)?;
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    println!("Measurement: {}", config.measurement);
    println!("  Sensors: {}", config.sensors.join(", "));
    println!("  Labels: {}", config.labels.join(", "));
    match config.preprocessor {
        Some(ref preprocessor) => println!(
            "  Mode: windowed ({} over {}ms)",
            preprocessor.kind,
            preprocessor.window.as_millis()
        ),
        None => println!("  Mode: per frame ({} Hz)", config.runtime.frame_rate_hz),
    }

    let stats = create_shared_stats_with_persistence(config.stats_path());
    let trainer = select_trainer(&config, model)?;
    let classifier = Arc::new(
        Classifier::new(config, trainer, |label: &str| {
            println!("[{}] {}", Utc::now().format("%H:%M:%S%.3f"), label);
        })?
        .with_stats(Arc::clone(&stats)),
    );
    println!("Instance ID: {}", classifier.instance_id());
    println!();

    classifier.train().await?;

    #[cfg(feature = "server")]
    let server = match serve {
        Some(port) => {
            let provider: Arc<dyn motion_activity::server::StatusProvider> = classifier.clone();
            let (addr, shutdown) =
                motion_activity::server::run(motion_activity::server::ServerConfig::new(port), provider)
                    .await?;
            println!("Status: http://{addr}/status");
            Some(shutdown)
        }
        None => None,
    };
    #[cfg(not(feature = "server"))]
    if serve.is_some() {
        eprintln!("Warning: --serve flag ignored (server feature not enabled at compile time)");
    }

    let mut source = ReplaySource::new(input);
    if let Some(rate) = rate {
        source = source.with_rate(rate);
    }

    let handle = classifier.start_prediction(source).await?;
    let stopper = handle.stopper();
    ctrlc::set_handler(move || stopper.stop())?;

    println!("Press Ctrl+C to stop");
    println!();

    let result = handle.wait().await;

    #[cfg(feature = "server")]
    if let Some(shutdown) = server {
        let _ = shutdown.send(());
    }

    if let Err(e) = stats.save() {
        eprintln!("Warning: Could not save statistics: {e}");
    }
    println!();
    println!("{}", stats.summary());

    result.map_err(Into::into)
}

async fn cmd_train(config_path: Option<&Path>, model: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let classifier_type = config.classifier.kind.clone();
    let trainer = select_trainer(&config, model)?;
    let classifier = Classifier::new(config, trainer, |_: &str| {})?;

    classifier.train().await?;
    println!(
        "Trained {} (instance {})",
        classifier_type,
        classifier.instance_id()
    );
    Ok(())
}

fn cmd_config(config_path: Option<&Path>) -> anyhow::Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(ClassifierConfig::config_path);
    let config = load_config(config_path)?;

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", path);
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
    println!();

    let request = TrainingRequest::from_config(&config);
    println!("Training request:");
    #[cfg(feature = "remote")]
    match HttpTrainer::url(&request) {
        Ok(url) => println!("  GET {url}"),
        Err(e) => println!("  {e}"),
    }
    #[cfg(not(feature = "remote"))]
    for (key, value) in request.query_pairs() {
        println!("  {key} = {value}");
    }
    Ok(())
}

fn cmd_status(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;

    println!("Motion Activity Status");
    println!("======================");
    println!();
    println!("Configuration:");
    println!("  Measurement: {}", config.measurement);
    println!("  Classifier: {}", config.classifier.kind);
    println!("  Labels: {}", config.labels.join(", "));
    println!("  Data path: {:?}", config.runtime.data_path);
    println!();

    match PredictionStats::read_persisted(&config.stats_path()) {
        Ok(Some(stats)) => {
            println!("Statistics (all sessions):");
            println!("  Readings received: {}", stats.readings_received);
            println!("  Readings dropped: {}", stats.readings_dropped);
            println!("  Windows flushed: {}", stats.windows_flushed);
            println!("  Predictions emitted: {}", stats.predictions_emitted);
            println!("  Invalid inputs: {}", stats.invalid_inputs);
            println!(
                "  Last label: {}",
                stats.last_label.as_deref().unwrap_or("none")
            );
            println!("  Last updated: {}", stats.last_updated);
        }
        Ok(None) => println!("No statistics recorded yet."),
        Err(e) => eprintln!("Warning: Could not read statistics: {e}"),
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<ClassifierConfig, ConfigError> {
    match path {
        Some(path) => ClassifierConfig::load(path),
        None => ClassifierConfig::load_default(),
    }
}

/// Use a local artifact when one is given, the training service otherwise.
fn select_trainer(config: &ClassifierConfig, model: Option<PathBuf>) -> anyhow::Result<CliTrainer> {
    if let Some(path) = model {
        println!("Model artifact: {:?}", path);
        return Ok(CliTrainer::Artifact(ArtifactTrainer::new(path)));
    }

    #[cfg(feature = "remote")]
    {
        println!("Training server: {}", config.server);
        let timeout = std::time::Duration::from_secs(config.runtime.trainer_timeout_secs);
        Ok(CliTrainer::Http(HttpTrainer::new(timeout)?))
    }

    #[cfg(not(feature = "remote"))]
    {
        let _ = config;
        anyhow::bail!("no --model given and remote training is not enabled at compile time")
    }
}
