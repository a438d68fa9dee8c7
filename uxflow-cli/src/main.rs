//! uxflow: run a program on the uncertainty-tracking compute service and
//! print the URL of the plotted result.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use uxflow::config::{PipelineConfig, ENV_API_KEY, ENV_API_URL, ENV_CORE_ID};
use uxflow::core::{Language, PlotResult, RunPhase, SourceArtifact, TaskId};
use uxflow::errors::StageFailure;
use uxflow::events::LoggingEventSink;
use uxflow::observability::{init_logging, LogFormat};
use uxflow::pipeline::{Orchestrator, PipelineRun};
use uxflow::progress::RunProgress;

mod conversion;

use conversion::Conversion;

/// Uncertainty-tracking pipeline runner
#[derive(Parser)]
#[command(name = "uxflow")]
#[command(about = "Build, run and plot programs on an uncertainty-tracking compute service", long_about = None)]
#[command(version)]
struct Cli {
    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build and run a program, then plot its uncertain output
    Run(RunArgs),
    /// Plot the output of a task that already ran
    Plot(PlotArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Source file to build. Without it the built-in currency conversion runs.
    #[arg(long, conflicts_with_all = ["amount", "min_rate", "max_rate"])]
    source: Option<PathBuf>,

    /// Source language of --source [default: C]
    #[arg(long, requires = "source")]
    language: Option<Language>,

    /// Program arguments
    #[arg(long = "args", requires = "source")]
    arguments: Option<String>,

    /// Amount to convert
    #[arg(long, default_value_t = 100.0)]
    amount: f64,

    /// Lower bound of the conversion rate
    #[arg(long, default_value_t = 1.1)]
    min_rate: f64,

    /// Upper bound of the conversion rate
    #[arg(long, default_value_t = 1.3)]
    max_rate: f64,

    /// Compute core
    #[arg(long, env = ENV_CORE_ID)]
    core_id: Option<String>,

    #[command(flatten)]
    service: ServiceArgs,
}

#[derive(Args)]
struct PlotArgs {
    /// Identifier of a task whose stdout holds an uncertain value
    #[arg(long)]
    task_id: String,

    #[command(flatten)]
    service: ServiceArgs,
}

/// Connection and polling settings shared by every command.
#[derive(Args)]
struct ServiceArgs {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// API key
    #[arg(long, env = ENV_API_KEY, hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the compute service
    #[arg(long, env = ENV_API_URL)]
    api_url: Option<String>,

    /// Milliseconds between status queries
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Maximum status queries per job
    #[arg(long)]
    max_polls: Option<usize>,

    /// Overall run timeout in seconds
    #[arg(long)]
    timeout_secs: Option<f64>,
}

impl ServiceArgs {
    fn pipeline_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_file(path)?,
            None => PipelineConfig::default(),
        };
        config = config.apply_env(|key| std::env::var(key).ok())?;

        if let Some(key) = &self.api_key {
            config.api_key = uxflow::config::ApiKey::new(key.clone());
        }
        if let Some(url) = &self.api_url {
            config.api_url.clone_from(url);
        }
        if let Some(ms) = self.interval_ms {
            config.poll.interval_ms = ms;
        }
        if let Some(max) = self.max_polls {
            config.poll.max_iterations = Some(max);
        }
        if let Some(secs) = self.timeout_secs {
            config.run_timeout_seconds = secs;
        }
        config.validate()?;
        Ok(config)
    }

    fn prepare(&self) -> Result<PipelineRun> {
        let orchestrator =
            Orchestrator::from_config(self.pipeline_config()?)?.with_sink(Arc::new(LoggingEventSink::default()));
        Ok(orchestrator.prepare())
    }
}

impl RunArgs {
    fn artifact(&self) -> Result<SourceArtifact> {
        let mut artifact = match &self.source {
            Some(path) => {
                let code = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                let artifact = SourceArtifact::new(code, self.language.unwrap_or(Language::C));
                match &self.arguments {
                    Some(args) => artifact.with_arguments(args.clone()),
                    None => artifact,
                }
            }
            None => Conversion {
                amount: self.amount,
                min_rate: self.min_rate,
                max_rate: self.max_rate,
            }
            .into_artifact()?,
        };
        if let Some(core) = &self.core_id {
            artifact = artifact.with_core_id(core.clone());
        }
        Ok(artifact)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    init_logging(format, "info")?;

    match cli.command {
        Commands::Run(args) => run(args).await,
        Commands::Plot(args) => plot(args).await,
    }
}

async fn run(args: RunArgs) -> Result<()> {
    let artifact = args.artifact()?;
    let run = args.service.prepare()?;
    watch(&run);
    finish(run.execute(&artifact).await)
}

async fn plot(args: PlotArgs) -> Result<()> {
    let task_id = TaskId::new(args.task_id.trim());
    if task_id.as_str().is_empty() {
        anyhow::bail!("--task-id must not be empty");
    }
    let run = args.service.prepare()?;
    watch(&run);
    finish(run.replot(&task_id).await)
}

/// Cancels the run on Ctrl-C and logs its progress.
fn watch(run: &PipelineRun) {
    let token = run.cancel_token();
    let mut progress = run.subscribe();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, cancelling run");
            token.cancel("interrupted by user");
        }
    });
    tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            report(&progress.borrow_and_update());
        }
    });
}

fn finish(result: Result<PlotResult, StageFailure>) -> Result<()> {
    match result {
        Ok(plot) => {
            println!("{}", plot.presigned_url);
            Ok(())
        }
        Err(failure) => {
            let report = failure.report();
            anyhow::bail!("{} stage failed [{}]: {}", report.stage, report.code, report.message)
        }
    }
}

fn report(progress: &RunProgress) {
    if progress.phase != RunPhase::Running {
        return;
    }
    if let (Some(stage), Some(status)) = (progress.stage, progress.status) {
        tracing::info!(%stage, %status, polls = progress.poll_iterations, "Progress");
    }
}
