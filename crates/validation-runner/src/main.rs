use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use validation_runner::config::RunnerConfig;
use validation_runner::{run_batch, AgentKind, BatchJob};

/// Validate a claim set through evidence scoring and agent debate.
#[derive(Parser, Debug)]
#[command(name = "validation-runner", version, about)]
struct Args {
    /// ValidationRequest JSON file
    #[arg(long)]
    input: PathBuf,

    /// Where to write the ValidationReport (stdout when omitted)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Engine/agent TOML config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Agent back-end
    #[arg(long, value_enum, default_value_t = AgentKind::Http)]
    agent: AgentKind,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false)]
    json_logs: bool,

    /// Append one JSON line per run to this file
    #[arg(long)]
    telemetry: Option<PathBuf>,
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.json_logs);

    let config = RunnerConfig::load(args.config.as_deref())?;
    let job = BatchJob {
        input: args.input,
        output: args.output,
        agent: args.agent,
        telemetry: args.telemetry,
    };

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling run");
            on_signal.cancel();
        }
    });

    let report = run_batch(&job, config, cancel).await?;
    if !report.verdict.consensus_reached {
        std::process::exit(2);
    }
    Ok(())
}
