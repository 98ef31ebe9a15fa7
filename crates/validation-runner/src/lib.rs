//! Batch runner for the claim validation engine.
//!
//! Reads a `ValidationRequest` JSON file, validates it against the chosen
//! agent back-end, and writes the `ValidationReport` as JSON.

pub mod config;
pub mod heuristic_agent;
pub mod http_agent;
pub mod telemetry;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use claim_validation::{SharedAgent, ValidationEngine, ValidationReport, ValidationRequest};

use crate::config::RunnerConfig;
use crate::heuristic_agent::HeuristicAgent;
use crate::http_agent::HttpAgent;

/// Which debate agent back-end to run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum AgentKind {
    /// OpenAI-compatible chat-completions endpoint.
    Http,
    /// Deterministic offline agent.
    Heuristic,
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Http => write!(f, "http"),
            Self::Heuristic => write!(f, "heuristic"),
        }
    }
}

/// One batch invocation.
#[derive(Debug, Clone)]
pub struct BatchJob {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub agent: AgentKind,
    pub telemetry: Option<PathBuf>,
}

pub fn build_agent(kind: AgentKind, config: &RunnerConfig) -> Result<SharedAgent> {
    Ok(match kind {
        AgentKind::Http => Arc::new(HttpAgent::new(
            config.agent.clone(),
            config.engine.debate.agent_timeout(),
        )?),
        AgentKind::Heuristic => Arc::new(HeuristicAgent::new()),
    })
}

pub fn read_request(path: &Path) -> Result<ValidationRequest> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read input {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid request in {}", path.display()))
}

pub fn write_report(report: &ValidationReport, path: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report")?;
    match path {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("Failed to write report {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

/// Run `job` to completion or until `cancel` fires.
pub async fn run_batch(
    job: &BatchJob,
    config: RunnerConfig,
    cancel: CancellationToken,
) -> Result<ValidationReport> {
    let request = read_request(&job.input)?;
    let agent = build_agent(job.agent, &config)?;
    let engine = ValidationEngine::new(config.engine, agent)?;
    info!(
        claim_set = %request.claim_set_id,
        claims = request.claims.len(),
        agent = %job.agent,
        "Starting validation"
    );

    let report = match engine.validate_with_cancel(request, cancel).await {
        Ok(report) => report,
        Err(e) => {
            if let Some(partial) = e.partial() {
                warn!(
                    claim_set = %partial.claim_set_id,
                    scored = partial.assessments.len(),
                    completed = partial.completed.len(),
                    "Run aborted with partial results"
                );
            }
            return Err(e).context("Validation failed");
        }
    };

    write_report(&report, job.output.as_deref())?;
    if let Some(path) = &job.telemetry {
        telemetry::append_run(
            &telemetry::RunRecord::from_report(&report, &job.agent.to_string()),
            path,
        );
    }
    info!("{}", report.summary_line());
    Ok(report)
}
