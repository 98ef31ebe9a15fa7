//! Run telemetry.
//!
//! One JSON line per finished run, appended to a `.jsonl` file. Failures to
//! write are logged and never fail the run.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use claim_validation::{DebatePhase, ValidationReport};

/// Compact record of one validation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub claim_set_id: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub agent: String,
    pub claims: usize,
    pub approved: usize,
    pub rejected: usize,
    pub exhausted: usize,
    pub malformed: usize,
    pub rounds: usize,
    pub consensus_reached: bool,
    pub aggregate_confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resilience_score: Option<f64>,
    pub anomalies: usize,
    pub insufficient_data: usize,
    /// Debated claims a competing hypothesis explains better.
    #[serde(default)]
    pub outscored: usize,
}

impl RunRecord {
    pub fn from_report(report: &ValidationReport, agent: &str) -> Self {
        let verdict = &report.verdict;
        Self {
            run_id: report.run_id.to_string(),
            claim_set_id: report.claim_set_id.clone(),
            started_at: report.started_at,
            duration_ms: report.duration_ms,
            agent: agent.to_string(),
            claims: report.debates.len() + report.malformed_claims.len(),
            approved: verdict.approved_claim_ids.len(),
            rejected: verdict.rejected_claim_ids.len(),
            exhausted: report
                .debates
                .iter()
                .filter(|d| d.phase() == DebatePhase::Exhausted)
                .count(),
            malformed: report.malformed_claims.len(),
            rounds: report.total_rounds(),
            consensus_reached: verdict.consensus_reached,
            aggregate_confidence: verdict.aggregate_confidence,
            resilience_score: verdict.resilience_score(),
            anomalies: report.anomalies.len(),
            insufficient_data: report.insufficient_data.len(),
            outscored: report
                .hypotheses
                .iter()
                .filter(|m| m.claim_outscored())
                .count(),
        }
    }
}

/// Append `record` to the JSONL file at `path`.
pub fn append_run(record: &RunRecord, path: &Path) {
    match serde_json::to_string(record) {
        Ok(json) => {
            use std::io::Write;
            match std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
            {
                Ok(mut file) => {
                    if let Err(e) = writeln!(file, "{json}") {
                        warn!("Failed to append run telemetry: {e}");
                    } else {
                        info!(path = %path.display(), "Appended run telemetry");
                    }
                }
                Err(e) => warn!("Failed to open telemetry file: {e}"),
            }
        }
        Err(e) => warn!("Failed to serialize run telemetry: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> RunRecord {
        RunRecord {
            run_id: id.into(),
            claim_set_id: "set-1".into(),
            started_at: Utc::now(),
            duration_ms: 1200,
            agent: "heuristic".into(),
            claims: 3,
            approved: 2,
            rejected: 1,
            exhausted: 0,
            malformed: 1,
            rounds: 4,
            consensus_reached: true,
            aggregate_confidence: 0.84,
            resilience_score: Some(0.71),
            anomalies: 0,
            insufficient_data: 0,
            outscored: 0,
        }
    }

    #[test]
    fn test_append_creates_and_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.jsonl");
        append_run(&record("r1"), &path);
        append_run(&record("r2"), &path);

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<RunRecord> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].run_id, "r1");
        assert_eq!(lines[1].run_id, "r2");
    }

    #[test]
    fn test_unwritable_path_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        append_run(&record("r1"), &dir.path().join("missing").join("runs.jsonl"));
    }
}
