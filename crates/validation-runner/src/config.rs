use std::path::Path;

use anyhow::{bail, Context, Result};
use claim_validation::EngineConfig;
use serde::{Deserialize, Serialize};

/// OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentEndpoint {
    /// Full URL of the `/chat/completions` route.
    pub url: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for AgentEndpoint {
    fn default() -> Self {
        Self {
            url: "http://localhost:8000/v1/chat/completions".into(),
            model: "default".into(),
            api_key: None,
            temperature: 0.2,
            max_tokens: 1024,
        }
    }
}

/// Runner configuration file.
///
/// ```toml
/// [agent]
/// url = "http://localhost:8000/v1/chat/completions"
/// model = "qwen2.5-72b-instruct"
///
/// [engine.debate]
/// max_parallel_claims = 8
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub agent: AgentEndpoint,
    pub engine: EngineConfig,
}

impl RunnerConfig {
    /// Load from `path`, or defaults when `None`, then apply process env.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config {}", path.display()))?;
                Self::from_toml_str(&text)
                    .with_context(|| format!("Invalid config {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.engine.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("Failed to parse TOML")?;
        Ok(config)
    }

    /// Apply `VALIDATION_*` overrides read through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = var("VALIDATION_AGENT_URL") {
            self.agent.url = url;
        }
        if let Some(model) = var("VALIDATION_AGENT_MODEL") {
            self.agent.model = model;
        }
        if let Some(key) = var("VALIDATION_AGENT_API_KEY") {
            self.agent.api_key = Some(key);
        }
        if let Some(v) = var("VALIDATION_CONSENSUS_THRESHOLD") {
            self.engine.aggregation.consensus_threshold = v
                .parse()
                .with_context(|| format!("VALIDATION_CONSENSUS_THRESHOLD={v}"))?;
        }
        if let Some(v) = var("VALIDATION_MAX_PARALLEL_CLAIMS") {
            self.engine.debate.max_parallel_claims = v
                .parse()
                .with_context(|| format!("VALIDATION_MAX_PARALLEL_CLAIMS={v}"))?;
        }
        if let Some(v) = var("VALIDATION_AGENT_TIMEOUT_SECS") {
            let secs: u64 = v
                .parse()
                .with_context(|| format!("VALIDATION_AGENT_TIMEOUT_SECS={v}"))?;
            if secs == 0 {
                bail!("VALIDATION_AGENT_TIMEOUT_SECS must be greater than zero");
            }
            self.engine.debate.agent_timeout_ms = secs.checked_mul(1000).with_context(|| {
                format!("VALIDATION_AGENT_TIMEOUT_SECS={v} overflows the millisecond timeout")
            })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_file() {
        let mut config = RunnerConfig::default();
        config.apply_env(env(&[])).unwrap();
        assert_eq!(config, RunnerConfig::default());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = RunnerConfig::default();
        config
            .apply_env(env(&[
                ("VALIDATION_AGENT_URL", "http://10.0.0.5:8080/v1/chat/completions"),
                ("VALIDATION_AGENT_MODEL", "qwen"),
                ("VALIDATION_AGENT_API_KEY", "sk-test"),
                ("VALIDATION_CONSENSUS_THRESHOLD", "0.75"),
                ("VALIDATION_MAX_PARALLEL_CLAIMS", "8"),
                ("VALIDATION_AGENT_TIMEOUT_SECS", "20"),
            ]))
            .unwrap();
        assert_eq!(config.agent.model, "qwen");
        assert_eq!(config.agent.api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.engine.aggregation.consensus_threshold, 0.75);
        assert_eq!(config.engine.debate.max_parallel_claims, 8);
        assert_eq!(config.engine.debate.agent_timeout_ms, 20_000);
    }

    #[test]
    fn test_bad_env_value_is_an_error() {
        let mut config = RunnerConfig::default();
        let err = config
            .apply_env(env(&[("VALIDATION_MAX_PARALLEL_CLAIMS", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("VALIDATION_MAX_PARALLEL_CLAIMS"));
        assert!(config
            .apply_env(env(&[("VALIDATION_AGENT_TIMEOUT_SECS", "0")]))
            .is_err());
    }

    #[test]
    fn test_huge_timeout_is_an_error() {
        let mut config = RunnerConfig::default();
        let huge = u64::MAX.to_string();
        let err = config
            .apply_env(env(&[("VALIDATION_AGENT_TIMEOUT_SECS", huge.as_str())]))
            .unwrap_err();
        assert!(err.to_string().contains("overflows"));
        assert_eq!(
            config.engine.debate.agent_timeout_ms,
            RunnerConfig::default().engine.debate.agent_timeout_ms
        );
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[agent]\nmodel = \"local-72b\"\n\n[engine.debate]\nmax_parallel_claims = 2\n"
        )
        .unwrap();
        let config = RunnerConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.engine.debate.max_parallel_claims, 2);
        assert_eq!(config.engine.debate.base_rounds, 3);
    }

    #[test]
    fn test_invalid_engine_values_rejected_on_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[engine.aggregation]\nconsensus_threshold = 0.99\n").unwrap();
        assert!(RunnerConfig::load(Some(file.path())).is_err());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = RunnerConfig::load(Some(Path::new("/nonexistent/engine.toml"))).unwrap_err();
        assert!(err.to_string().contains("Failed to read config"));
    }
}
