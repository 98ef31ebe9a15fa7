//! Debate agent backed by an OpenAI-compatible chat-completions endpoint.
//!
//! Each role gets its own system prompt; the user prompt is the rendered
//! [`PromptContext`]. The model must answer with the JSON object described
//! in the response-format section of the prompt.

use std::collections::BTreeSet;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use claim_validation::debate::prompts::system_prompt;
use claim_validation::debate::{
    AgentError, AgentRole, AlternativeHypothesis, ConstitutionalFlag, DebateAgent,
    DebateMessage, MessageRef, PromptContext, RevisionProposal,
};

use crate::config::AgentEndpoint;

/// Reply object every role answers with. Lists are optional.
#[derive(Debug, Deserialize)]
struct AgentReply {
    content: String,
    confidence: f64,
    #[serde(default)]
    evidence_refs: BTreeSet<String>,
    #[serde(default)]
    challenges_raised: Vec<String>,
    #[serde(default)]
    references: Vec<MessageRef>,
    #[serde(default)]
    revisions: Vec<RevisionProposal>,
    #[serde(default)]
    flags: Vec<ConstitutionalFlag>,
    #[serde(default)]
    alternatives: Vec<AlternativeHypothesis>,
}

pub struct HttpAgent {
    client: reqwest::Client,
    endpoint: AgentEndpoint,
    timeout: Duration,
}

impl HttpAgent {
    /// `timeout` bounds each HTTP request; the engine applies its own
    /// per-call timeout on top.
    pub fn new(endpoint: AgentEndpoint, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint,
            timeout,
        })
    }

    fn classify(&self, e: reqwest::Error) -> AgentError {
        if e.is_timeout() {
            AgentError::Timeout(self.timeout)
        } else if e.is_connect() {
            AgentError::Unavailable(e.to_string())
        } else if e.is_decode() || e.is_body() {
            AgentError::Malformed(e.to_string())
        } else {
            AgentError::Transient(e.to_string())
        }
    }
}

#[async_trait]
impl DebateAgent for HttpAgent {
    async fn invoke(
        &self,
        role: AgentRole,
        context: &PromptContext,
    ) -> Result<DebateMessage, AgentError> {
        let body = serde_json::json!({
            "model": self.endpoint.model,
            "messages": [
                {"role": "system", "content": system_prompt(role)},
                {"role": "user", "content": context.render()}
            ],
            "max_tokens": self.endpoint.max_tokens,
            "temperature": self.endpoint.temperature,
        });

        let mut request = self.client.post(&self.endpoint.url).json(&body);
        if let Some(key) = &self.endpoint.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await.map_err(|e| self.classify(e))?;

        let status = response.status();
        if !status.is_success() {
            let text = error_body(&self.endpoint.url, response.text().await);
            let detail = format!("{} ({}): {}", self.endpoint.url, status, truncate(&text, 200));
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                AgentError::Transient(detail)
            } else {
                AgentError::Unavailable(detail)
            });
        }

        let json: serde_json::Value = response.json().await.map_err(|e| self.classify(e))?;
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AgentError::Malformed("response has no message content".into()))?;
        debug!(%role, round = context.round_number, chars = content.len(), "agent replied");

        parse_reply(role, context.round_number, content)
    }

    fn name(&self) -> &str {
        &self.endpoint.model
    }
}

/// Parse a model reply into a message for `role`.
///
/// Tolerates prose or code fences around the JSON object.
pub fn parse_reply(role: AgentRole, round_number: u32, text: &str) -> Result<DebateMessage, AgentError> {
    let start = text.find('{');
    let end = text.rfind('}');
    let json = match (start, end) {
        (Some(s), Some(e)) if s < e => &text[s..=e],
        _ => return Err(AgentError::Malformed(format!("no JSON object in reply: {}", truncate(text, 80)))),
    };
    let reply: AgentReply =
        serde_json::from_str(json).map_err(|e| AgentError::Malformed(e.to_string()))?;
    if !reply.confidence.is_finite() || !(0.0..=1.0).contains(&reply.confidence) {
        return Err(AgentError::Malformed(format!(
            "confidence {} outside [0, 1]",
            reply.confidence
        )));
    }

    let mut message = DebateMessage::new(role, round_number, &reply.content, reply.confidence)
        .with_evidence_refs(reply.evidence_refs);
    message.challenges_raised = reply.challenges_raised;
    message.references = reply.references;
    message.revisions = reply.revisions;
    message.flags = reply.flags;
    message.alternatives = reply.alternatives;
    Ok(message)
}

/// Body of a failed response for the error detail; a body that cannot be
/// read is logged and replaced by an empty string.
fn error_body<E: std::fmt::Display>(url: &str, body: std::result::Result<String, E>) -> String {
    match body {
        Ok(text) => text,
        Err(e) => {
            debug!(%url, error = %e, "failed to read error response body");
            String::new()
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}
