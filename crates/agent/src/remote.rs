//! Automation-service client.
//!
//! The remote service executes every state-changing operation. Wire
//! contract: `POST /execute` with `{tool, parameters}` returning
//! `{success, data}` or `{success: false, error}`; `GET /` lists the
//! available tools. Transport failures are surfaced as errors here and
//! normalized into failure outcomes by the gateway; nothing retries.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use crate::llm::ToolSpec;

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_parameters")]
    pub parameters: Value,
}

fn default_parameters() -> Value {
    json!({"type": "object", "properties": {}})
}

impl ToolDescriptor {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), description: String::new(), parameters: default_parameters() }
    }

    pub fn to_spec(&self) -> ToolSpec {
        ToolSpec {
            name: self.name.clone(),
            description: self.description.clone(),
            parameters: self.parameters.clone(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("automation service unreachable: {0}")]
    Transport(String),
    #[error("automation service returned HTTP {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("automation service returned a malformed payload: {0}")]
    Malformed(String),
}

/// Seam for dispatching tool calls; the HTTP client below is the production
/// implementation, tests substitute scripted executors.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, tool: &str, parameters: Value) -> Result<Value, RemoteError>;
}

#[derive(Clone)]
pub struct AutomationClient {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct ToolListing {
    #[serde(default)]
    tools: Vec<ToolDescriptor>,
}

impl AutomationClient {
    pub fn new(base_url: &str, timeout_secs: u64) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|error| RemoteError::Transport(error.to_string()))?;

        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_string() })
    }

    /// Tool discovery. The listing omits canonical entity identifiers, which
    /// is why template successes trigger a refresh against the authoritative
    /// source instead of reusing this endpoint.
    pub async fn list_tools(&self) -> Result<Vec<ToolDescriptor>, RemoteError> {
        let response = self
            .http
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .map_err(|error| RemoteError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status { status: status.as_u16(), detail });
        }

        let listing: ToolListing = response
            .json()
            .await
            .map_err(|error| RemoteError::Malformed(error.to_string()))?;

        debug!(tool_count = listing.tools.len(), "automation tool listing fetched");
        Ok(listing.tools)
    }
}

#[async_trait]
impl ToolExecutor for AutomationClient {
    async fn execute(&self, tool: &str, parameters: Value) -> Result<Value, RemoteError> {
        debug!(tool, "dispatching tool call to automation service");

        let response = self
            .http
            .post(format!("{}/execute", self.base_url))
            .json(&json!({"tool": tool, "parameters": parameters}))
            .send()
            .await
            .map_err(|error| RemoteError::Transport(error.to_string()))?;

        let status = response.status();
        let body: Value = response
            .json()
            .await
            .map_err(|error| RemoteError::Malformed(error.to_string()))?;

        // Failed executions arrive as structured bodies with non-2xx codes;
        // pass those through so outcome classification sees the error field.
        if !status.is_success() && body.get("error").is_none() && body.get("success").is_none() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                detail: body.to_string(),
            });
        }

        Ok(body)
    }
}
