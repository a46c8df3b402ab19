//! Orchestrator.
//!
//! Drives one request through the engine's state machine: entity
//! substitution, routing, gated tool invocation, presentation (skipped on
//! failure), and the atomic history append. The caller always receives a
//! well-formed response: failure outcomes surface as language-matched
//! error text and nothing in this module can take the process down.

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};
use uuid::Uuid;

use scriven_core::{classify, detect_script, CapabilityDomain, Script, ToolCallRecord, Turn};

use crate::gateway::{Outcome, ToolGateway};
use crate::reflection::Presenter;
use crate::resolver::EntityResolver;
use crate::store::ConversationStore;

#[derive(Clone, Debug)]
pub struct AttachedFile {
    pub file_name: String,
    pub file_path: String,
}

#[derive(Clone, Debug)]
pub struct ChatInbound {
    pub message: String,
    pub user_id: String,
    pub company_id: String,
    pub user_name: String,
    pub conversation_id: Option<String>,
    pub files: Vec<AttachedFile>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ResponseMetadata {
    pub agent: CapabilityDomain,
    pub user_name: String,
    pub files_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ChatOutbound {
    pub response: String,
    pub conversation_id: String,
    pub tool_calls: Vec<ToolCallRecord>,
    pub metadata: ResponseMetadata,
}

pub struct Orchestrator {
    gateway: ToolGateway,
    resolver: Arc<EntityResolver>,
    presenter: Arc<dyn Presenter>,
    store: ConversationStore,
}

impl Orchestrator {
    pub fn new(
        gateway: ToolGateway,
        resolver: Arc<EntityResolver>,
        presenter: Arc<dyn Presenter>,
    ) -> Self {
        Self { gateway, resolver, presenter, store: ConversationStore::new() }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn available_tool_count(&self) -> usize {
        self.gateway.available_tool_count()
    }

    /// Process one inbound request. Total: every path, including the
    /// top-level catch, returns a well-formed outbound response.
    pub async fn process(&self, inbound: ChatInbound) -> ChatOutbound {
        let conversation_id = inbound
            .conversation_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(|| format!("conv-{}-{}", inbound.user_id, Uuid::new_v4()));
        let script = detect_script(&inbound.message);

        match self.process_inner(&conversation_id, script, &inbound).await {
            Ok(outbound) => outbound,
            Err(failure) => {
                error!(
                    event_name = "runtime.request_failed",
                    conversation_id = %conversation_id,
                    error = %failure,
                    "request failed outside the outcome path"
                );
                ChatOutbound {
                    response: script.generic_failure().to_string(),
                    conversation_id,
                    tool_calls: Vec::new(),
                    metadata: ResponseMetadata {
                        agent: CapabilityDomain::Admin,
                        user_name: inbound.user_name,
                        files_count: inbound.files.len(),
                        error: Some(failure.to_string()),
                    },
                }
            }
        }
    }

    async fn process_inner(
        &self,
        conversation_id: &str,
        script: Script,
        inbound: &ChatInbound,
    ) -> anyhow::Result<ChatOutbound> {
        info!(
            event_name = "runtime.received",
            conversation_id,
            user_id = %inbound.user_id,
            company_id = %inbound.company_id,
            files = inbound.files.len(),
            "processing inbound message"
        );

        let full_message = with_file_context(&inbound.message, &inbound.files);

        // One lock for the whole turn: same-conversation requests serialize,
        // and a request cancelled mid-flight appends nothing.
        let entry = self.store.entry(conversation_id).await;
        let mut state = entry.lock().await;

        let substituted = self.resolver.substitute(&full_message, &state);
        let domain = classify(&substituted);
        info!(
            event_name = "runtime.routed",
            conversation_id,
            domain = %domain,
            substituted = substituted != full_message,
            "message classified"
        );

        let invocation = self.gateway.invoke(domain, &substituted, &mut state).await;

        let response = match &invocation.outcome {
            // Failure text bypasses the presenter entirely: the user sees
            // the remote error verbatim behind a localized prefix.
            Outcome::Failure { error } => format!("{}{error}", script.error_prefix()),
            Outcome::Success { data } => self.present(data, script, domain).await,
        };

        state.append_exchange(
            Turn::user(inbound.message.clone()),
            Turn::assistant(response.clone(), invocation.records.clone()),
        );
        drop(state);

        info!(
            event_name = "runtime.returned",
            conversation_id,
            domain = %domain,
            tool_calls = invocation.records.len(),
            "request complete"
        );

        Ok(ChatOutbound {
            response,
            conversation_id: conversation_id.to_string(),
            tool_calls: invocation.records,
            metadata: ResponseMetadata {
                agent: domain,
                user_name: inbound.user_name.clone(),
                files_count: inbound.files.len(),
                error: None,
            },
        })
    }

    async fn present(&self, data: &Value, script: Script, domain: CapabilityDomain) -> String {
        match self.presenter.present(data, script, domain).await {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) | Err(_) => {
                // Formatter failure loses the formatting, never the turn.
                warn!(
                    event_name = "runtime.formatter_fallback",
                    domain = %domain,
                    "presenter unusable; returning raw result as plain text"
                );
                raw_fallback(data)
            }
        }
    }
}

fn raw_fallback(data: &Value) -> String {
    match data {
        Value::String(text) => text.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

fn with_file_context(message: &str, files: &[AttachedFile]) -> String {
    if files.is_empty() {
        return message.to_string();
    }
    let mut full = String::from(message);
    full.push_str("\n\nAttached files:\n");
    for file in files {
        full.push_str(&format!("- {} (at {})\n", file.file_name, file.file_path));
    }
    full
}
