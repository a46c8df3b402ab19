//! Scripted doubles shared by the crate's test modules.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::backend::{BackendError, EntityRecord, EntitySource};
use crate::llm::{ChatOutcome, ChatRequest, LlmClient};
use crate::remote::{RemoteError, ToolExecutor};

/// Model double that replays a fixed sequence of outcomes and captures
/// every request for assertions.
pub struct ScriptedLlm {
    outcomes: Mutex<VecDeque<ChatOutcome>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
    failing: bool,
}

impl ScriptedLlm {
    pub fn with(outcomes: Vec<ChatOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            requests: Arc::new(Mutex::new(Vec::new())),
            failing: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            outcomes: Mutex::new(VecDeque::new()),
            requests: Arc::new(Mutex::new(Vec::new())),
            failing: true,
        }
    }

    pub fn requests(&self) -> Arc<Mutex<Vec<ChatRequest>>> {
        Arc::clone(&self.requests)
    }
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn chat(&self, request: ChatRequest) -> Result<ChatOutcome> {
        self.requests.lock().expect("requests lock").push(request);
        if self.failing {
            return Err(anyhow!("scripted model failure"));
        }
        let next = self.outcomes.lock().expect("outcomes lock").pop_front();
        Ok(next.unwrap_or_else(|| ChatOutcome::Text(String::new())))
    }
}

/// Executor double with canned responses per tool name. Unknown tools fail
/// the way the real service does: with a descriptive structured error.
pub struct StaticExecutor {
    responses: HashMap<String, Value>,
    calls: Arc<Mutex<Vec<(String, Value)>>>,
    unreachable: bool,
}

impl StaticExecutor {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            calls: Arc::new(Mutex::new(Vec::new())),
            unreachable: false,
        }
    }

    pub fn unreachable() -> Self {
        Self { unreachable: true, ..Self::new() }
    }

    pub fn respond(mut self, tool: &str, response: Value) -> Self {
        self.responses.insert(tool.to_string(), response);
        self
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<(String, Value)>>> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl ToolExecutor for StaticExecutor {
    async fn execute(&self, tool: &str, parameters: Value) -> Result<Value, RemoteError> {
        if self.unreachable {
            return Err(RemoteError::Transport("connection refused".to_string()));
        }
        self.calls.lock().expect("calls lock").push((tool.to_string(), parameters));
        match self.responses.get(tool) {
            Some(response) => Ok(response.clone()),
            None => Ok(json!({"success": false, "error": format!("unknown tool `{tool}`")})),
        }
    }
}

/// Entity source double returning a fixed listing.
pub struct StaticSource {
    records: Vec<EntityRecord>,
}

impl StaticSource {
    pub fn with(pairs: &[(&str, &str)]) -> Self {
        Self {
            records: pairs
                .iter()
                .map(|(name, id)| EntityRecord { name: name.to_string(), id: id.to_string() })
                .collect(),
        }
    }
}

#[async_trait]
impl EntitySource for StaticSource {
    async fn fetch_entities(&self) -> Result<Vec<EntityRecord>, BackendError> {
        Ok(self.records.clone())
    }
}
