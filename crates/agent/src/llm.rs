//! Model client seam.
//!
//! The orchestration engine treats the language model as a translator: it
//! proposes tool calls and rewrites raw results, nothing more. The trait
//! keeps the runtime testable with scripted outcomes; the HTTP
//! implementation speaks the OpenAI-compatible chat-completions dialect
//! (which Ollama also serves), including the `tool_choice` field the
//! gateway uses to make tool invocation mandatory.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde_json::{json, Value};

use scriven_core::config::{LlmConfig, LlmProvider};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: ChatRole::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }
}

/// Wire description of one remote tool offered to the model.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolChoice {
    Auto,
    Required,
    None,
}

impl ToolChoice {
    fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Required => "required",
            Self::None => "none",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolSpec>,
    pub tool_choice: ToolChoice,
}

/// A tool call the model proposes; dispatching it is the gateway's job.
#[derive(Clone, Debug, PartialEq)]
pub struct ProposedCall {
    pub tool: String,
    pub parameters: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ChatOutcome {
    Text(String),
    ToolCalls(Vec<ProposedCall>),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatOutcome>;
}

pub struct OpenAiCompatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
}

impl OpenAiCompatClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let base_url = match (&config.base_url, config.provider) {
            (Some(base_url), _) => base_url.trim_end_matches('/').to_string(),
            (None, LlmProvider::OpenAi) => "https://api.openai.com".to_string(),
            (None, provider) => {
                return Err(anyhow!("llm.base_url is required for provider {provider:?}"))
            }
        };

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .context("building llm http client")?;

        Ok(Self { http, base_url, api_key: config.api_key.clone(), model: config.model.clone() })
    }

    fn request_body(&self, request: &ChatRequest) -> Value {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|message| json!({"role": message.role.as_str(), "content": message.content}))
            .collect();

        let mut body = json!({"model": self.model, "messages": messages});

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        },
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
            body["tool_choice"] = Value::String(request.tool_choice.as_str().to_string());
        }

        body
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatOutcome> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let mut http_request = self.http.post(&url).json(&self.request_body(&request));
        if let Some(api_key) = &self.api_key {
            http_request = http_request.bearer_auth(api_key.expose_secret());
        }

        let response = http_request.send().await.context("sending chat completion request")?;
        let status = response.status();
        let body: Value =
            response.json().await.context("decoding chat completion response")?;

        if !status.is_success() {
            let detail = body
                .pointer("/error/message")
                .and_then(Value::as_str)
                .unwrap_or("no error detail");
            return Err(anyhow!("chat completion failed with HTTP {status}: {detail}"));
        }

        parse_chat_outcome(&body)
    }
}

fn parse_chat_outcome(body: &Value) -> Result<ChatOutcome> {
    let message = body
        .pointer("/choices/0/message")
        .ok_or_else(|| anyhow!("chat completion response carried no message"))?;

    if let Some(tool_calls) = message.get("tool_calls").and_then(Value::as_array) {
        let proposed = tool_calls
            .iter()
            .filter_map(|call| {
                let function = call.get("function")?;
                let tool = function.get("name")?.as_str()?.to_string();
                let parameters = function
                    .get("arguments")
                    .and_then(Value::as_str)
                    .and_then(|raw| serde_json::from_str(raw).ok())
                    .unwrap_or_else(|| json!({}));
                Some(ProposedCall { tool, parameters })
            })
            .collect::<Vec<_>>();

        if !proposed.is_empty() {
            return Ok(ChatOutcome::ToolCalls(proposed));
        }
    }

    let text = message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();
    Ok(ChatOutcome::Text(text))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{parse_chat_outcome, ChatOutcome, ProposedCall};

    #[test]
    fn tool_call_responses_parse_into_proposed_calls() {
        let body = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "function": {
                            "name": "list_documents",
                            "arguments": "{\"limit\": 50}",
                        },
                    }],
                },
            }],
        });

        let outcome = parse_chat_outcome(&body).expect("outcome should parse");
        assert_eq!(
            outcome,
            ChatOutcome::ToolCalls(vec![ProposedCall {
                tool: "list_documents".to_string(),
                parameters: json!({"limit": 50}),
            }])
        );
    }

    #[test]
    fn text_responses_parse_into_text() {
        let body = json!({
            "choices": [{"message": {"content": "Here is what I found."}}],
        });

        let outcome = parse_chat_outcome(&body).expect("outcome should parse");
        assert_eq!(outcome, ChatOutcome::Text("Here is what I found.".to_string()));
    }

    #[test]
    fn malformed_tool_arguments_fall_back_to_empty_object() {
        let body = json!({
            "choices": [{
                "message": {
                    "tool_calls": [{
                        "function": {"name": "check_auth", "arguments": "not json"},
                    }],
                },
            }],
        });

        let outcome = parse_chat_outcome(&body).expect("outcome should parse");
        assert_eq!(
            outcome,
            ChatOutcome::ToolCalls(vec![ProposedCall {
                tool: "check_auth".to_string(),
                parameters: json!({}),
            }])
        );
    }
}
