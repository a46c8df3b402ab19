//! HTTP front door.
//!
//! Thin wire layer over the orchestrator: DTOs use the camelCase casing of
//! the inbound contract, `/api/chat` always answers 200 with a well-formed
//! body (internal failures arrive as error text in `response`), and CORS is
//! driven by configuration.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use scriven_agent::remote::AutomationClient;
use scriven_agent::runtime::ResponseMetadata;
use scriven_agent::{AttachedFile, ChatInbound, ChatOutbound, Orchestrator};
use scriven_core::{CallStatus, ToolCallRecord};

use crate::health;

#[derive(Clone)]
pub struct ApiState {
    pub orchestrator: Arc<Orchestrator>,
    pub automation: AutomationClient,
}

impl ApiState {
    pub fn new(orchestrator: Arc<Orchestrator>, automation: AutomationClient) -> Self {
        Self { orchestrator, automation }
    }
}

pub fn router(state: ApiState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(service_info))
        .route("/health", get(health::health))
        .route("/api/chat", post(chat))
        .route("/api/tools", get(list_tools))
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    if allowed_origins.iter().any(|origin| origin == "*") {
        return CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any);
    }

    let origins: Vec<HeaderValue> =
        allowed_origins.iter().filter_map(|origin| origin.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequestBody {
    pub message: String,
    pub context: ChatContext,
    #[serde(default)]
    pub files: Vec<FileInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatContext {
    pub user_id: String,
    pub company_id: String,
    pub user_name: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    #[serde(default)]
    pub file_id: Option<String>,
    pub file_name: String,
    pub file_path: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponseBody {
    pub response: String,
    pub conversation_id: String,
    pub tool_calls: Vec<ToolCallBody>,
    pub metadata: ResponseMetadata,
}

#[derive(Debug, Serialize)]
pub struct ToolCallBody {
    pub tool: String,
    pub action: &'static str,
    pub parameters: Value,
    pub result: String,
    pub status: CallStatus,
}

impl From<ToolCallRecord> for ToolCallBody {
    fn from(record: ToolCallRecord) -> Self {
        Self {
            tool: record.tool,
            action: "execute",
            parameters: record.parameters,
            result: record.result,
            status: record.status,
        }
    }
}

impl From<ChatOutbound> for ChatResponseBody {
    fn from(outbound: ChatOutbound) -> Self {
        Self {
            response: outbound.response,
            conversation_id: outbound.conversation_id,
            tool_calls: outbound.tool_calls.into_iter().map(ToolCallBody::from).collect(),
            metadata: outbound.metadata,
        }
    }
}

async fn chat(
    State(state): State<ApiState>,
    Json(body): Json<ChatRequestBody>,
) -> Json<ChatResponseBody> {
    info!(
        event_name = "api.chat",
        user_id = %body.context.user_id,
        files = body.files.len(),
        "chat request received"
    );

    let inbound = ChatInbound {
        message: body.message,
        user_id: body.context.user_id,
        company_id: body.context.company_id,
        user_name: body.context.user_name,
        conversation_id: body.context.conversation_id,
        files: body
            .files
            .into_iter()
            .map(|file| AttachedFile { file_name: file.file_name, file_path: file.file_path })
            .collect(),
    };

    let outbound = state.orchestrator.process(inbound).await;
    Json(ChatResponseBody::from(outbound))
}

async fn list_tools(State(state): State<ApiState>) -> (StatusCode, Json<Value>) {
    match state.automation.list_tools().await {
        Ok(tools) => {
            let listed: Vec<Value> = tools
                .iter()
                .map(|tool| json!({"name": tool.name, "description": tool.description}))
                .collect();
            (StatusCode::OK, Json(json!({"count": listed.len(), "tools": listed})))
        }
        Err(error) => {
            (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": error.to_string()})))
        }
    }
}

async fn service_info(State(state): State<ApiState>) -> Json<Value> {
    let agents: Vec<&str> = scriven_core::domain::capability::ALL_DOMAINS
        .iter()
        .map(|domain| domain.as_str())
        .collect();

    Json(json!({
        "service": "scriven-orchestrator",
        "status": "healthy",
        "timestamp": Utc::now().to_rfc3339(),
        "agents": agents,
        "tools_available": state.orchestrator.available_tool_count(),
        "conversations": state.orchestrator.store().conversation_count().await,
    }))
}
