use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use serde::Serialize;

use scriven_agent::remote::AutomationClient;

use crate::api::ApiState;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub automation: HealthCheck,
    pub checked_at: String,
}

pub async fn health(State(state): State<ApiState>) -> (StatusCode, Json<HealthResponse>) {
    let automation = automation_check(&state.automation).await;
    let ready = automation.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "scriven-server runtime initialized".to_string(),
        },
        automation,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

async fn automation_check(client: &AutomationClient) -> HealthCheck {
    match client.list_tools().await {
        Ok(tools) => HealthCheck {
            status: "ready",
            detail: format!("{} tools available", tools.len()),
        },
        Err(error) => HealthCheck {
            status: "degraded",
            detail: format!("automation service check failed: {error}"),
        },
    }
}
