//! Authoritative entity source client.
//!
//! The automation service's tool listing omits canonical identifiers, so
//! the resolver refreshes its name→id cache from the backend directly:
//! credential exchange for a bearer token, then `GET /entities?limit=N`.
//! The token is cached and re-exchanged once on a 401.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

use scriven_core::config::BackendConfig;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityRecord {
    pub name: String,
    pub id: String,
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("entity source unreachable: {0}")]
    Transport(String),
    #[error("entity source rejected the credentials")]
    Unauthorized,
    #[error("entity source returned HTTP {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("entity source returned a malformed payload: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait EntitySource: Send + Sync {
    async fn fetch_entities(&self) -> Result<Vec<EntityRecord>, BackendError>;
}

pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
    email: String,
    password: SecretString,
    entity_limit: u32,
    token: RwLock<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

#[derive(Debug, Deserialize)]
struct EntityListing {
    #[serde(default)]
    entities: Vec<RawEntity>,
}

/// Listing entries carry more fields than we use; anything without both a
/// name and an id is skipped rather than failing the refresh.
#[derive(Debug, Deserialize)]
struct RawEntity {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    id: Option<String>,
}

impl BackendClient {
    /// Returns `None` when no credentials are configured; the resolver then
    /// runs with an empty cache instead of failing requests.
    pub fn from_config(config: &BackendConfig, timeout_secs: u64) -> Option<Self> {
        let email = config.email.clone()?;
        let password = config.password.clone()?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .ok()?;

        Some(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            email,
            password,
            entity_limit: config.entity_limit,
            token: RwLock::new(None),
        })
    }

    pub async fn authenticate(&self) -> Result<String, BackendError> {
        let response = self
            .http
            .post(format!("{}/auth/login", self.base_url))
            .json(&json!({
                "email": self.email,
                "password": self.password.expose_secret(),
            }))
            .send()
            .await
            .map_err(|error| BackendError::Transport(error.to_string()))?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(BackendError::Unauthorized);
        }
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status: status.as_u16(), detail });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|error| BackendError::Malformed(error.to_string()))?;

        *self.token.write().await = Some(body.token.clone());
        debug!("entity source bearer token refreshed");
        Ok(body.token)
    }

    async fn bearer_token(&self) -> Result<String, BackendError> {
        if let Some(token) = self.token.read().await.clone() {
            return Ok(token);
        }
        self.authenticate().await
    }

    async fn list_once(&self, token: &str) -> Result<reqwest::Response, BackendError> {
        self.http
            .get(format!("{}/entities", self.base_url))
            .query(&[("limit", self.entity_limit)])
            .bearer_auth(token)
            .send()
            .await
            .map_err(|error| BackendError::Transport(error.to_string()))
    }
}

#[async_trait]
impl EntitySource for BackendClient {
    async fn fetch_entities(&self) -> Result<Vec<EntityRecord>, BackendError> {
        let token = self.bearer_token().await?;
        let mut response = self.list_once(&token).await?;

        // Expired token: exchange once, retry once.
        if response.status().as_u16() == 401 {
            *self.token.write().await = None;
            let token = self.authenticate().await?;
            response = self.list_once(&token).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(BackendError::Status { status: status.as_u16(), detail });
        }

        let listing: EntityListing = response
            .json()
            .await
            .map_err(|error| BackendError::Malformed(error.to_string()))?;

        let records = listing
            .entities
            .into_iter()
            .filter_map(|raw| match (raw.name, raw.id) {
                (Some(name), Some(id)) if !name.trim().is_empty() && !id.trim().is_empty() => {
                    Some(EntityRecord { name: name.trim().to_string(), id })
                }
                _ => None,
            })
            .collect();

        Ok(records)
    }
}
