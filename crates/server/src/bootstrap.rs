use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use scriven_agent::backend::BackendClient;
use scriven_agent::llm::{LlmClient, OpenAiCompatClient};
use scriven_agent::reflection::LlmPresenter;
use scriven_agent::remote::{AutomationClient, RemoteError};
use scriven_agent::resolver::EntityResolver;
use scriven_agent::{Orchestrator, ToolGateway};
use scriven_core::config::{AppConfig, ConfigError};

pub struct Application {
    pub config: AppConfig,
    pub orchestrator: Arc<Orchestrator>,
    pub automation: AutomationClient,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Automation(#[from] RemoteError),
    #[error("llm client construction failed: {0}")]
    Llm(String),
}

/// Wire the engine together. The automation service and the backend are
/// both allowed to be unreachable at startup: the engine then runs in a
/// degraded mode (zero tools, empty entity cache) instead of aborting.
pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let automation =
        AutomationClient::new(&config.automation.base_url, config.automation.timeout_secs)?;

    let available_tools = match automation.list_tools().await {
        Ok(tools) => {
            info!(
                event_name = "system.bootstrap.automation_connected",
                tool_count = tools.len(),
                "automation service connected"
            );
            tools
        }
        Err(error) => {
            warn!(
                event_name = "system.bootstrap.automation_degraded",
                error = %error,
                "automation service unreachable; continuing with zero tools"
            );
            Vec::new()
        }
    };

    let llm: Arc<dyn LlmClient> = Arc::new(
        OpenAiCompatClient::from_config(&config.llm)
            .map_err(|error| BootstrapError::Llm(error.to_string()))?,
    );

    let resolver = match BackendClient::from_config(&config.backend, config.automation.timeout_secs)
    {
        Some(backend) => {
            let backend = Arc::new(backend);
            match backend.authenticate().await {
                Ok(_) => info!(
                    event_name = "system.bootstrap.backend_session",
                    "backend session established"
                ),
                Err(error) => warn!(
                    event_name = "system.bootstrap.backend_degraded",
                    error = %error,
                    "backend auto-login failed; entity refreshes will retry on demand"
                ),
            }
            Arc::new(EntityResolver::new(backend))
        }
        None => {
            info!(
                event_name = "system.bootstrap.backend_disabled",
                "no backend credentials configured; entity cache disabled"
            );
            Arc::new(EntityResolver::disconnected())
        }
    };

    let gateway = ToolGateway::new(
        Arc::clone(&llm),
        Arc::new(automation.clone()),
        Arc::clone(&resolver),
        available_tools,
    );
    let presenter = Arc::new(LlmPresenter::new(llm));
    let orchestrator = Arc::new(Orchestrator::new(gateway, resolver, presenter));

    info!(event_name = "system.bootstrap.ready", "orchestrator ready");
    Ok(Application { config, orchestrator, automation })
}
