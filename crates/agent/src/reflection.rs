//! Presenter seam.
//!
//! Converts raw machine-shaped tool output into user-facing text. The
//! production implementation makes a second model call; the deterministic
//! implementation renders the core digest and exists so the engine's
//! response properties are testable without generation. Neither is ever
//! offered a tool: presentation cannot reach the automation service.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;

use scriven_core::{reflection, CapabilityDomain, Script};

use crate::llm::{ChatMessage, ChatOutcome, ChatRequest, LlmClient, ToolChoice};

#[async_trait]
pub trait Presenter: Send + Sync {
    async fn present(&self, raw: &Value, script: Script, domain: CapabilityDomain)
        -> Result<String>;
}

/// Digest renderer from `scriven-core`; total and model-free.
pub struct DeterministicPresenter;

#[async_trait]
impl Presenter for DeterministicPresenter {
    async fn present(
        &self,
        raw: &Value,
        script: Script,
        domain: CapabilityDomain,
    ) -> Result<String> {
        Ok(reflection::render_digest(raw, script, domain))
    }
}

pub struct LlmPresenter {
    llm: Arc<dyn LlmClient>,
}

impl LlmPresenter {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    fn system_prompt(script: Script, domain: CapabilityDomain) -> String {
        let language_rule = match script {
            Script::Latin => "Respond entirely in English.",
            Script::Hebrew => {
                "Respond entirely in Hebrew. Do not mix scripts within the response."
            }
        };
        let suggestions = reflection::suggestions(domain, script).join("; ");
        format!(
            "You rewrite raw tool results as short, friendly text for an \
             e-signature assistant. Present collections as a numbered list of \
             at most {max} items and say how many more exist. Never output \
             raw JSON, braces, or field names verbatim. Treat a missing \
             status as active. Close with 2-3 'what next' suggestions such \
             as: {suggestions}. {language_rule}",
            max = reflection::MAX_LISTED_ITEMS,
        )
    }
}

#[async_trait]
impl Presenter for LlmPresenter {
    async fn present(
        &self,
        raw: &Value,
        script: Script,
        domain: CapabilityDomain,
    ) -> Result<String> {
        let request = ChatRequest {
            messages: vec![
                ChatMessage::system(Self::system_prompt(script, domain)),
                ChatMessage::user(raw.to_string()),
            ],
            tools: Vec::new(),
            tool_choice: ToolChoice::None,
        };

        match self.llm.chat(request).await? {
            ChatOutcome::Text(text) if !text.trim().is_empty() => Ok(text),
            ChatOutcome::Text(_) => Err(anyhow!("presenter returned empty text")),
            ChatOutcome::ToolCalls(_) => {
                Err(anyhow!("presenter proposed a tool call; presentation is tool-free"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use scriven_core::{CapabilityDomain, Script};

    use crate::llm::{ChatOutcome, ProposedCall, ToolChoice};
    use crate::test_support::ScriptedLlm;

    use super::{DeterministicPresenter, LlmPresenter, Presenter};

    #[tokio::test]
    async fn deterministic_presenter_renders_digest() {
        let text = DeterministicPresenter
            .present(
                &json!({"templates": [{"name": "NDA"}]}),
                Script::Latin,
                CapabilityDomain::Template,
            )
            .await
            .expect("digest should render");
        assert!(text.contains("1. NDA"));
        assert!(text.contains("What next:"));
    }

    #[tokio::test]
    async fn llm_presenter_never_offers_tools() {
        let llm = ScriptedLlm::with(vec![ChatOutcome::Text("All done.".to_string())]);
        let requests = llm.requests();
        let presenter = LlmPresenter::new(Arc::new(llm));

        let text = presenter
            .present(&json!({"ok": true}), Script::Latin, CapabilityDomain::Admin)
            .await
            .expect("presentation should succeed");

        assert_eq!(text, "All done.");
        let seen = requests.lock().expect("requests lock");
        assert!(seen[0].tools.is_empty());
        assert_eq!(seen[0].tool_choice, ToolChoice::None);
    }

    #[tokio::test]
    async fn llm_presenter_rejects_tool_proposals_and_empty_text() {
        let llm = ScriptedLlm::with(vec![
            ChatOutcome::ToolCalls(vec![ProposedCall {
                tool: "list_documents".to_string(),
                parameters: json!({}),
            }]),
            ChatOutcome::Text("   ".to_string()),
        ]);
        let presenter = LlmPresenter::new(Arc::new(llm));

        let raw = json!({"ok": true});
        assert!(presenter.present(&raw, Script::Latin, CapabilityDomain::Admin).await.is_err());
        assert!(presenter.present(&raw, Script::Latin, CapabilityDomain::Admin).await.is_err());
    }

    #[tokio::test]
    async fn hebrew_prompt_demands_single_script_output() {
        let llm = ScriptedLlm::with(vec![ChatOutcome::Text("בוצע".to_string())]);
        let requests = llm.requests();
        let presenter = LlmPresenter::new(Arc::new(llm));

        presenter
            .present(&json!({"ok": true}), Script::Hebrew, CapabilityDomain::Document)
            .await
            .expect("presentation should succeed");

        let seen = requests.lock().expect("requests lock");
        assert!(seen[0].messages[0].content.contains("entirely in Hebrew"));
    }
}
