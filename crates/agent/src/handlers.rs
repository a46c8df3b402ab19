//! Capability handlers.
//!
//! One handler per domain: a system prompt, the domain's tool subset, and
//! an explicit tool policy. The policy is the contract that defeats
//! fabricated results: whenever a handler's tool set is non-empty, tool
//! invocation is mandatory, so the model cannot narrate a plausible answer
//! without the remote call actually happening.

use scriven_core::CapabilityDomain;

use crate::llm::{ToolChoice, ToolSpec};
use crate::remote::ToolDescriptor;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolPolicy {
    /// Tools offered ⇒ invocation mandatory.
    RequiredWhenAvailable,
    /// The model may answer directly (domains without tools).
    Advisory,
}

#[derive(Clone, Debug)]
pub struct CapabilityHandler {
    pub domain: CapabilityDomain,
    pub name: &'static str,
    pub system_prompt: String,
    pub tool_policy: ToolPolicy,
}

impl CapabilityHandler {
    pub fn for_domain(domain: CapabilityDomain) -> Self {
        let (name, system_prompt, tool_policy) = match domain {
            CapabilityDomain::Document => (
                "DocumentHandler",
                concat!(
                    "You are a document management specialist. You upload documents, ",
                    "list and search the user's documents, and retrieve document ",
                    "details. Perform every operation through the tools provided; ",
                    "never describe a result you did not fetch.",
                )
                .to_string(),
                ToolPolicy::RequiredWhenAvailable,
            ),
            CapabilityDomain::Signing => (
                "SigningHandler",
                concat!(
                    "You are a digital signature specialist. You create self-signing ",
                    "documents, place signature fields, and complete signing ",
                    "processes. Field positions are named slots: top-left, ",
                    "center-left, bottom-left, top-right, center-right, bottom-right. ",
                    "Perform every operation through the tools provided.",
                )
                .to_string(),
                ToolPolicy::RequiredWhenAvailable,
            ),
            CapabilityDomain::Template => (
                "TemplateHandler",
                concat!(
                    "You are a template specialist. You list templates, create ",
                    "templates from documents, and create documents from templates. ",
                    "Templates are referenced by their canonical identifier; the ",
                    "message has identifiers substituted in where known. Perform ",
                    "every operation through the tools provided.",
                )
                .to_string(),
                ToolPolicy::RequiredWhenAvailable,
            ),
            CapabilityDomain::Contact => (
                "ContactHandler",
                concat!(
                    "You are a contact specialist. You list the user's contacts and ",
                    "add new ones for routing documents. Perform every operation ",
                    "through the tools provided.",
                )
                .to_string(),
                ToolPolicy::RequiredWhenAvailable,
            ),
            CapabilityDomain::Admin => (
                "AdminHandler",
                concat!(
                    "You are a friendly administrative assistant for an e-signature ",
                    "workspace. Answer questions about accounts, sessions, and ",
                    "capabilities, and guide the user toward document, signing, ",
                    "template, or contact tasks when appropriate.",
                )
                .to_string(),
                ToolPolicy::Advisory,
            ),
        };

        Self { domain, name, system_prompt, tool_policy }
    }

    /// The subset of currently-available remote tools this handler may use.
    pub fn enabled_tools(&self, available: &[ToolDescriptor]) -> Vec<ToolSpec> {
        available
            .iter()
            .filter(|descriptor| self.domain.owns_tool(&descriptor.name))
            .map(ToolDescriptor::to_spec)
            .collect()
    }

    pub fn tool_choice(&self, offered_tools: usize) -> ToolChoice {
        match self.tool_policy {
            ToolPolicy::RequiredWhenAvailable if offered_tools > 0 => ToolChoice::Required,
            _ => ToolChoice::Auto,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HandlerRegistry {
    handlers: Vec<CapabilityHandler>,
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self {
            handlers: scriven_core::domain::capability::ALL_DOMAINS
                .into_iter()
                .map(CapabilityHandler::for_domain)
                .collect(),
        }
    }
}

impl HandlerRegistry {
    pub fn get(&self, domain: CapabilityDomain) -> &CapabilityHandler {
        self.handlers
            .iter()
            .find(|handler| handler.domain == domain)
            .unwrap_or_else(|| unreachable!("registry covers every domain"))
    }
}
