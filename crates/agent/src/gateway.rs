//! Tool gateway.
//!
//! Single choke point between capability handlers and the automation
//! service. The gateway offers the handler's tool subset to the model with
//! invocation made mandatory whenever tools exist, dispatches every
//! proposed call over the wire, and normalizes the result into a uniform
//! success/failure outcome. A `ToolCallRecord` is appended for dispatched
//! calls only: a proposed call that never reached the wire leaves no
//! record, and prose returned in place of a mandatory call is a failure,
//! not an answer.

use std::sync::Arc;

use serde_json::Value;
use tracing::{info, warn};

use scriven_core::positions;
use scriven_core::{CallStatus, CapabilityDomain, ToolCallRecord};

use crate::handlers::HandlerRegistry;
use crate::llm::{ChatMessage, ChatOutcome, ChatRequest, LlmClient, ToolChoice};
use crate::remote::{ToolDescriptor, ToolExecutor};
use crate::resolver::EntityResolver;
use crate::store::ConversationState;

const RESULT_SUMMARY_CHARS: usize = 200;

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Success { data: Value },
    Failure { error: String },
}

#[derive(Debug)]
pub struct ToolInvocation {
    pub records: Vec<ToolCallRecord>,
    pub outcome: Outcome,
}

pub struct ToolGateway {
    llm: Arc<dyn LlmClient>,
    executor: Arc<dyn ToolExecutor>,
    registry: HandlerRegistry,
    resolver: Arc<EntityResolver>,
    available_tools: Vec<ToolDescriptor>,
}

impl ToolGateway {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        executor: Arc<dyn ToolExecutor>,
        resolver: Arc<EntityResolver>,
        available_tools: Vec<ToolDescriptor>,
    ) -> Self {
        Self { llm, executor, registry: HandlerRegistry::default(), resolver, available_tools }
    }

    pub fn available_tool_count(&self) -> usize {
        self.available_tools.len()
    }

    pub async fn invoke(
        &self,
        domain: CapabilityDomain,
        message: &str,
        state: &mut ConversationState,
    ) -> ToolInvocation {
        let handler = self.registry.get(domain);
        let tools = handler.enabled_tools(&self.available_tools);
        let tool_choice = handler.tool_choice(tools.len());

        info!(
            event_name = "gateway.invoke",
            domain = %domain,
            handler = handler.name,
            offered_tools = tools.len(),
            "invoking capability handler"
        );

        let request = ChatRequest {
            messages: vec![
                ChatMessage::system(handler.system_prompt.clone()),
                ChatMessage::user(message),
            ],
            tools,
            tool_choice,
        };

        let chat_outcome = match self.llm.chat(request).await {
            Ok(outcome) => outcome,
            Err(error) => {
                warn!(event_name = "gateway.model_error", domain = %domain, error = %error, "model call failed");
                return ToolInvocation {
                    records: Vec::new(),
                    outcome: Outcome::Failure { error: format!("model call failed: {error}") },
                };
            }
        };

        match chat_outcome {
            ChatOutcome::Text(text) => {
                if tool_choice == ToolChoice::Required {
                    // The model answered from its own knowledge despite a
                    // mandatory tool policy. Surfacing that text would be
                    // exactly the fabricated-result failure mode this
                    // gateway exists to prevent.
                    warn!(
                        event_name = "gateway.mandatory_tool_skipped",
                        domain = %domain,
                        "model returned prose instead of a mandatory tool call"
                    );
                    return ToolInvocation {
                        records: Vec::new(),
                        outcome: Outcome::Failure {
                            error: "the model skipped mandatory tool invocation".to_string(),
                        },
                    };
                }
                ToolInvocation {
                    records: Vec::new(),
                    outcome: Outcome::Success { data: Value::String(text) },
                }
            }
            ChatOutcome::ToolCalls(calls) => self.dispatch_calls(domain, calls, state).await,
        }
    }

    async fn dispatch_calls(
        &self,
        domain: CapabilityDomain,
        calls: Vec<crate::llm::ProposedCall>,
        state: &mut ConversationState,
    ) -> ToolInvocation {
        let mut records = Vec::new();
        let mut last_data = Value::Null;
        let mut failure: Option<String> = None;
        let mut template_success = false;

        for call in calls {
            let parameters = normalize_parameters(&call.tool, call.parameters);
            let body = match self.executor.execute(&call.tool, parameters.clone()).await {
                Ok(body) => body,
                Err(error) => {
                    let message = error.to_string();
                    records.push(ToolCallRecord {
                        tool: call.tool.clone(),
                        parameters,
                        status: CallStatus::Failed,
                        result: message.clone(),
                    });
                    failure = Some(message);
                    break;
                }
            };

            match classify_response(&body) {
                Outcome::Success { data } => {
                    records.push(ToolCallRecord {
                        tool: call.tool.clone(),
                        parameters,
                        status: CallStatus::Succeeded,
                        result: summarize(&data),
                    });
                    if CapabilityDomain::Template.owns_tool(&call.tool) {
                        template_success = true;
                    }
                    last_data = data;
                }
                Outcome::Failure { error } => {
                    records.push(ToolCallRecord {
                        tool: call.tool.clone(),
                        parameters,
                        status: CallStatus::Failed,
                        result: error.clone(),
                    });
                    failure = Some(error);
                    break;
                }
            }
        }

        // The tool listing omits canonical identifiers, so a template-domain
        // success is the moment fresh name→id pairs become available.
        if template_success {
            self.resolver.refresh(state).await;
        }

        info!(
            event_name = "gateway.dispatched",
            domain = %domain,
            calls = records.len(),
            failed = failure.is_some(),
            "tool dispatch complete"
        );

        match failure {
            Some(error) => ToolInvocation { records, outcome: Outcome::Failure { error } },
            None => ToolInvocation { records, outcome: Outcome::Success { data: last_data } },
        }
    }
}

/// Signing calls may arrive with a natural-language `position` instead of
/// the field array the service expects; rewrite it using the named-slot
/// vocabulary. Anything already carrying `fields` passes through untouched.
fn normalize_parameters(tool: &str, parameters: Value) -> Value {
    if tool != "add_signature_fields" {
        return parameters;
    }
    let Some(fields) = parameters.as_object() else {
        return parameters;
    };
    if fields.contains_key("fields") {
        return parameters;
    }
    let Some(position_text) = fields.get("position").and_then(Value::as_str) else {
        return parameters;
    };
    let Some(position) = positions::parse_position(position_text) else {
        return parameters;
    };

    let page = fields.get("pageNumber").and_then(Value::as_u64).unwrap_or(1) as u32;
    let mut normalized = fields.clone();
    normalized.remove("position");
    normalized.insert(
        "fields".to_string(),
        Value::Array(vec![positions::signature_field(
            position,
            page,
            positions::FieldKind::Signature,
        )]),
    );
    Value::Object(normalized)
}

/// Normalize an automation-service response body. The structured
/// `success`/`error` fields are authoritative; only a bare string payload
/// falls through to the substring heuristic, kept as a compatibility shim
/// for pre-contract deployments.
pub fn classify_response(body: &Value) -> Outcome {
    match body.get("success").and_then(Value::as_bool) {
        Some(true) => Outcome::Success {
            data: body.get("data").cloned().unwrap_or_else(|| body.clone()),
        },
        Some(false) => Outcome::Failure {
            error: body
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("remote tool reported failure")
                .to_string(),
        },
        None => {
            if let Some(error) = body.get("error").and_then(Value::as_str) {
                return Outcome::Failure { error: error.to_string() };
            }
            match body {
                Value::String(text) => sniff_unstructured(text),
                other => Outcome::Success { data: other.clone() },
            }
        }
    }
}

fn sniff_unstructured(text: &str) -> Outcome {
    let lowered = text.to_lowercase();
    if lowered.contains("error") || lowered.contains("failed") {
        Outcome::Failure { error: text.trim().to_string() }
    } else {
        Outcome::Success { data: Value::String(text.to_string()) }
    }
}

fn summarize(data: &Value) -> String {
    let rendered = match data {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    if rendered.chars().count() <= RESULT_SUMMARY_CHARS {
        return rendered;
    }
    let mut summary: String = rendered.chars().take(RESULT_SUMMARY_CHARS).collect();
    summary.push('…');
    summary
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use scriven_core::{CallStatus, CapabilityDomain};

    use crate::llm::{ChatOutcome, ProposedCall, ToolChoice};
    use crate::resolver::EntityResolver;
    use crate::store::ConversationState;
    use crate::test_support::{ScriptedLlm, StaticExecutor, StaticSource};

    use super::{classify_response, Outcome, ToolGateway};

    fn gateway_with(
        llm: ScriptedLlm,
        executor: StaticExecutor,
        resolver: EntityResolver,
        tools: &[&str],
    ) -> ToolGateway {
        ToolGateway::new(
            Arc::new(llm),
            Arc::new(executor),
            Arc::new(resolver),
            tools.iter().map(|name| crate::remote::ToolDescriptor::named(*name)).collect(),
        )
    }

    #[test]
    fn structured_success_flag_is_authoritative() {
        let outcome =
            classify_response(&json!({"success": true, "data": {"documents": []}}));
        assert_eq!(outcome, Outcome::Success { data: json!({"documents": []}) });

        // A body that *mentions* errors but reports success stays a success:
        // the structured flag wins over any string content.
        let outcome = classify_response(
            &json!({"success": true, "data": {"note": "0 errors, 0 failed checks"}}),
        );
        assert!(matches!(outcome, Outcome::Success { .. }));
    }

    #[test]
    fn structured_failure_carries_error_field() {
        let outcome =
            classify_response(&json!({"success": false, "error": "permission denied"}));
        assert_eq!(outcome, Outcome::Failure { error: "permission denied".to_string() });
    }

    #[test]
    fn bare_error_field_without_flag_is_failure() {
        let outcome = classify_response(&json!({"error": "template not found"}));
        assert_eq!(outcome, Outcome::Failure { error: "template not found".to_string() });
    }

    #[test]
    fn unstructured_strings_fall_back_to_sniffing() {
        assert!(matches!(
            classify_response(&json!("Error: upstream timeout")),
            Outcome::Failure { .. }
        ));
        assert!(matches!(
            classify_response(&json!("3 documents uploaded")),
            Outcome::Success { .. }
        ));
    }

    #[test]
    fn unmarked_objects_classify_as_success() {
        let outcome = classify_response(&json!({"documents": [{"name": "NDA"}]}));
        assert!(matches!(outcome, Outcome::Success { .. }));
    }

    #[tokio::test]
    async fn successful_call_records_and_returns_data() {
        let llm = ScriptedLlm::with(vec![ChatOutcome::ToolCalls(vec![ProposedCall {
            tool: "list_documents".to_string(),
            parameters: json!({"limit": 50}),
        }])]);
        let executor = StaticExecutor::new().respond(
            "list_documents",
            json!({"success": true, "data": {"documents": [{"name": "NDA"}]}}),
        );
        let gateway = gateway_with(
            llm,
            executor,
            EntityResolver::disconnected(),
            &["list_documents"],
        );
        let mut state = ConversationState::default();

        let invocation =
            gateway.invoke(CapabilityDomain::Document, "List my documents", &mut state).await;

        assert_eq!(invocation.records.len(), 1);
        assert_eq!(invocation.records[0].status, CallStatus::Succeeded);
        assert_eq!(
            invocation.outcome,
            Outcome::Success { data: json!({"documents": [{"name": "NDA"}]}) }
        );
    }

    #[tokio::test]
    async fn failed_call_records_failure_and_surfaces_error() {
        let llm = ScriptedLlm::with(vec![ChatOutcome::ToolCalls(vec![ProposedCall {
            tool: "use_template".to_string(),
            parameters: json!({"templateId": "11111111-1111-1111-1111-111111111111"}),
        }])]);
        let executor = StaticExecutor::new()
            .respond("use_template", json!({"success": false, "error": "permission denied"}));
        let gateway =
            gateway_with(llm, executor, EntityResolver::disconnected(), &["use_template"]);
        let mut state = ConversationState::default();

        let invocation =
            gateway.invoke(CapabilityDomain::Template, "use the template", &mut state).await;

        assert_eq!(invocation.records.len(), 1);
        assert_eq!(invocation.records[0].status, CallStatus::Failed);
        assert_eq!(
            invocation.outcome,
            Outcome::Failure { error: "permission denied".to_string() }
        );
    }

    #[tokio::test]
    async fn prose_in_place_of_mandatory_tool_call_is_a_failure() {
        let llm = ScriptedLlm::with(vec![ChatOutcome::Text(
            "I listed your documents: report.pdf, contract.pdf".to_string(),
        )]);
        let executor = StaticExecutor::new();
        let gateway = gateway_with(
            llm,
            executor,
            EntityResolver::disconnected(),
            &["list_documents"],
        );
        let mut state = ConversationState::default();

        let invocation =
            gateway.invoke(CapabilityDomain::Document, "List my documents", &mut state).await;

        assert!(invocation.records.is_empty(), "no call was dispatched, so no record exists");
        assert!(matches!(invocation.outcome, Outcome::Failure { .. }));
    }

    #[tokio::test]
    async fn admin_prose_passes_through_as_success() {
        let llm = ScriptedLlm::with(vec![ChatOutcome::Text("You are signed in.".to_string())]);
        let gateway = gateway_with(
            llm,
            StaticExecutor::new(),
            EntityResolver::disconnected(),
            &["list_documents"],
        );
        let mut state = ConversationState::default();

        let invocation = gateway.invoke(CapabilityDomain::Admin, "who am i", &mut state).await;

        assert_eq!(
            invocation.outcome,
            Outcome::Success { data: json!("You are signed in.") }
        );
    }

    #[tokio::test]
    async fn template_success_triggers_entity_refresh() {
        let llm = ScriptedLlm::with(vec![ChatOutcome::ToolCalls(vec![ProposedCall {
            tool: "list_templates".to_string(),
            parameters: json!({}),
        }])]);
        let executor = StaticExecutor::new().respond(
            "list_templates",
            json!({"success": true, "data": {"templates": [{"name": "Employment Contract"}]}}),
        );
        let resolver = EntityResolver::new(Arc::new(StaticSource::with(&[(
            "Employment Contract",
            "11111111-1111-1111-1111-111111111111",
        )])));
        let gateway = gateway_with(llm, executor, resolver, &["list_templates"]);
        let mut state = ConversationState::default();

        gateway.invoke(CapabilityDomain::Template, "show my templates", &mut state).await;

        assert_eq!(
            state.entities.get("Employment Contract"),
            Some("11111111-1111-1111-1111-111111111111")
        );
    }

    #[tokio::test]
    async fn document_success_does_not_refresh_entities() {
        let llm = ScriptedLlm::with(vec![ChatOutcome::ToolCalls(vec![ProposedCall {
            tool: "list_documents".to_string(),
            parameters: json!({}),
        }])]);
        let executor = StaticExecutor::new()
            .respond("list_documents", json!({"success": true, "data": {"documents": []}}));
        let resolver = EntityResolver::new(Arc::new(StaticSource::with(&[(
            "Employment Contract",
            "11111111-1111-1111-1111-111111111111",
        )])));
        let gateway = gateway_with(llm, executor, resolver, &["list_documents"]);
        let mut state = ConversationState::default();

        gateway.invoke(CapabilityDomain::Document, "list documents", &mut state).await;

        assert!(state.entities.is_empty());
    }

    #[tokio::test]
    async fn natural_language_position_normalizes_to_a_field_array() {
        let llm = ScriptedLlm::with(vec![ChatOutcome::ToolCalls(vec![ProposedCall {
            tool: "add_signature_fields".to_string(),
            parameters: json!({
                "documentId": "d-4",
                "position": "bottom right corner",
                "pageNumber": 2,
            }),
        }])]);
        let executor = StaticExecutor::new()
            .respond("add_signature_fields", json!({"success": true, "data": {"added": 1}}));
        let calls = executor.calls();
        let gateway = gateway_with(
            llm,
            executor,
            EntityResolver::disconnected(),
            &["add_signature_fields"],
        );
        let mut state = ConversationState::default();

        gateway
            .invoke(CapabilityDomain::Signing, "sign bottom right of page 2", &mut state)
            .await;

        let dispatched = calls.lock().expect("calls lock");
        let parameters = &dispatched[0].1;
        assert!(parameters.get("position").is_none());
        assert_eq!(parameters["fields"][0]["x"], 350);
        assert_eq!(parameters["fields"][0]["y"], 650);
        assert_eq!(parameters["fields"][0]["pageNumber"], 2);
        assert_eq!(parameters["documentId"], "d-4");
    }

    #[tokio::test]
    async fn transport_error_becomes_failed_record_and_failure_outcome() {
        let llm = ScriptedLlm::with(vec![ChatOutcome::ToolCalls(vec![ProposedCall {
            tool: "list_documents".to_string(),
            parameters: json!({}),
        }])]);
        let executor = StaticExecutor::unreachable();
        let gateway = gateway_with(
            llm,
            executor,
            EntityResolver::disconnected(),
            &["list_documents"],
        );
        let mut state = ConversationState::default();

        let invocation =
            gateway.invoke(CapabilityDomain::Document, "list documents", &mut state).await;

        assert_eq!(invocation.records.len(), 1);
        assert_eq!(invocation.records[0].status, CallStatus::Failed);
        assert!(matches!(invocation.outcome, Outcome::Failure { .. }));
    }

    #[tokio::test]
    async fn offered_tools_carry_required_choice_to_the_model() {
        let llm = ScriptedLlm::with(vec![ChatOutcome::ToolCalls(vec![ProposedCall {
            tool: "list_documents".to_string(),
            parameters: json!({}),
        }])]);
        let requests = llm.requests();
        let executor = StaticExecutor::new()
            .respond("list_documents", json!({"success": true, "data": []}));
        let gateway = gateway_with(
            llm,
            executor,
            EntityResolver::disconnected(),
            &["list_documents", "use_template"],
        );
        let mut state = ConversationState::default();

        gateway.invoke(CapabilityDomain::Document, "list documents", &mut state).await;

        let seen = requests.lock().expect("requests lock");
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].tool_choice, ToolChoice::Required);
        assert_eq!(seen[0].tools.len(), 1, "only the domain's tool subset is offered");
    }
}
