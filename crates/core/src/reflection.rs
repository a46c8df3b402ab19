//! Deterministic digest rendering of raw tool output.
//!
//! This is the fallback/test implementation of the presenter capability:
//! it turns machine-shaped results into bullet or numbered text, never
//! letting raw dict-like content reach the user. The production presenter
//! may call a model instead, but both obey the same rules: at most
//! [`MAX_LISTED_ITEMS`] items with a localized "+N more" marker, missing
//! status fields defaulting to a positive label, and a short "what next"
//! suggestion list per domain.

use serde_json::Value;

use crate::domain::capability::CapabilityDomain;
use crate::language::Script;

pub const MAX_LISTED_ITEMS: usize = 10;

/// Keys tried, in order, when picking a display label for a list item.
const LABEL_KEYS: &[&str] =
    &["name", "title", "documentName", "templateName", "fileName", "email", "id"];

pub fn render_digest(raw: &Value, script: Script, domain: CapabilityDomain) -> String {
    let mut lines = Vec::new();

    match raw {
        Value::Array(items) => render_items(items, script, &mut lines),
        Value::Object(fields) => {
            if let Some(items) = first_array_field(raw) {
                render_items(items, script, &mut lines);
            } else {
                for (key, value) in fields.iter().filter(|(_, value)| is_scalar(value)) {
                    if lines.len() == MAX_LISTED_ITEMS {
                        break;
                    }
                    lines.push(format!("• {}: {}", humanize_key(key), scalar_text(value, script)));
                }
                if lines.is_empty() {
                    lines.push(done_line(script).to_string());
                }
            }
        }
        Value::String(text) if !text.trim().is_empty() => lines.push(text.trim().to_string()),
        _ => lines.push(done_line(script).to_string()),
    }

    lines.push(String::new());
    lines.push(script.what_next_header().to_string());
    for suggestion in suggestions(domain, script) {
        lines.push(format!("• {suggestion}"));
    }

    lines.join("\n")
}

fn render_items(items: &[Value], script: Script, lines: &mut Vec<String>) {
    if items.is_empty() {
        lines.push(done_line(script).to_string());
        return;
    }

    for (index, item) in items.iter().take(MAX_LISTED_ITEMS).enumerate() {
        let label = item_label(item, script);
        let status = item_status(item, script);
        match status {
            Some(status) => lines.push(format!("{}. {label} — {status}", index + 1)),
            None => lines.push(format!("{}. {label}", index + 1)),
        }
    }

    if items.len() > MAX_LISTED_ITEMS {
        lines.push(script.more_marker(items.len() - MAX_LISTED_ITEMS));
    }
}

fn item_label(item: &Value, script: Script) -> String {
    match item {
        Value::Object(fields) => {
            for key in LABEL_KEYS {
                if let Some(label) = fields.get(*key).and_then(Value::as_str) {
                    if !label.trim().is_empty() {
                        return label.trim().to_string();
                    }
                }
            }
            fields
                .values()
                .find_map(|value| value.as_str())
                .map(|label| label.trim().to_string())
                .unwrap_or_else(|| unnamed_label(script).to_string())
        }
        Value::String(text) => text.trim().to_string(),
        other if is_scalar(other) => scalar_text(other, script),
        _ => unnamed_label(script).to_string(),
    }
}

/// Only the `status` field is documented as safe to default; other absent
/// fields stay absent.
fn item_status(item: &Value, script: Script) -> Option<String> {
    let fields = item.as_object()?;
    if !fields.contains_key("status") {
        return None;
    }
    match fields.get("status") {
        Some(Value::String(status)) if !status.trim().is_empty() => {
            Some(humanize_key(status.trim()))
        }
        _ => Some(script.default_status_label().to_string()),
    }
}

fn first_array_field(raw: &Value) -> Option<&Vec<Value>> {
    raw.as_object()?.values().find_map(Value::as_array).filter(|items| !items.is_empty())
}

fn is_scalar(value: &Value) -> bool {
    matches!(value, Value::String(_) | Value::Number(_) | Value::Bool(_))
}

fn scalar_text(value: &Value, script: Script) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(true) => yes_label(script).to_string(),
        Value::Bool(false) => no_label(script).to_string(),
        _ => String::new(),
    }
}

/// De-jargonize a machine key or enum value: `documentCollectionId` →
/// "Document collection id", `in_progress` → "In progress".
fn humanize_key(key: &str) -> String {
    let mut spaced = String::with_capacity(key.len() + 4);
    let mut previous_lower = false;
    for ch in key.chars() {
        if ch == '_' || ch == '-' {
            spaced.push(' ');
            previous_lower = false;
            continue;
        }
        if ch.is_uppercase() && previous_lower {
            spaced.push(' ');
        }
        previous_lower = ch.is_lowercase() || ch.is_ascii_digit();
        spaced.extend(ch.to_lowercase());
    }

    let mut chars = spaced.trim().chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

fn done_line(script: Script) -> &'static str {
    match script {
        Script::Latin => "Done — the operation completed successfully.",
        Script::Hebrew => "בוצע — הפעולה הושלמה בהצלחה.",
    }
}

fn unnamed_label(script: Script) -> &'static str {
    match script {
        Script::Latin => "(unnamed)",
        Script::Hebrew => "(ללא שם)",
    }
}

fn yes_label(script: Script) -> &'static str {
    match script {
        Script::Latin => "yes",
        Script::Hebrew => "כן",
    }
}

fn no_label(script: Script) -> &'static str {
    match script {
        Script::Latin => "no",
        Script::Hebrew => "לא",
    }
}

pub fn suggestions(domain: CapabilityDomain, script: Script) -> &'static [&'static str] {
    match (domain, script) {
        (CapabilityDomain::Document, Script::Latin) => &[
            "Upload a new document",
            "Open a document's details",
            "Send a document for signing",
        ],
        (CapabilityDomain::Document, Script::Hebrew) => {
            &["העלו מסמך חדש", "פתחו את פרטי המסמך", "שלחו מסמך לחתימה"]
        }
        (CapabilityDomain::Signing, Script::Latin) => &[
            "Add signature fields",
            "Complete the signing process",
            "Download the signed copy",
        ],
        (CapabilityDomain::Signing, Script::Hebrew) => {
            &["הוסיפו שדות חתימה", "השלימו את תהליך החתימה", "הורידו את העותק החתום"]
        }
        (CapabilityDomain::Template, Script::Latin) => &[
            "Create a document from a template",
            "Create a new template",
            "List your templates",
        ],
        (CapabilityDomain::Template, Script::Hebrew) => {
            &["צרו מסמך מתבנית", "צרו תבנית חדשה", "הציגו את התבניות שלכם"]
        }
        (CapabilityDomain::Contact, Script::Latin) => {
            &["Add a new contact", "Send a document to a contact"]
        }
        (CapabilityDomain::Contact, Script::Hebrew) => {
            &["הוסיפו איש קשר חדש", "שלחו מסמך לאיש קשר"]
        }
        (CapabilityDomain::Admin, Script::Latin) => {
            &["Check your account details", "Ask for help with a task"]
        }
        (CapabilityDomain::Admin, Script::Hebrew) => {
            &["בדקו את פרטי החשבון", "בקשו עזרה במשימה"]
        }
    }
}
