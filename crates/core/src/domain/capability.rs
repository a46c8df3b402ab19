use serde::{Deserialize, Serialize};

/// Closed set of task categories. Every request resolves to exactly one
/// domain; `Admin` doubles as the fallback for unclassified messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CapabilityDomain {
    Document,
    Signing,
    Template,
    Contact,
    Admin,
}

pub const ALL_DOMAINS: [CapabilityDomain; 5] = [
    CapabilityDomain::Document,
    CapabilityDomain::Signing,
    CapabilityDomain::Template,
    CapabilityDomain::Contact,
    CapabilityDomain::Admin,
];

impl CapabilityDomain {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::Signing => "signing",
            Self::Template => "template",
            Self::Contact => "contact",
            Self::Admin => "admin",
        }
    }

    /// Remote tool subset enabled for this domain. `Admin` intentionally
    /// owns none: authentication tools are driven by bootstrap, never
    /// offered to the model.
    pub fn owns_tool(self, tool: &str) -> bool {
        match self {
            Self::Document => {
                matches!(tool, "list_documents" | "upload_document" | "get_document_info")
            }
            Self::Signing => {
                matches!(tool, "create_self_sign" | "add_signature_fields" | "complete_signing")
            }
            Self::Template => matches!(tool, "list_templates" | "create_template" | "use_template"),
            Self::Contact => matches!(tool, "list_contacts" | "add_contact"),
            Self::Admin => false,
        }
    }
}

impl std::fmt::Display for CapabilityDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
