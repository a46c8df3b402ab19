//! Message classification over an ordered rule table.
//!
//! Evaluation order is the contract: several keyword sets overlap in
//! practice ("use template to sign" matches both signing and template), so
//! the first matching rule wins and the table order below is the documented
//! precedence: contact > signing > template > admin keywords > document,
//! with `admin` as the always-matching default.

use crate::domain::capability::CapabilityDomain;

pub struct RouteRule {
    pub domain: CapabilityDomain,
    pub keywords: &'static [&'static str],
}

/// Latin keywords are matched against the lowercased message; Hebrew
/// keywords are exact substrings (lowercasing is the identity for them).
pub const ROUTE_RULES: &[RouteRule] = &[
    RouteRule {
        domain: CapabilityDomain::Contact,
        keywords: &["contact", "contacts", "recipient", "recipients", "איש קשר", "אנשי קשר", "נמען"],
    },
    RouteRule {
        domain: CapabilityDomain::Signing,
        keywords: &["sign", "signature", "signing", "חתימה", "חתימות", "לחתום", "חתום"],
    },
    RouteRule {
        domain: CapabilityDomain::Template,
        keywords: &["template", "templates", "תבנית", "תבניות"],
    },
    RouteRule {
        domain: CapabilityDomain::Admin,
        keywords: &["login", "log in", "logout", "password", "account", "who am i", "help", "התחבר", "התנתק", "חשבון", "עזרה"],
    },
    RouteRule {
        domain: CapabilityDomain::Document,
        keywords: &["upload", "document", "documents", "file", "pdf", "מסמך", "מסמכים", "קובץ", "העלה"],
    },
];

/// Total function: every message classifies, unmatched messages default to
/// `admin`.
pub fn classify(message: &str) -> CapabilityDomain {
    let lowered = message.to_lowercase();
    for rule in ROUTE_RULES {
        if rule.keywords.iter().any(|keyword| lowered.contains(keyword)) {
            return rule.domain;
        }
    }
    CapabilityDomain::Admin
}
