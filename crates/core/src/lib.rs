//! Deterministic core of the scriven orchestration engine.
//!
//! Everything in this crate is pure and I/O-free: domain types, the routing
//! rule table, script detection, entity-name substitution, and the digest
//! renderer. Network calls, locking, and model access live in
//! `scriven-agent`; this crate stays independently unit-testable.

pub mod config;
pub mod domain;
pub mod language;
pub mod positions;
pub mod reflection;
pub mod router;
pub mod substitution;

pub use domain::capability::CapabilityDomain;
pub use domain::conversation::{CallStatus, ToolCallRecord, Turn, TurnRole};
pub use domain::entity::{is_canonical_id, EntityMapping};
pub use language::{detect_script, Script};
pub use router::classify;
