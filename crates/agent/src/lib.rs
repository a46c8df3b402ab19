//! Orchestration runtime - routing, enforced tool execution, reflection
//!
//! This crate is the asynchronous half of the scriven engine:
//! - **Routing** (`scriven-core`'s rule table) picks one capability handler
//!   per message.
//! - **Tool gating** (`gateway`) makes tool invocation mandatory wherever a
//!   handler has tools, so the model can never narrate a result it did not
//!   fetch from the automation service.
//! - **Entity resolution** (`resolver`, `backend`) keeps a per-conversation
//!   cache of friendly names to canonical identifiers and rewrites messages
//!   before dispatch.
//! - **Reflection** (`reflection`) turns raw tool output into
//!   language-matched user-facing text; failures bypass it.
//! - **Conversation state** (`store`, `runtime`) serializes turns per
//!   conversation and appends history atomically.
//!
//! # Safety principle
//!
//! The model is strictly a translator. It proposes calls and rewrites
//! results; every state-changing decision is executed and validated by the
//! remote automation service.

pub mod backend;
pub mod gateway;
pub mod handlers;
pub mod llm;
pub mod reflection;
pub mod remote;
pub mod resolver;
pub mod runtime;
pub mod store;

#[cfg(test)]
mod test_support;

pub use gateway::{Outcome, ToolGateway};
pub use runtime::{AttachedFile, ChatInbound, ChatOutbound, Orchestrator};
