//! Entity resolver.
//!
//! Owns the flow between a conversation's name→id cache and the
//! authoritative source: substitution rewrites cached names into canonical
//! identifiers before dispatch, refresh merges fresh pairs in after a
//! template-domain success. Refresh failures are non-fatal; the prior
//! cache keeps serving.

use std::sync::Arc;

use tracing::{debug, warn};

use scriven_core::{substitution, EntityMapping};

use crate::backend::EntitySource;
use crate::store::ConversationState;

pub struct EntityResolver {
    source: Option<Arc<dyn EntitySource>>,
}

impl EntityResolver {
    pub fn new(source: Arc<dyn EntitySource>) -> Self {
        Self { source: Some(source) }
    }

    /// Resolver without an authoritative source: substitution still works
    /// over whatever the cache holds, refreshes are no-ops.
    pub fn disconnected() -> Self {
        Self { source: None }
    }

    pub fn substitute(&self, message: &str, state: &ConversationState) -> String {
        substitution::substitute(message, &state.entities)
    }

    /// Merge fresh (name, id) pairs into the conversation cache. Returns
    /// the pairs fetched this round; an empty mapping on any failure.
    pub async fn refresh(&self, state: &mut ConversationState) -> EntityMapping {
        let Some(source) = &self.source else {
            debug!("entity refresh skipped: no authoritative source configured");
            return EntityMapping::new();
        };

        match source.fetch_entities().await {
            Ok(records) => {
                let fetched: EntityMapping =
                    records.into_iter().map(|record| (record.name, record.id)).collect();
                state.entities.merge(&fetched);
                debug!(fetched = fetched.len(), cached = state.entities.len(), "entity cache refreshed");
                fetched
            }
            Err(error) => {
                warn!(error = %error, "entity refresh failed; keeping prior cache");
                EntityMapping::new()
            }
        }
    }
}
