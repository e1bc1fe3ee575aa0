//! Application state shared by all request handlers.

use crate::catalog::Catalog;
use crate::mcp::{McpHandler, SessionPolicy, SessionRegistry};
use std::sync::Arc;

/// Shared application state.
///
/// Cheap to clone; every clone refers to the same catalog and registry.
#[derive(Clone)]
pub struct AppState {
    catalog: Arc<Catalog>,
    sessions: SessionRegistry,
    policy: SessionPolicy,
}

impl AppState {
    /// Create state with a fresh session registry.
    pub fn new(catalog: Catalog, policy: SessionPolicy) -> Self {
        Self::with_registry(catalog, policy, SessionRegistry::new())
    }

    /// Create state around an existing registry.
    pub fn with_registry(
        catalog: Catalog,
        policy: SessionPolicy,
        sessions: SessionRegistry,
    ) -> Self {
        Self {
            catalog: Arc::new(catalog),
            sessions,
            policy,
        }
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Build a dispatcher for a new session.
    pub fn new_handler(&self) -> McpHandler {
        McpHandler::new(self.catalog.clone(), self.policy)
    }
}
