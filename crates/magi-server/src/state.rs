//! Application State

use std::sync::Arc;

use magi_core::{AdvisorConfig, AnalysisBackend, MemorySessionStore, SessionId, SharedSession};

use crate::error::{ApiError, ApiResult};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Extractor configuration (credential presence is reported by /health)
    pub advisor: AdvisorConfig,

    /// Live sessions keyed by ID
    pub sessions: Arc<MemorySessionStore>,

    /// Local decision engine or remote pipeline
    pub analysis: Arc<dyn AnalysisBackend>,
}

impl AppState {
    pub async fn session(&self, id: &str) -> ApiResult<SharedSession> {
        self.sessions
            .get(&SessionId::from_string(id))
            .await
            .ok_or_else(|| ApiError::SessionNotFound(id.to_string()))
    }
}
