//! Session Management
//!
//! A session pairs one persona conversation with the workflow that consumes
//! its profile.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use crate::analysis::{AnalysisBackend, AnalysisResult, DEFAULT_PERIOD_DAYS};
use crate::conversation::{ConversationController, ConversationState, Turn};
use crate::error::{AdvisorError, Result};
use crate::extractor::PersonaExtractor;
use crate::message::Message;
use crate::workflow::{StepProgress, Workflow, WorkflowState};

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Serializable view of a session
#[derive(Clone, Debug, Serialize)]
pub struct SessionSnapshot {
    pub id: SessionId,
    pub state: WorkflowState,
    pub conversation: ConversationState,
    pub history: Vec<Message>,
    pub quick_replies: Vec<&'static str>,
    pub progress: [StepProgress; 4],
    pub workflow: Workflow,
    pub updated_at: DateTime<Utc>,
}

/// One user's advisor session
pub struct Session {
    /// Unique identifier
    pub id: SessionId,

    conversation: ConversationController,
    workflow: Workflow,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session
    pub fn new(extractor: Arc<PersonaExtractor>) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            conversation: ConversationController::new(extractor),
            workflow: Workflow::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Update the activity timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub const fn conversation(&self) -> &ConversationController {
        &self.conversation
    }

    pub const fn workflow(&self) -> &Workflow {
        &self.workflow
    }

    /// Send a chat message, starting the conversation on first use
    pub async fn send(&mut self, text: &str) -> Result<Turn> {
        if self.workflow.state() != WorkflowState::Chat {
            return Err(AdvisorError::Session(
                "chat is closed; edit or reset the profile first".into(),
            ));
        }
        self.touch();

        let turn = match self.conversation.state() {
            ConversationState::NotStarted => self.conversation.start(text).await?,
            _ => self.conversation.respond(text).await?,
        };

        if let Turn::ProfileReady(ready) = &turn {
            self.workflow.profile_ready(ready)?;
        }
        Ok(turn)
    }

    /// Retry the last failed chat turn
    pub async fn retry(&mut self) -> Result<Turn> {
        self.touch();
        let turn = self.conversation.retry().await?;
        if let Turn::ProfileReady(ready) = &turn {
            self.workflow.profile_ready(ready)?;
        }
        Ok(turn)
    }

    /// Confirm the profile and run the analysis through `backend`.
    ///
    /// On failure the workflow falls back to the summary and the error is
    /// returned unchanged. Dropping the future mid-analysis has the same
    /// effect.
    pub async fn confirm(&mut self, backend: &dyn AnalysisBackend) -> Result<&AnalysisResult> {
        self.touch();
        let (persona, ticker) = self.workflow.confirm()?;
        tracing::info!(session = %self.id, backend = backend.name(), ticker = %ticker, "Running analysis");

        let pending = PendingAnalysis::new(&mut self.workflow, &self.id);
        let outcome = backend.run_analysis(&persona, &ticker, DEFAULT_PERIOD_DAYS).await;
        pending.settle(outcome)?;

        self.workflow
            .result()
            .ok_or_else(|| AdvisorError::Other("analysis result missing".into()))
    }

    /// Back to the chat with a fresh conversation
    pub fn edit(&mut self) -> Result<()> {
        self.workflow.edit()?;
        self.conversation.reset();
        self.touch();
        Ok(())
    }

    /// Start over
    pub fn reset(&mut self) {
        self.workflow.reset();
        self.conversation.reset();
        self.touch();
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id.clone(),
            state: self.workflow.state(),
            conversation: self.conversation.state(),
            history: self.conversation.history().to_vec(),
            quick_replies: self.conversation.quick_replies(),
            progress: self.workflow.progress(),
            workflow: self.workflow.clone(),
            updated_at: self.updated_at,
        }
    }
}

/// Workflow sitting in `Analyzing`; rolls back to the summary unless settled
struct PendingAnalysis<'a> {
    workflow: &'a mut Workflow,
    session: &'a SessionId,
    settled: bool,
}

impl<'a> PendingAnalysis<'a> {
    const fn new(workflow: &'a mut Workflow, session: &'a SessionId) -> Self {
        Self {
            workflow,
            session,
            settled: false,
        }
    }

    fn settle(mut self, outcome: Result<AnalysisResult>) -> Result<()> {
        self.settled = true;
        match outcome {
            Ok(result) => self.workflow.analysis_succeeded(result),
            Err(e) => {
                tracing::warn!(session = %self.session, error = %e, "Analysis failed");
                self.workflow.analysis_failed(&e)?;
                Err(e)
            }
        }
    }
}

impl Drop for PendingAnalysis<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        tracing::warn!(session = %self.session, "Analysis abandoned before completion");
        let cancelled = AdvisorError::Other("analysis was cancelled".into());
        if let Err(e) = self.workflow.analysis_failed(&cancelled) {
            tracing::error!(session = %self.session, error = %e, "Workflow rollback failed");
        }
    }
}

/// Shared handle; the mutex serializes turns on one session
pub type SharedSession = Arc<Mutex<Session>>;

/// In-memory session store
pub struct MemorySessionStore {
    extractor: Arc<PersonaExtractor>,
    sessions: RwLock<HashMap<SessionId, SharedSession>>,
}

impl MemorySessionStore {
    pub fn new(extractor: Arc<PersonaExtractor>) -> Self {
        Self {
            extractor,
            sessions: RwLock::new(HashMap::new()),
        }
    }

    /// Create and register a new session
    pub async fn create(&self) -> (SessionId, SharedSession) {
        let session = Session::new(self.extractor.clone());
        let id = session.id.clone();
        let shared = Arc::new(Mutex::new(session));
        self.sessions.write().await.insert(id.clone(), shared.clone());
        (id, shared)
    }

    /// Look up a session by ID
    pub async fn get(&self, id: &SessionId) -> Option<SharedSession> {
        self.sessions.read().await.get(id).cloned()
    }

    /// Delete a session
    pub async fn remove(&self, id: &SessionId) -> bool {
        self.sessions.write().await.remove(id).is_some()
    }

    /// Drop sessions idle for longer than `max_idle`; returns how many went
    pub async fn sweep_idle(&self, max_idle: Duration) -> usize {
        let now = Utc::now();
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|id, shared| {
            // locked sessions are mid-turn
            let Ok(session) = shared.try_lock() else {
                return true;
            };
            let expired = (now - session.updated_at)
                .to_std()
                .is_ok_and(|idle| idle > max_idle);
            if expired {
                tracing::debug!(session = %id, "Expiring idle session");
            }
            !expired
        });
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
