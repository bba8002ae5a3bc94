//! Advisor Workflow
//!
//! The caller-side finite state machine: chat, profile summary, analysis,
//! results. Transitions come from a fixed table; anything else is rejected.

use serde::Serialize;

use crate::analysis::AnalysisResult;
use crate::conversation::ProfileReady;
use crate::error::{AdvisorError, Result};
use crate::persona::{DEFAULT_TICKER, Profile};

/// Workflow state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowState {
    Chat,
    Summary,
    Analyzing,
    Results,
}

impl WorkflowState {
    pub const ALL: [Self; 4] = [Self::Chat, Self::Summary, Self::Analyzing, Self::Results];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Chat => "chat",
            Self::Summary => "summary",
            Self::Analyzing => "analyzing",
            Self::Results => "results",
        }
    }

    const fn ordinal(self) -> usize {
        match self {
            Self::Chat => 0,
            Self::Summary => 1,
            Self::Analyzing => 2,
            Self::Results => 3,
        }
    }
}

/// Workflow events
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowEvent {
    ProfileReady,
    Confirm,
    Edit,
    AnalysisSucceeded,
    AnalysisFailed,
    Reset,
}

impl WorkflowEvent {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ProfileReady => "profile_ready",
            Self::Confirm => "confirm",
            Self::Edit => "edit",
            Self::AnalysisSucceeded => "analysis_succeeded",
            Self::AnalysisFailed => "analysis_failed",
            Self::Reset => "reset",
        }
    }
}

/// Transition table. `None` means the event is not allowed.
pub const fn next_state(from: WorkflowState, event: WorkflowEvent) -> Option<WorkflowState> {
    use WorkflowEvent as E;
    use WorkflowState as S;

    match (from, event) {
        (_, E::Reset) => Some(S::Chat),
        (S::Chat, E::ProfileReady) => Some(S::Summary),
        (S::Summary, E::Confirm) => Some(S::Analyzing),
        (S::Summary, E::Edit) => Some(S::Chat),
        (S::Analyzing, E::AnalysisSucceeded) => Some(S::Results),
        (S::Analyzing, E::AnalysisFailed) => Some(S::Summary),
        _ => None,
    }
}

/// Per-step indicator flags for the four-step progress bar
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct StepProgress {
    pub state: WorkflowState,
    pub active: bool,
    pub done: bool,
}

/// Workflow state plus the data collected along the way
#[derive(Clone, Debug, Serialize)]
pub struct Workflow {
    state: WorkflowState,
    persona: Option<Profile>,
    summary: String,
    ticker: String,
    result: Option<AnalysisResult>,
    error: Option<String>,
}

impl Default for Workflow {
    fn default() -> Self {
        Self::new()
    }
}

impl Workflow {
    pub fn new() -> Self {
        Self {
            state: WorkflowState::Chat,
            persona: None,
            summary: String::new(),
            ticker: DEFAULT_TICKER.into(),
            result: None,
            error: None,
        }
    }

    pub const fn state(&self) -> WorkflowState {
        self.state
    }

    pub const fn persona(&self) -> Option<&Profile> {
        self.persona.as_ref()
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub const fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    fn apply(&mut self, event: WorkflowEvent) -> Result<WorkflowState> {
        let next = next_state(self.state, event).ok_or_else(|| AdvisorError::InvalidTransition {
            from: self.state.as_str().into(),
            event: event.as_str().into(),
        })?;
        tracing::debug!(from = self.state.as_str(), event = event.as_str(), to = next.as_str(), "Workflow transition");
        self.state = next;
        Ok(next)
    }

    /// Chat produced a profile
    pub fn profile_ready(&mut self, ready: &ProfileReady) -> Result<()> {
        self.apply(WorkflowEvent::ProfileReady)?;
        self.persona = Some(ready.profile);
        self.summary = ready.summary.clone();
        self.ticker = ready.ticker.clone();
        self.error = None;
        Ok(())
    }

    /// User confirmed the profile; returns what the analysis needs
    pub fn confirm(&mut self) -> Result<(Profile, String)> {
        let persona = self.persona.ok_or_else(|| AdvisorError::InvalidTransition {
            from: self.state.as_str().into(),
            event: WorkflowEvent::Confirm.as_str().into(),
        })?;
        self.apply(WorkflowEvent::Confirm)?;
        self.error = None;
        Ok((persona, self.ticker.clone()))
    }

    /// Analysis finished
    pub fn analysis_succeeded(&mut self, result: AnalysisResult) -> Result<()> {
        self.apply(WorkflowEvent::AnalysisSucceeded)?;
        self.result = Some(result);
        Ok(())
    }

    /// Analysis failed: fall back to the summary, keeping no partial result
    pub fn analysis_failed(&mut self, error: &AdvisorError) -> Result<()> {
        self.apply(WorkflowEvent::AnalysisFailed)?;
        self.result = None;
        self.error = Some(error.user_message());
        Ok(())
    }

    /// Go back to the chat to refine the profile
    pub fn edit(&mut self) -> Result<()> {
        self.apply(WorkflowEvent::Edit)?;
        Ok(())
    }

    /// Start over, clearing everything
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// Indicator flags for each of the four steps
    pub fn progress(&self) -> [StepProgress; 4] {
        let current = self.state.ordinal();
        WorkflowState::ALL.map(|state| StepProgress {
            state,
            active: state.ordinal() == current,
            done: state.ordinal() < current,
        })
    }
}
