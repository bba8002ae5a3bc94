//! # magi-core
//!
//! Persona schema, persona-extraction protocol and the conversation state
//! machines behind the MagiStock advisor.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Session                             │
//! │  ┌──────────────────────┐        ┌────────────────────────┐  │
//! │  │ConversationController│───────▶│    PersonaExtractor    │  │
//! │  │  (chat history, FSM) │        │  (extract_persona tool)│  │
//! │  └──────────────────────┘        └───────────┬────────────┘  │
//! │  ┌──────────────────────┐                    │               │
//! │  │  Workflow FSM        │        ┌───────────▼────────────┐  │
//! │  │  chat → summary →    │        │      LlmProvider       │  │
//! │  │  analyzing → results │        │      (Strategy)        │  │
//! │  └──────────┬───────────┘        └────────────────────────┘  │
//! │             │ AnalysisBackend (local judge or remote)        │
//! └─────────────┴────────────────────────────────────────────────┘
//! ```
//!
//! The `LlmProvider` and `AnalysisBackend` traits are the substitution points:
//! tests inject fakes, the server injects network-backed implementations.

pub mod analysis;
pub mod config;
pub mod conversation;
pub mod error;
pub mod extractor;
pub mod message;
pub mod persona;
pub mod provider;
pub mod session;
pub mod tool;
pub mod workflow;

pub use analysis::{
    AnalysisBackend, AnalysisResult, Archetype, BacktestMetrics, Critique, Decision,
    StrategyResult, Strategies, DEFAULT_PERIOD_DAYS,
};
pub use config::AdvisorConfig;
pub use conversation::{
    ConversationController, ConversationState, ProfileReady, STARTER_PROMPTS, StarterPrompt, Turn,
    quick_replies_for,
};
pub use error::{AdvisorError, Result};
pub use extractor::{EXTRACT_PERSONA, Exchange, PersonaExtractor};
pub use message::{Message, Role};
pub use persona::{
    DrawdownSensitivity, ExtractionResult, Profile, ProfileLabels, RiskTolerance, TimeHorizon,
    DEFAULT_TICKER,
};
pub use provider::LlmProvider;
pub use session::{MemorySessionStore, Session, SessionId, SessionSnapshot, SharedSession};
pub use tool::{ToolCall, ToolSchema};
pub use workflow::{Workflow, WorkflowEvent, WorkflowState};
