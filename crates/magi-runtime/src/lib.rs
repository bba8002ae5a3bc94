//! # magi-runtime
//!
//! Network collaborators for the MagiStock core.
//!
//! ## Providers
//!
//! - **OpenAI** (default): chat completions with function calling, against
//!   `api.openai.com` or any compatible gateway (`OPENAI_BASE_URL`)
//! - **Remote analysis**: the multi-agent analysis pipeline reached over HTTP
//!
//! ## Usage
//!
//! ```rust,ignore
//! use magi_runtime::OpenAiProvider;
//!
//! let config = AdvisorConfig::from_env();
//! let provider = OpenAiProvider::from_config(config.clone())?;
//! let extractor = PersonaExtractor::new(Arc::new(provider), config);
//! ```

#[cfg(feature = "openai")]
pub mod openai;
pub mod remote;

#[cfg(feature = "openai")]
pub use openai::OpenAiProvider;
pub use remote::RemoteAnalysis;

// Re-export core types for convenience
pub use magi_core::{
    AdvisorConfig, AdvisorError, AnalysisBackend, LlmProvider, Message, PersonaExtractor, Result,
    Role,
};
