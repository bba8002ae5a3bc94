//! LLM Provider Strategy Pattern
//!
//! Defines a common interface for chat-completion backends so the extractor
//! works with OpenAI, a compatible gateway, or a scripted fake in tests.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use magi_core::provider::{CompletionRequest, LlmProvider};
//!
//! let provider = OpenAiProvider::from_config(config);
//! let completion = provider.complete(&request).await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::Message;
use crate::tool::{ToolCall, ToolChoice, ToolSchema};

/// Configuration for LLM generation
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Model identifier (e.g., "gpt-4o-mini")
    pub model: String,

    /// Temperature for sampling
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

const fn default_temperature() -> f32 {
    crate::config::DEFAULT_TEMPERATURE
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            model: crate::config::DEFAULT_MODEL.into(),
            temperature: default_temperature(),
            max_tokens: None,
        }
    }
}

/// One tool-augmented completion request
#[derive(Clone, Debug)]
pub struct CompletionRequest {
    /// Full message list, system directive first
    pub messages: Vec<Message>,

    /// Tools offered to the model
    pub tools: Vec<ToolSchema>,

    /// Tool-choice mode
    pub tool_choice: ToolChoice,

    /// Generation options
    pub options: GenerationOptions,
}

/// Response from an LLM completion
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Completion {
    /// Free-text reply, if any
    pub content: Option<String>,

    /// Tool invocations, in the order the model produced them
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,

    /// Model that generated this response
    pub model: String,

    /// Token usage statistics (if available)
    pub usage: Option<TokenUsage>,

    /// Finish reason
    pub finish_reason: Option<FinishReason>,
}

impl Completion {
    /// Plain text completion
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            finish_reason: Some(FinishReason::Stop),
            ..Default::default()
        }
    }

    /// Completion that only carries a tool call
    pub fn tool_call(call: ToolCall) -> Self {
        Self {
            tool_calls: vec![call],
            finish_reason: Some(FinishReason::ToolUse),
            ..Default::default()
        }
    }
}

/// Token usage statistics
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Reason for completion finishing
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolUse,
    ContentFilter,
    Error,
}

impl FinishReason {
    /// Map an OpenAI-style `finish_reason` string
    pub fn from_wire(reason: &str) -> Self {
        match reason {
            "stop" => Self::Stop,
            "length" => Self::Length,
            "tool_calls" | "function_call" => Self::ToolUse,
            "content_filter" => Self::ContentFilter,
            _ => Self::Error,
        }
    }
}

/// Strategy trait for LLM providers
///
/// Implementations issue exactly one outbound request per `complete` call
/// and never retry.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., "openai")
    fn name(&self) -> &str;

    /// Generate a completion, possibly containing tool calls
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;
}
