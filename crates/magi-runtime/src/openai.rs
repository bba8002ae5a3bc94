//! OpenAI Chat-Completions Provider
//!
//! Implementation of `LlmProvider` over the `/chat/completions` endpoint with
//! function calling.

use std::time::Duration;

use async_trait::async_trait;
use magi_core::{
    config::AdvisorConfig,
    error::{AdvisorError, Result},
    message::Message,
    provider::{Completion, CompletionRequest, FinishReason, LlmProvider, TokenUsage},
    tool::ToolCall,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// OpenAI-compatible LLM provider
pub struct OpenAiProvider {
    http: reqwest::Client,
    config: AdvisorConfig,
}

impl OpenAiProvider {
    /// Create from configuration. The credential is checked per request, not here.
    pub fn from_config(config: AdvisorConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AdvisorError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { http, config })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

// ============================================================================
// Wire format
// ============================================================================

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Deserialize)]
struct WireToolCall {
    id: Option<String>,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    /// JSON-encoded argument object
    arguments: String,
}

#[derive(Deserialize)]
struct WireUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

/// Serialize a completion request into the chat-completions body
fn build_body(request: &CompletionRequest) -> Result<Value> {
    let tool_choice = if request.tools.is_empty() {
        None
    } else {
        Some(match request.tool_choice {
            magi_core::tool::ToolChoice::Auto => "auto",
            magi_core::tool::ToolChoice::None => "none",
            magi_core::tool::ToolChoice::Required => "required",
        })
    };

    let body = ChatRequest {
        model: &request.options.model,
        messages: request.messages.iter().map(wire_message).collect(),
        tools: request.tools.iter().map(magi_core::ToolSchema::to_function_json).collect(),
        tool_choice,
        temperature: request.options.temperature,
        max_tokens: request.options.max_tokens,
    };

    Ok(serde_json::to_value(body)?)
}

fn wire_message(message: &Message) -> WireMessage<'_> {
    WireMessage {
        role: message.role.as_str(),
        content: &message.content,
    }
}

/// Decode a successful response body
fn parse_completion(body: &str) -> Result<Completion> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| AdvisorError::Protocol(format!("undecodable completion: {e}")))?;

    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| AdvisorError::Protocol("completion has no choices".into()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .into_iter()
        .map(|call| {
            let arguments = match serde_json::from_str::<Value>(&call.function.arguments) {
                Ok(Value::Object(map)) => map,
                Ok(_) => {
                    return Err(AdvisorError::Protocol(format!(
                        "arguments of '{}' are not a JSON object",
                        call.function.name
                    )));
                }
                Err(e) => {
                    return Err(AdvisorError::Protocol(format!(
                        "arguments of '{}' are not valid JSON: {e}",
                        call.function.name
                    )));
                }
            };
            Ok(ToolCall::new(call.function.name, arguments).with_id(call.id))
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(Completion {
        content: choice.message.content,
        tool_calls,
        model: response.model,
        usage: response.usage.map(|u| TokenUsage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }),
        finish_reason: choice.finish_reason.as_deref().map(FinishReason::from_wire),
    })
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        let api_key = self.config.require_api_key()?;
        let body = build_body(request)?;

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AdvisorError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AdvisorError::ProviderUnavailable(e.to_string()))?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "OpenAI request failed");
            return Err(AdvisorError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }

        let completion = parse_completion(&text)?;
        if let Some(usage) = &completion.usage {
            tracing::debug!(
                model = %completion.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "OpenAI completion"
            );
        }
        Ok(completion)
    }
}
