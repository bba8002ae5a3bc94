//! Persona Extraction
//!
//! One request/response exchange with a tool-calling model. The model either
//! asks a follow-up question (free text) or calls `extract_persona` once it
//! is confident about all four dimensions.

use std::sync::Arc;

use serde::Deserialize;

use crate::config::AdvisorConfig;
use crate::error::{AdvisorError, Result};
use crate::message::{Message, Role};
use crate::persona::{
    DrawdownSensitivity, ExtractionResult, Profile, RiskTolerance, TimeHorizon, normalize_ticker,
};
use crate::provider::{CompletionRequest, GenerationOptions, LlmProvider};
use crate::tool::{ParameterSchema, ToolCall, ToolChoice, ToolSchema};

/// Name of the structured-extraction tool
pub const EXTRACT_PERSONA: &str = "extract_persona";

/// System directive for the advisor persona
pub const ADVISOR_DIRECTIVE: &str = r#"You are Magi, a warm and friendly investment advisor for MagiStock, a persona-aware investment companion.

Through natural conversation, work out four things about the user:
1. Risk tolerance (low, medium, or high)
2. Time horizon (short = under 1 year, long = 1+ years)
3. Drawdown sensitivity: how they emotionally react when their portfolio drops (low, medium, or high)
4. A stock or ETF ticker they want analyzed (e.g. AAPL, TSLA, MSFT, SPY)

Conversation rules:
- Ask at most 2-3 follow-up questions. This is a conversation, not an interrogation.
- Prefer questions that reveal their risk profile naturally (e.g. "How would you feel if your portfolio dropped 20% in a week?").
- If they have not named a stock, ask which stock or ETF they would like to analyze. If they are unsure, suggest a few popular ones (AAPL, TSLA, MSFT, SPY, QQQ) that fit their profile.
- Be conversational and empathetic, use plain language, avoid jargon.
- Keep every reply to 2-3 sentences.
- Once you can determine all four dimensions, including a ticker, call the extract_persona function.

Never tell the user what their profile is. Hold the conversation and call the function when ready; the app shows them a summary."#;

/// Outcome of one exchange: exactly one variant is populated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Exchange {
    /// Next assistant utterance
    Message(String),
    /// Completed extraction
    Profile(ExtractionResult),
}

/// Schema of the `extract_persona` tool
pub fn extract_persona_tool() -> ToolSchema {
    ToolSchema {
        name: EXTRACT_PERSONA.into(),
        description: "Extract the user investment persona once enough information has been gathered from the conversation.".into(),
        parameters: vec![
            ParameterSchema::string("risk_tolerance", "How much risk the user is comfortable with")
                .one_of(&["low", "medium", "high"]),
            ParameterSchema::string(
                "time_horizon",
                "Investment time horizon. short = under 1 year, long = 1+ years",
            )
            .one_of(&["short", "long"]),
            ParameterSchema::string(
                "drawdown_sensitivity",
                "How emotionally sensitive the user is to portfolio drops",
            )
            .one_of(&["low", "medium", "high"]),
            ParameterSchema::string(
                "summary",
                "A 1-2 sentence summary of the user profile in second person (e.g. \"You are a cautious investor who...\")",
            ),
            ParameterSchema::string(
                "ticker",
                "The stock or ETF ticker symbol to analyze (e.g. AAPL, TSLA, SPY). Uppercase.",
            ),
        ],
    }
}

/// Arguments as the model sends them. Only `ticker` may be absent.
#[derive(Deserialize)]
struct PersonaArguments {
    risk_tolerance: RiskTolerance,
    time_horizon: TimeHorizon,
    drawdown_sensitivity: DrawdownSensitivity,
    summary: String,
    #[serde(default)]
    ticker: Option<String>,
}

/// Parse an `extract_persona` call into a validated extraction.
pub fn parse_extraction(call: &ToolCall) -> Result<ExtractionResult> {
    if call.name != EXTRACT_PERSONA {
        return Err(AdvisorError::Protocol(format!(
            "unexpected tool call '{}'",
            call.name
        )));
    }

    let args: PersonaArguments =
        serde_json::from_value(serde_json::Value::Object(call.arguments.clone())).map_err(
            |e| AdvisorError::Protocol(format!("invalid {EXTRACT_PERSONA} arguments: {e}")),
        )?;

    if args.summary.trim().is_empty() {
        return Err(AdvisorError::Protocol(format!(
            "{EXTRACT_PERSONA} returned an empty summary"
        )));
    }

    Ok(ExtractionResult {
        profile: Profile::new(
            args.risk_tolerance,
            args.time_horizon,
            args.drawdown_sensitivity,
        ),
        summary: args.summary.trim().to_string(),
        ticker: normalize_ticker(args.ticker.as_deref()),
    })
}

/// Wraps a single tool-augmented exchange with the model
pub struct PersonaExtractor {
    provider: Arc<dyn LlmProvider>,
    config: AdvisorConfig,
    tool: ToolSchema,
}

impl PersonaExtractor {
    pub fn new(provider: Arc<dyn LlmProvider>, config: AdvisorConfig) -> Self {
        Self {
            provider,
            config,
            tool: extract_persona_tool(),
        }
    }

    pub const fn config(&self) -> &AdvisorConfig {
        &self.config
    }

    /// Build the outbound request for `history`
    fn build_request(&self, history: &[Message]) -> Result<CompletionRequest> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(ADVISOR_DIRECTIVE));
        messages.extend(history.iter().filter(|m| m.role != Role::System).cloned());

        Ok(CompletionRequest {
            messages,
            tools: vec![self.tool.clone()],
            tool_choice: ToolChoice::Auto,
            options: GenerationOptions {
                model: self.config.model_name()?.to_string(),
                temperature: self.config.temperature,
                max_tokens: None,
            },
        })
    }

    /// Send `history` (oldest first) and return a follow-up or the profile.
    pub async fn exchange(&self, history: &[Message]) -> Result<Exchange> {
        if history.is_empty() {
            return Err(AdvisorError::Session(
                "cannot exchange an empty conversation".into(),
            ));
        }

        // Credential first: nothing leaves the process without one.
        self.config.require_api_key()?;
        let request = self.build_request(history)?;

        tracing::debug!(
            provider = self.provider.name(),
            model = %request.options.model,
            messages = history.len(),
            "Persona exchange"
        );

        let completion = self.provider.complete(&request).await?;

        if let Some(call) = completion.tool_calls.first() {
            let extraction = parse_extraction(call)?;
            tracing::info!(
                ticker = %extraction.ticker,
                risk = %extraction.profile.risk_tolerance,
                horizon = %extraction.profile.time_horizon,
                drawdown = %extraction.profile.drawdown_sensitivity,
                "Persona extracted"
            );
            return Ok(Exchange::Profile(extraction));
        }

        match completion.content {
            Some(text) if !text.trim().is_empty() => Ok(Exchange::Message(text)),
            _ => Err(AdvisorError::Protocol(
                "completion carried neither text nor a tool call".into(),
            )),
        }
    }
}
