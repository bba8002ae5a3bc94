//! HTTP/WebSocket Handlers

use axum::{
    Json,
    extract::{
        Path, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::StatusCode,
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};

use magi_core::{
    AnalysisResult, Archetype, ConversationState, DEFAULT_PERIOD_DAYS, Profile, ProfileLabels,
    STARTER_PROMPTS,
    SessionId, SessionSnapshot, StarterPrompt, Turn, WorkflowState, persona::normalize_ticker,
};
use magi_strategy::{LogEvent, PipelineSimulator, Step};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub analysis_backend: &'static str,
    pub api_key_configured: bool,
    pub active_sessions: usize,
}

#[derive(Debug, Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub starter_prompts: &'static [StarterPrompt],
    pub session: SessionSnapshot,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub message: String,
}

/// Extracted profile as shown on the summary screen
#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub profile: Profile,
    pub labels: ProfileLabels,
    pub summary: String,
    pub ticker: String,
}

#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub state: WorkflowState,
    pub conversation: ConversationState,
    pub reply: Option<String>,
    pub quick_replies: Vec<&'static str>,
    pub profile: Option<ProfileView>,
}

impl TurnResponse {
    fn new(turn: Turn, state: WorkflowState, conversation: ConversationState) -> Self {
        match turn {
            Turn::Reply {
                message,
                quick_replies,
            } => Self {
                state,
                conversation,
                reply: Some(message),
                quick_replies,
                profile: None,
            },
            Turn::ProfileReady(ready) => Self {
                state,
                conversation,
                reply: None,
                quick_replies: Vec::new(),
                profile: Some(ProfileView {
                    labels: ready.profile.labels(),
                    profile: ready.profile,
                    summary: ready.summary,
                    ticker: ready.ticker,
                }),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeRequest {
    pub persona: Profile,
    #[serde(default)]
    pub ticker: Option<String>,
    #[serde(default)]
    pub period_days: Option<u32>,
}

/// Card for the recommended archetype
#[derive(Debug, Serialize)]
pub struct SelectedAgentView {
    pub agent: Archetype,
    pub display_name: &'static str,
    pub style: &'static str,
    pub total_return: f64,
    pub confidence: f64,
}

/// Analysis result plus the recommended archetype's card
#[derive(Debug, Serialize)]
pub struct AnalysisResponse {
    #[serde(flatten)]
    pub result: AnalysisResult,
    pub selected: SelectedAgentView,
}

impl From<AnalysisResult> for AnalysisResponse {
    fn from(result: AnalysisResult) -> Self {
        let agent = result.decision.selected_agent;
        let strategy = result.selected();
        let selected = SelectedAgentView {
            agent,
            display_name: agent.display_name(),
            style: agent.style(),
            total_return: strategy.backtest.total_return,
            confidence: strategy.critique.confidence,
        };
        Self { result, selected }
    }
}

#[derive(Debug, Serialize)]
pub struct PipelineResponse {
    pub ticker: String,
    pub events: Vec<LogEvent>,
    pub steps: &'static [Step],
    pub total_duration_ms: u64,
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        analysis_backend: state.analysis.name(),
        api_key_configured: state.advisor.has_api_key(),
        active_sessions: state.sessions.len().await,
    })
}

/// Open a new advisor session
pub async fn create_session(
    State(state): State<AppState>,
) -> (StatusCode, Json<CreateSessionResponse>) {
    let (id, session) = state.sessions.create().await;
    let snapshot = session.lock().await.snapshot();
    tracing::info!(session = %id, "Session created");

    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: id.to_string(),
            starter_prompts: &STARTER_PROMPTS,
            session: snapshot,
        }),
    )
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionSnapshot>> {
    let session = state.session(&id).await?;
    let snapshot = session.lock().await.snapshot();
    Ok(Json(snapshot))
}

/// Drop a session and its history
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if !state.sessions.remove(&SessionId::from_string(id.as_str())).await {
        return Err(ApiError::SessionNotFound(id));
    }
    tracing::info!(session = %id, "Session deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// One chat turn. On failure the session keeps its history for a retry.
pub async fn send_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<SendMessageRequest>,
) -> ApiResult<Json<TurnResponse>> {
    let session = state.session(&id).await?;
    let mut session = session.lock().await;

    let turn = session.send(&payload.message).await?;
    Ok(Json(TurnResponse::new(
        turn,
        session.workflow().state(),
        session.conversation().state(),
    )))
}

/// Re-issue the last failed turn
pub async fn retry_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<TurnResponse>> {
    let session = state.session(&id).await?;
    let mut session = session.lock().await;

    let turn = session.retry().await?;
    Ok(Json(TurnResponse::new(
        turn,
        session.workflow().state(),
        session.conversation().state(),
    )))
}

/// Summary → chat with a fresh conversation
pub async fn edit_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionSnapshot>> {
    let session = state.session(&id).await?;
    let mut session = session.lock().await;

    session.edit()?;
    Ok(Json(session.snapshot()))
}

pub async fn reset_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<SessionSnapshot>> {
    let session = state.session(&id).await?;
    let mut session = session.lock().await;

    session.reset();
    Ok(Json(session.snapshot()))
}

/// Confirm the profile and run the configured analysis backend
pub async fn confirm_profile(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<AnalysisResponse>> {
    let session = state.session(&id).await?;
    let mut session = session.lock().await;

    let result = session.confirm(state.analysis.as_ref()).await?;
    Ok(Json(result.clone().into()))
}

/// Stateless analysis for a given persona
pub async fn analyze(
    State(state): State<AppState>,
    Json(payload): Json<AnalyzeRequest>,
) -> ApiResult<Json<AnalysisResponse>> {
    let ticker = normalize_ticker(payload.ticker.as_deref());
    let period_days = payload.period_days.unwrap_or(DEFAULT_PERIOD_DAYS);

    let result = state
        .analysis
        .run_analysis(&payload.persona, &ticker, period_days)
        .await?;
    Ok(Json(result.into()))
}

/// Full pipeline script for a ticker
pub async fn pipeline_script(Path(ticker): Path<String>) -> Json<PipelineResponse> {
    let simulator = PipelineSimulator::new(normalize_ticker(Some(&ticker)));

    Json(PipelineResponse {
        ticker: simulator.ticker().to_string(),
        events: simulator.events().to_vec(),
        steps: simulator.steps(),
        total_duration_ms: simulator.total_duration_ms(),
    })
}

/// WebSocket stream of timed pipeline emissions
pub async fn pipeline_stream_handler(ws: WebSocketUpgrade, Path(ticker): Path<String>) -> Response {
    let ticker = normalize_ticker(Some(&ticker));
    ws.on_upgrade(move |socket| handle_pipeline_stream(socket, ticker))
}

async fn handle_pipeline_stream(socket: WebSocket, ticker: String) {
    let (mut sender, mut receiver) = socket.split();
    let simulator = PipelineSimulator::new(ticker);
    let mut emissions = simulator.stream();

    loop {
        tokio::select! {
            emission = emissions.next() => {
                let Some(emission) = emission else {
                    let done = serde_json::json!({"type": "done"});
                    if let Err(e) = sender.send(Message::Text(done.to_string().into())).await {
                        tracing::debug!(error = %e, "Pipeline done frame not delivered");
                    }
                    break;
                };
                let frame = serde_json::json!({"type": "emission", "emission": emission});
                if sender.send(Message::Text(frame.to_string().into())).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    tracing::debug!(ticker = %simulator.ticker(), "Pipeline stream closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use magi_core::{DrawdownSensitivity, ProfileReady, RiskTolerance, TimeHorizon};

    #[test]
    fn test_profile_turn_carries_labels() {
        let ready = ProfileReady {
            history: Vec::new(),
            summary: "You play it safe.".into(),
            ticker: "SPY".into(),
            profile: Profile::new(RiskTolerance::Low, TimeHorizon::Long, DrawdownSensitivity::High),
        };
        let response = TurnResponse::new(
            Turn::ProfileReady(ready),
            WorkflowState::Summary,
            ConversationState::Complete,
        );

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["profile"]["profile"]["risk_tolerance"], "low");
        assert_eq!(json["profile"]["labels"]["risk_tolerance"], "Conservative");
        assert_eq!(json["profile"]["labels"]["drawdown_sensitivity"], "Very loss-averse");
        assert!(json["reply"].is_null());
    }
}
