//! Remote Analysis Backend
//!
//! Runs the multi-agent analysis through the control plane's synchronous
//! execute endpoint.

use std::time::Duration;

use async_trait::async_trait;
use magi_core::{
    analysis::{AnalysisBackend, AnalysisResult},
    error::{AdvisorError, Result},
    persona::Profile,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_ANALYSIS_URL: &str = "http://localhost:8080";
const EXECUTE_PATH: &str = "/api/v1/execute/magistock.run_analysis";

/// Analysis backends can take minutes for a full backtest run
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// HTTP client for the analysis endpoint
pub struct RemoteAnalysis {
    http: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    input: AnalysisInput<'a>,
}

#[derive(Debug, Serialize)]
struct AnalysisInput<'a> {
    ticker: &'a str,
    period_days: u32,
    #[serde(flatten)]
    persona: &'a Profile,
}

/// Envelope returned by the control plane
#[derive(Debug, Deserialize)]
struct ExecuteResponse {
    #[serde(default)]
    execution_id: Option<String>,
    status: String,
    #[serde(default)]
    result: Option<AnalysisResult>,
    #[serde(default)]
    duration_ms: Option<u64>,
}

impl RemoteAnalysis {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| AdvisorError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn endpoint(&self) -> String {
        format!("{}{EXECUTE_PATH}", self.base_url.trim_end_matches('/'))
    }
}

fn request_body<'a>(persona: &'a Profile, ticker: &'a str, period_days: u32) -> ExecuteRequest<'a> {
    ExecuteRequest {
        input: AnalysisInput {
            ticker,
            period_days,
            persona,
        },
    }
}

/// Interpret a 2xx response body
fn interpret(body: &str) -> Result<AnalysisResult> {
    let envelope: ExecuteResponse = serde_json::from_str(body)
        .map_err(|e| AdvisorError::Protocol(format!("undecodable analysis response: {e}")))?;

    if envelope.status != "succeeded" {
        return Err(AdvisorError::AnalysisStatus(envelope.status));
    }

    tracing::debug!(
        execution_id = envelope.execution_id.as_deref().unwrap_or("-"),
        duration_ms = envelope.duration_ms.unwrap_or_default(),
        "analysis succeeded"
    );

    envelope
        .result
        .ok_or_else(|| AdvisorError::Protocol("succeeded analysis carried no result".into()))
}

#[async_trait]
impl AnalysisBackend for RemoteAnalysis {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn run_analysis(
        &self,
        persona: &Profile,
        ticker: &str,
        period_days: u32,
    ) -> Result<AnalysisResult> {
        tracing::info!(ticker = %ticker, period_days, "dispatching remote analysis");

        let response = self
            .http
            .post(self.endpoint())
            .json(&request_body(persona, ticker, period_days))
            .send()
            .await
            .map_err(|e| AdvisorError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AdvisorError::ProviderUnavailable(e.to_string()))?;

        if !status.is_success() {
            return Err(AdvisorError::Upstream {
                status: status.as_u16(),
                body: text,
            });
        }

        interpret(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magi_core::persona::{DrawdownSensitivity, RiskTolerance, TimeHorizon};
    use serde_json::json;

    fn persona() -> Profile {
        Profile::new(RiskTolerance::High, TimeHorizon::Long, DrawdownSensitivity::Low)
    }

    fn strategy(name: &str) -> serde_json::Value {
        json!({
            "agent_name": name,
            "backtest": {
                "total_return": 0.1, "max_drawdown": -0.05, "volatility": 0.1,
                "sharpe_ratio": 0.5, "trades": 4, "win_rate": 0.5, "avg_trade_return": 0.01
            },
            "metrics": {},
            "critique": {
                "agent_name": name,
                "backtest": {
                    "total_return": 0.1, "max_drawdown": -0.05, "volatility": 0.1,
                    "sharpe_ratio": 0.5, "trades": 4, "win_rate": 0.5, "avg_trade_return": 0.01
                },
                "regime_suitability": "any",
                "risk_alignment_score": 0.5,
                "strengths": [],
                "weaknesses": [],
                "confidence": 0.5
            }
        })
    }

    fn result_json() -> serde_json::Value {
        json!({
            "decision": {
                "selected_agent": "fire",
                "reasoning": "r",
                "persona_alignment_score": 0.88,
                "tradeoffs": ["a", "b", "c"],
                "recommendation_summary": "s"
            },
            "strategies": {
                "fire": strategy("fire"),
                "water": strategy("water"),
                "grass": strategy("grass")
            },
            "persona": {"risk_tolerance": "high", "time_horizon": "long", "drawdown_sensitivity": "low"},
            "ticker": "NVDA",
            "period_days": 252
        })
    }

    #[test]
    fn test_request_shape() {
        let persona = persona();
        let body = serde_json::to_value(request_body(&persona, "NVDA", 252)).unwrap();
        assert_eq!(
            body,
            json!({
                "input": {
                    "ticker": "NVDA",
                    "period_days": 252,
                    "risk_tolerance": "high",
                    "time_horizon": "long",
                    "drawdown_sensitivity": "low"
                }
            })
        );
    }

    #[test]
    fn test_succeeded_returns_result() {
        let body = json!({
            "execution_id": "exec-1",
            "status": "succeeded",
            "result": result_json(),
            "duration_ms": 4200
        });
        let result = interpret(&body.to_string()).unwrap();
        assert_eq!(result.ticker, "NVDA");
        assert_eq!(result.decision.tradeoffs.len(), 3);
    }

    #[test]
    fn test_non_succeeded_status() {
        let body = json!({"execution_id": "exec-2", "status": "failed", "result": null});
        match interpret(&body.to_string()) {
            Err(AdvisorError::AnalysisStatus(status)) => assert_eq!(status, "failed"),
            other => panic!("expected AnalysisStatus, got {other:?}"),
        }
    }

    #[test]
    fn test_endpoint_join() {
        let backend = RemoteAnalysis::new("http://localhost:8080/").unwrap();
        assert_eq!(
            backend.endpoint(),
            "http://localhost:8080/api/v1/execute/magistock.run_analysis"
        );
    }
}
