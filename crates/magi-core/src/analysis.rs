//! Analysis Results
//!
//! Shapes produced by the decision engine (or the remote analysis service)
//! and handed to the view layer, plus the backend seam that produces them.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::Result;
use crate::persona::Profile;

/// Lookback window for every analysis, in trading days
pub const DEFAULT_PERIOD_DAYS: u32 = 252;

/// One of the three fixed strategy identities
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Archetype {
    /// Aggressive momentum
    Fire,
    /// Conservative capital preservation
    Water,
    /// Adaptive regime switching
    Grass,
}

impl Archetype {
    pub const ALL: [Self; 3] = [Self::Fire, Self::Water, Self::Grass];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fire => "fire",
            Self::Water => "water",
            Self::Grass => "grass",
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Fire => "Fire",
            Self::Water => "Water",
            Self::Grass => "Grass",
        }
    }

    /// Name of the strategy style the archetype runs
    pub const fn style(self) -> &'static str {
        match self {
            Self::Fire => "momentum",
            Self::Water => "conservative",
            Self::Grass => "adaptive",
        }
    }
}

impl std::fmt::Display for Archetype {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Backtest statistics. Ratios are decimals (0.09 = 9%).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub total_return: f64,
    /// Always <= 0
    pub max_drawdown: f64,
    /// Always >= 0
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub trades: u32,
    /// In [0, 1]
    pub win_rate: f64,
    pub avg_trade_return: f64,
}

/// Critique of one strategy's backtest
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Critique {
    pub agent_name: Archetype,
    pub backtest: BacktestMetrics,
    pub regime_suitability: String,
    /// In [0, 1]
    pub risk_alignment_score: f64,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    /// In [0, 1]
    pub confidence: f64,
}

/// Evaluation of one archetype
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StrategyResult {
    pub agent_name: Archetype,
    pub backtest: BacktestMetrics,
    pub metrics: BTreeMap<String, f64>,
    pub critique: Critique,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regime: Option<serde_json::Value>,
}

/// All three strategy evaluations; never partial
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Strategies {
    pub fire: StrategyResult,
    pub water: StrategyResult,
    pub grass: StrategyResult,
}

impl Strategies {
    pub const fn get(&self, archetype: Archetype) -> &StrategyResult {
        match archetype {
            Archetype::Fire => &self.fire,
            Archetype::Water => &self.water,
            Archetype::Grass => &self.grass,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Archetype, &StrategyResult)> {
        Archetype::ALL.into_iter().map(move |a| (a, self.get(a)))
    }
}

/// The judge's persona-aware selection
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub selected_agent: Archetype,
    pub reasoning: String,
    /// In [0, 1]
    pub persona_alignment_score: f64,
    /// Never empty
    pub tradeoffs: Vec<String>,
    pub recommendation_summary: String,
}

/// Complete analysis for a persona and ticker
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub decision: Decision,
    pub strategies: Strategies,
    pub persona: Profile,
    pub ticker: String,
    pub period_days: u32,
}

impl AnalysisResult {
    /// Evaluation of the selected archetype
    pub const fn selected(&self) -> &StrategyResult {
        self.strategies.get(self.decision.selected_agent)
    }
}

/// Produces an [`AnalysisResult`]: the local judge or the remote pipeline.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    /// Backend name for logs and health output
    fn name(&self) -> &'static str;

    /// Analyze `ticker` for `persona` over `period_days`
    async fn run_analysis(
        &self,
        persona: &Profile,
        ticker: &str,
        period_days: u32,
    ) -> Result<AnalysisResult>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archetype_wire_names() {
        assert_eq!(serde_json::to_value(Archetype::Grass).unwrap(), "grass");
        let parsed: Archetype = serde_json::from_str("\"fire\"").unwrap();
        assert_eq!(parsed, Archetype::Fire);
    }

    #[test]
    fn test_strategy_result_accepts_missing_regime() {
        let json = serde_json::json!({
            "agent_name": "water",
            "backtest": {
                "total_return": 0.02, "max_drawdown": -0.03, "volatility": 0.08,
                "sharpe_ratio": 0.18, "trades": 5, "win_rate": 0.6, "avg_trade_return": 0.004
            },
            "metrics": {"stability_score": 0.75},
            "critique": {
                "agent_name": "water",
                "backtest": {
                    "total_return": 0.02, "max_drawdown": -0.03, "volatility": 0.08,
                    "sharpe_ratio": 0.18, "trades": 5, "win_rate": 0.6, "avg_trade_return": 0.004
                },
                "regime_suitability": "sideways",
                "risk_alignment_score": 0.88,
                "strengths": [], "weaknesses": [], "confidence": 0.81
            }
        });
        let result: StrategyResult = serde_json::from_value(json).unwrap();
        assert_eq!(result.agent_name, Archetype::Water);
        assert!(result.regime.is_none());
    }
}
