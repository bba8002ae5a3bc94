//! Decision Engine
//!
//! Deterministic persona-to-archetype selection with templated rationale.
//! Total over the persona space: there are no error paths.

use async_trait::async_trait;
use magi_core::{
    analysis::{AnalysisBackend, AnalysisResult, Archetype, DEFAULT_PERIOD_DAYS, Decision},
    error::Result,
    persona::{DrawdownSensitivity, Profile, RiskTolerance},
};

use crate::catalog;

/// Pick the archetype and alignment score for a persona.
///
/// Rules are evaluated in order and the first match wins:
/// 1. high risk tolerance and low drawdown sensitivity → Fire (0.88)
/// 2. low risk tolerance or high drawdown sensitivity → Water (0.91)
/// 3. otherwise → Grass (0.85)
pub const fn select(persona: &Profile) -> (Archetype, f64) {
    match (persona.risk_tolerance, persona.drawdown_sensitivity) {
        (RiskTolerance::High, DrawdownSensitivity::Low) => (Archetype::Fire, 0.88),
        (RiskTolerance::Low, _) | (_, DrawdownSensitivity::High) => (Archetype::Water, 0.91),
        _ => (Archetype::Grass, 0.85),
    }
}

/// Render a decimal ratio as a percentage with one decimal place
pub fn format_pct(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

fn reasoning(persona: &Profile, selected: Archetype) -> String {
    format!(
        "After evaluating all three strategies against the user's {} risk tolerance, {} time horizon, \
         and {} drawdown sensitivity, the {selected} strategy provides the best persona-aligned fit.",
        persona.risk_tolerance, persona.time_horizon, persona.drawdown_sensitivity,
    )
}

fn tradeoffs(persona: &Profile, selected: Archetype) -> Vec<String> {
    let drawdown = match selected {
        Archetype::Fire => "Higher returns come with significant drawdown risk",
        Archetype::Water | Archetype::Grass => {
            "Lower drawdown risk means potentially missing strong rallies"
        }
    };
    let regime = match selected {
        Archetype::Fire => "Momentum strategies struggle in sideways markets",
        Archetype::Water => "Conservative strategies underperform in strong bull markets",
        Archetype::Grass => "Regime switching adds complexity but improves adaptability",
    };

    vec![
        drawdown.to_string(),
        format!("Strategy optimized for {} time horizon", persona.time_horizon),
        regime.to_string(),
    ]
}

fn recommendation_summary(selected: Archetype) -> String {
    let backtest = catalog::profile(selected).backtest;
    let ret = format_pct(backtest.total_return);
    let dd = format_pct(backtest.max_drawdown.abs());

    match selected {
        Archetype::Fire => format!(
            "Based on your profile, the aggressive momentum strategy offers the highest return potential at {ret}. \
             With your risk appetite, drawdowns up to {dd} should be manageable. \
             This strategy works best in trending markets."
        ),
        Archetype::Water => format!(
            "Given your preference for capital preservation, the conservative strategy is your best fit. \
             Returns are modest at {ret}, but the maximum drawdown of only {dd} means you can sleep at night. \
             This is the strategy you'll actually stick with."
        ),
        Archetype::Grass => format!(
            "The adaptive strategy balances risk and reward by switching approaches based on market conditions. \
             With a {ret} return and controlled drawdown of {dd}, it offers a middle ground."
        ),
    }
}

/// Build the full analysis for a persona and ticker. Pure and deterministic.
pub fn decide(persona: &Profile, ticker: &str) -> AnalysisResult {
    let (selected, alignment) = select(persona);

    AnalysisResult {
        decision: Decision {
            selected_agent: selected,
            reasoning: reasoning(persona, selected),
            persona_alignment_score: alignment,
            tradeoffs: tradeoffs(persona, selected),
            recommendation_summary: recommendation_summary(selected),
        },
        strategies: catalog::strategies(),
        persona: *persona,
        ticker: ticker.to_string(),
        period_days: DEFAULT_PERIOD_DAYS,
    }
}

/// In-process analysis backed by [`decide`]
#[derive(Clone, Copy, Debug, Default)]
pub struct LocalAnalysis;

impl LocalAnalysis {
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AnalysisBackend for LocalAnalysis {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn run_analysis(
        &self,
        persona: &Profile,
        ticker: &str,
        period_days: u32,
    ) -> Result<AnalysisResult> {
        if period_days != DEFAULT_PERIOD_DAYS {
            tracing::debug!(period_days, "local analysis always reports the default window");
        }
        let result = decide(persona, ticker);
        tracing::info!(
            ticker = %ticker,
            selected = %result.decision.selected_agent,
            "local analysis complete"
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use magi_core::persona::TimeHorizon;

    fn persona(risk: RiskTolerance, horizon: TimeHorizon, drawdown: DrawdownSensitivity) -> Profile {
        Profile::new(risk, horizon, drawdown)
    }

    #[rustfmt::skip]
    const SELECTION_TABLE: [(RiskTolerance, TimeHorizon, DrawdownSensitivity, Archetype, f64); 18] = {
        use DrawdownSensitivity as D;
        use RiskTolerance as R;
        use TimeHorizon as H;
        [
            (R::Low, H::Short, D::Low, Archetype::Water, 0.91),
            (R::Low, H::Short, D::Medium, Archetype::Water, 0.91),
            (R::Low, H::Short, D::High, Archetype::Water, 0.91),
            (R::Low, H::Long, D::Low, Archetype::Water, 0.91),
            (R::Low, H::Long, D::Medium, Archetype::Water, 0.91),
            (R::Low, H::Long, D::High, Archetype::Water, 0.91),
            (R::Medium, H::Short, D::Low, Archetype::Grass, 0.85),
            (R::Medium, H::Short, D::Medium, Archetype::Grass, 0.85),
            (R::Medium, H::Short, D::High, Archetype::Water, 0.91),
            (R::Medium, H::Long, D::Low, Archetype::Grass, 0.85),
            (R::Medium, H::Long, D::Medium, Archetype::Grass, 0.85),
            (R::Medium, H::Long, D::High, Archetype::Water, 0.91),
            (R::High, H::Short, D::Low, Archetype::Fire, 0.88),
            (R::High, H::Short, D::Medium, Archetype::Grass, 0.85),
            (R::High, H::Short, D::High, Archetype::Water, 0.91),
            (R::High, H::Long, D::Low, Archetype::Fire, 0.88),
            (R::High, H::Long, D::Medium, Archetype::Grass, 0.85),
            (R::High, H::Long, D::High, Archetype::Water, 0.91),
        ]
    };

    #[test]
    fn test_selection_table_is_exhaustive() {
        assert_eq!(Profile::all().count(), SELECTION_TABLE.len());
        for p in Profile::all() {
            assert!(SELECTION_TABLE.iter().any(|&(r, h, d, ..)| persona(r, h, d) == p), "missing {p:?}");
        }

        for (risk, horizon, drawdown, archetype, score) in SELECTION_TABLE {
            let p = persona(risk, horizon, drawdown);
            let result = decide(&p, "SPY");
            assert_eq!(result.decision.selected_agent, archetype, "persona {p:?}");
            assert!((result.decision.persona_alignment_score - score).abs() < f64::EPSILON);
            assert_eq!(result.decision.tradeoffs.len(), 3);
            assert!(!result.decision.recommendation_summary.is_empty());
            assert_eq!(result.strategies.iter().count(), 3);
            assert_eq!(result.period_days, 252);
            assert_eq!(result.persona, p);
        }
    }

    #[test]
    fn test_named_examples() {
        let fire = decide(&persona(RiskTolerance::High, TimeHorizon::Long, DrawdownSensitivity::Low), "NVDA");
        assert_eq!(fire.decision.selected_agent, Archetype::Fire);
        assert_eq!(fire.ticker, "NVDA");

        let water = decide(&persona(RiskTolerance::Low, TimeHorizon::Short, DrawdownSensitivity::High), "SPY");
        assert_eq!(water.decision.selected_agent, Archetype::Water);

        let grass = decide(
            &persona(RiskTolerance::Medium, TimeHorizon::Long, DrawdownSensitivity::Medium),
            "SPY",
        );
        assert_eq!(grass.decision.selected_agent, Archetype::Grass);

        // high risk alone is not enough for Fire
        let high_medium = persona(RiskTolerance::High, TimeHorizon::Short, DrawdownSensitivity::Medium);
        assert_eq!(select(&high_medium).0, Archetype::Grass);
    }

    #[test]
    fn test_decide_is_deterministic() {
        for p in Profile::all() {
            let a = serde_json::to_string(&decide(&p, "AAPL")).unwrap();
            let b = serde_json::to_string(&decide(&p, "AAPL")).unwrap();
            assert_eq!(a, b);
        }
    }

    #[test]
    fn test_templates() {
        let p = persona(RiskTolerance::High, TimeHorizon::Long, DrawdownSensitivity::Low);
        let result = decide(&p, "SPY");
        assert_eq!(
            result.decision.reasoning,
            "After evaluating all three strategies against the user's high risk tolerance, long time horizon, \
             and low drawdown sensitivity, the fire strategy provides the best persona-aligned fit."
        );
        assert_eq!(
            result.decision.tradeoffs,
            vec![
                "Higher returns come with significant drawdown risk",
                "Strategy optimized for long time horizon",
                "Momentum strategies struggle in sideways markets",
            ]
        );
        assert!(result.decision.recommendation_summary.contains("at 9.1%"));
        assert!(result.decision.recommendation_summary.contains("up to 8.5%"));

        let water = decide(&persona(RiskTolerance::Low, TimeHorizon::Short, DrawdownSensitivity::Low), "SPY");
        assert!(water.decision.recommendation_summary.contains("modest at 2.3%"));
        assert!(water.decision.recommendation_summary.contains("only 3.1%"));
        assert_eq!(water.decision.tradeoffs[1], "Strategy optimized for short time horizon");
    }

    #[test]
    fn test_format_pct() {
        assert_eq!(format_pct(0.0612), "6.1%");
        assert_eq!(format_pct(0.0567), "5.7%");
        assert_eq!(format_pct(0.0), "0.0%");
    }

    #[tokio::test]
    async fn test_local_backend_matches_decide() {
        let p = persona(RiskTolerance::Medium, TimeHorizon::Short, DrawdownSensitivity::Low);
        let result = LocalAnalysis::new()
            .run_analysis(&p, "MSFT", DEFAULT_PERIOD_DAYS)
            .await
            .unwrap();
        assert_eq!(result, decide(&p, "MSFT"));
    }
}
