//! Pipeline Script
//!
//! The fixed, ticker-parameterized sequence of log events shown while an
//! analysis runs, and the sidebar steps derived from how many have been shown.

use serde::{Deserialize, Serialize};

/// Category of a log line
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Ai,
    Skill,
    Memory,
    Result,
    Discovery,
}

impl LogKind {
    /// Short badge label
    pub const fn badge(self) -> &'static str {
        match self {
            Self::Info => "INFO",
            Self::Ai => "AI",
            Self::Skill => "SKILL",
            Self::Memory => "MEM",
            Self::Result => "RES",
            Self::Discovery => "DISC",
        }
    }
}

/// One simulated log line
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct LogEvent {
    pub agent: String,
    pub message: String,
    /// Wait before this event is released, measured from the previous one
    pub delay_ms: u64,
    pub kind: LogKind,
    /// Always `kind.badge()`
    pub badge: &'static str,
}

impl LogEvent {
    fn new(agent: &str, message: impl Into<String>, delay_ms: u64, kind: LogKind) -> Self {
        Self {
            agent: agent.to_string(),
            message: message.into(),
            delay_ms,
            kind,
            badge: kind.badge(),
        }
    }
}

/// A sidebar step; active once `trigger_index` events have been emitted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Step {
    pub id: &'static str,
    pub label: &'static str,
    pub agent: &'static str,
    pub trigger_index: usize,
}

const ORCHESTRATOR: &str = "Orchestrator";
const CONTROL_PLANE: &str = "Control Plane";
const FIRE: &str = "Fire Agent";
const WATER: &str = "Water Agent";
const GRASS: &str = "Grass Agent";
const JUDGE: &str = "Judge Agent";
const SHARED_MEMORY: &str = "Shared Memory";

const STORING_RESULTS: &str = "Pipeline complete — storing results in Shared Memory";

/// Build the event script for `ticker`. Same input, same output.
pub fn build_events(ticker: &str) -> Vec<LogEvent> {
    use LogKind::{Ai, Discovery, Info, Memory, Result, Skill};

    let t = ticker;
    let workflow = format!("workflow:{}", ticker.to_lowercase());
    let fetch = format!("[skill] fetch_market_data → {t} 1Y historical data (252 bars)");

    vec![
        // dispatch
        LogEvent::new(ORCHESTRATOR, format!("Pipeline initiated — analyzing {t} with user persona..."), 400, Info),
        LogEvent::new(ORCHESTRATOR, "Persona loaded: risk_tolerance, time_horizon, drawdown_sensitivity", 300, Memory),
        LogEvent::new(ORCHESTRATOR, "Discovering strategy agents via Control Plane...", 500, Discovery),
        LogEvent::new(CONTROL_PLANE, "Registered agents: [fire-agent, water-agent, grass-agent, judge-agent]", 350, Discovery),
        LogEvent::new(ORCHESTRATOR, format!("Dispatching parallel {t} analysis to Fire, Water, Grass agents"), 400, Info),
        // strategy agents
        LogEvent::new(FIRE, format!("Received {t} — running momentum strategy"), 600, Info),
        LogEvent::new(FIRE, fetch.clone(), 450, Skill),
        LogEvent::new(FIRE, "[skill] compute_indicators → SMA(20), SMA(50), RSI(14), MACD", 350, Skill),
        LogEvent::new(FIRE, format!("[skill] run_momentum_backtest → simulating long-only momentum on {t}..."), 500, Skill),
        LogEvent::new(WATER, format!("Received {t} — running conservative strategy"), 100, Info),
        LogEvent::new(WATER, fetch.clone(), 400, Skill),
        LogEvent::new(WATER, "[skill] compute_indicators → Bollinger Bands, rolling volatility", 350, Skill),
        LogEvent::new(WATER, format!("[skill] run_conservative_backtest → simulating capital preservation on {t}..."), 450, Skill),
        LogEvent::new(GRASS, format!("Received {t} — running adaptive strategy"), 100, Info),
        LogEvent::new(GRASS, fetch, 300, Skill),
        LogEvent::new(GRASS, "[skill] compute_regime_indicators → autocorrelation, vol clustering", 400, Skill),
        // metrics and critiques, interleaved
        LogEvent::new(FIRE, "[skill] calculate_fire_metrics → return: +18.4%, sharpe: 1.21, max_dd: -12.3%", 300, Result),
        LogEvent::new(FIRE, "[reasoner] critique_fire_strategy → calling AI (gpt-4o)...", 200, Ai),
        LogEvent::new(GRASS, format!("[reasoner] detect_market_regime → analyzing {t} regime (gpt-4o)..."), 350, Ai),
        LogEvent::new(GRASS, "[reasoner] AI response: regime = \"trending_up\", confidence = 0.78", 800, Ai),
        LogEvent::new(GRASS, "[skill] run_adaptive_backtest → momentum-biased for trending regime", 400, Skill),
        LogEvent::new(WATER, "[skill] calculate_water_metrics → return: +7.2%, sharpe: 0.89, max_dd: -4.1%", 200, Result),
        LogEvent::new(WATER, "[reasoner] critique_water_strategy → calling AI (gpt-4o)...", 200, Ai),
        LogEvent::new(FIRE, format!("[reasoner] AI critique: \"Strong {t} momentum capture but elevated drawdown risk...\""), 600, Ai),
        LogEvent::new(FIRE, STORING_RESULTS, 200, Memory),
        LogEvent::new(WATER, "[reasoner] AI critique: \"Excellent capital preservation, tight drawdowns...\"", 500, Ai),
        LogEvent::new(WATER, STORING_RESULTS, 200, Memory),
        LogEvent::new(GRASS, "[skill] calculate_grass_metrics → return: +14.1%, sharpe: 1.08, max_dd: -8.7%", 400, Result),
        LogEvent::new(GRASS, "[reasoner] critique_grass_strategy → calling AI (gpt-4o)...", 200, Ai),
        LogEvent::new(GRASS, "[reasoner] AI critique: \"Smart regime adaptation but switching costs add up...\"", 700, Ai),
        LogEvent::new(GRASS, STORING_RESULTS, 200, Memory),
        // shared memory
        LogEvent::new(SHARED_MEMORY, format!("{workflow} → 3 strategy results stored (fire, water, grass)"), 300, Memory),
        LogEvent::new(SHARED_MEMORY, format!("{workflow} → 3 AI critiques stored"), 200, Memory),
        // judge
        LogEvent::new(ORCHESTRATOR, "All strategies complete — dispatching to Judge Agent via app.call()", 400, Discovery),
        LogEvent::new(JUDGE, format!("Received {t} strategy results + persona for evaluation"), 500, Info),
        LogEvent::new(JUDGE, "[reasoner] select_strategy → calling AI (gpt-4o, temp=0.5)...", 300, Ai),
        LogEvent::new(JUDGE, "[reasoner] AI evaluating persona alignment: risk, horizon, drawdown fit...", 800, Ai),
        LogEvent::new(JUDGE, format!("[reasoner] Best strategy selected for {t} — generating explanation..."), 600, Ai),
        LogEvent::new(JUDGE, "[reasoner] explain_decision → calling AI (gpt-4o)...", 300, Ai),
        LogEvent::new(JUDGE, "[reasoner] Decision + explanation ready", 700, Result),
        // wrap-up
        LogEvent::new(SHARED_MEMORY, format!("{workflow} → judge decision stored"), 200, Memory),
        LogEvent::new(ORCHESTRATOR, format!("app.note(\"analysis_complete\") — {t} analysis finished successfully"), 300, Info),
        LogEvent::new(ORCHESTRATOR, "Pipeline complete — delivering results to UI", 400, Result),
    ]
}

/// Number of events in every script
pub const EVENT_COUNT: usize = 43;

/// Sidebar steps in order of activation
pub const STEPS: [Step; 7] = [
    Step { id: "init", label: "Initialize pipeline", agent: ORCHESTRATOR, trigger_index: 0 },
    Step { id: "fire", label: "Momentum backtest + AI critique", agent: FIRE, trigger_index: 5 },
    Step { id: "water", label: "Conservative backtest + AI critique", agent: WATER, trigger_index: 9 },
    Step { id: "grass", label: "Regime detection + adaptive backtest", agent: GRASS, trigger_index: 13 },
    Step { id: "memory", label: "Results stored in Shared Memory", agent: CONTROL_PLANE, trigger_index: 30 },
    Step { id: "judge", label: "Persona-aware strategy selection", agent: JUDGE, trigger_index: 33 },
    Step { id: "done", label: "Delivering results", agent: ORCHESTRATOR, trigger_index: EVENT_COUNT },
];

/// Index into [`STEPS`] of the active step after `emitted` events
pub fn current_step_index(emitted: usize) -> usize {
    STEPS
        .iter()
        .enumerate()
        .position(|(i, step)| {
            emitted >= step.trigger_index
                && STEPS.get(i + 1).is_none_or(|next| emitted < next.trigger_index)
        })
        .unwrap_or(STEPS.len() - 1)
}

/// Display time after `emitted` events: the sum of their delays
pub fn elapsed_ms(events: &[LogEvent], emitted: usize) -> u64 {
    events.iter().take(emitted).map(|e| e.delay_ms).sum()
}

/// Time from subscription to the final event
pub fn total_duration_ms(events: &[LogEvent]) -> u64 {
    elapsed_ms(events, events.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_constant_across_tickers() {
        for ticker in ["SPY", "AAPL", "BRK.B", ""] {
            assert_eq!(build_events(ticker).len(), EVENT_COUNT);
        }
    }

    #[test]
    fn test_ticker_substitution() {
        let events = build_events("TSLA");
        assert_eq!(events[0].message, "Pipeline initiated — analyzing TSLA with user persona...");
        assert_eq!(events[6].message, "[skill] fetch_market_data → TSLA 1Y historical data (252 bars)");
        assert!(events.iter().any(|e| e.message.starts_with("workflow:tsla → ")));
        assert!(!events.iter().any(|e| e.message.contains("SPY")));
    }

    #[test]
    fn test_build_is_restartable() {
        assert_eq!(build_events("NVDA"), build_events("NVDA"));
    }

    #[test]
    fn test_step_triggers_line_up_with_agents() {
        let events = build_events("SPY");
        for step in &STEPS[1..4] {
            assert_eq!(events[step.trigger_index].agent, step.agent);
        }
        assert_eq!(events[STEPS[5].trigger_index].agent, ORCHESTRATOR);
        assert_eq!(STEPS.last().unwrap().trigger_index, events.len());
    }

    #[test]
    fn test_current_step_progression() {
        assert_eq!(current_step_index(0), 0);
        assert_eq!(current_step_index(4), 0);
        assert_eq!(current_step_index(5), 1);
        assert_eq!(current_step_index(29), 3);
        assert_eq!(current_step_index(30), 4);
        assert_eq!(current_step_index(EVENT_COUNT - 1), 5);
        assert_eq!(current_step_index(EVENT_COUNT), STEPS.len() - 1);

        let mut last = 0;
        for n in 0..=EVENT_COUNT {
            let idx = current_step_index(n);
            assert!(idx >= last, "step went backwards at n = {n}");
            last = idx;
        }
    }

    #[test]
    fn test_elapsed() {
        let events = build_events("SPY");
        assert_eq!(elapsed_ms(&events, 0), 0);
        assert_eq!(elapsed_ms(&events, 2), 700);
        assert_eq!(total_duration_ms(&events), events.iter().map(|e| e.delay_ms).sum::<u64>());
    }

    #[test]
    fn test_badges() {
        assert_eq!(LogKind::Memory.badge(), "MEM");
        assert_eq!(LogKind::Discovery.badge(), "DISC");
        assert_eq!(serde_json::to_value(LogKind::Ai).unwrap(), "ai");

        let events = build_events("SPY");
        assert!(events.iter().all(|e| e.badge == e.kind.badge()));
        let json = serde_json::to_value(&events[0]).unwrap();
        assert_eq!(json["kind"], "info");
        assert_eq!(json["badge"], "INFO");
    }
}
