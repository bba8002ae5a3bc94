//! Archetype Catalog
//!
//! Fixed reference data for the three strategy archetypes. Nothing here is
//! computed: the same persona always sees the same numbers.

use std::collections::BTreeMap;

use magi_core::analysis::{Archetype, BacktestMetrics, Critique, StrategyResult, Strategies};

/// Static description of one archetype
#[derive(Clone, Copy, Debug)]
pub struct ArchetypeProfile {
    pub archetype: Archetype,
    pub backtest: BacktestMetrics,
    /// Archetype-specific auxiliary scores
    pub metrics: &'static [(&'static str, f64)],
    pub regime_suitability: &'static str,
    pub risk_alignment_score: f64,
    pub confidence: f64,
    pub strengths: [&'static str; 3],
    pub weaknesses: [&'static str; 3],
}

pub const FIRE: ArchetypeProfile = ArchetypeProfile {
    archetype: Archetype::Fire,
    backtest: BacktestMetrics {
        total_return: 0.0907,
        max_drawdown: -0.0854,
        volatility: 0.1842,
        sharpe_ratio: 0.43,
        trades: 3,
        win_rate: 0.667,
        avg_trade_return: 0.0302,
    },
    metrics: &[("aggression_score", 0.59), ("risk_reward_ratio", 1.06)],
    regime_suitability: "Best suited for trending and speculative markets with strong directional momentum.",
    risk_alignment_score: 0.65,
    confidence: 0.72,
    strengths: [
        "Strong upside capture in trending markets",
        "Clear entry/exit signals via SMA crossovers",
        "RSI confirmation reduces false signals",
    ],
    weaknesses: [
        "Vulnerable to whipsaws in ranging markets",
        "High drawdown potential during reversals",
        "May miss initial moves due to indicator lag",
    ],
};

pub const WATER: ArchetypeProfile = ArchetypeProfile {
    archetype: Archetype::Water,
    backtest: BacktestMetrics {
        total_return: 0.0234,
        max_drawdown: -0.0312,
        volatility: 0.0823,
        sharpe_ratio: 0.18,
        trades: 5,
        win_rate: 0.6,
        avg_trade_return: 0.0047,
    },
    metrics: &[("preservation_score", 0.84), ("stability_score", 0.75)],
    regime_suitability: "Excels in sideways, uncertain, or mildly bearish markets where capital preservation matters most.",
    risk_alignment_score: 0.88,
    confidence: 0.81,
    strengths: [
        "Excellent drawdown control",
        "Low volatility provides psychological comfort",
        "Works well in uncertain environments",
    ],
    weaknesses: [
        "Significantly underperforms in bull markets",
        "Few trade opportunities limit upside",
        "May stay in cash too long during recoveries",
    ],
};

pub const GRASS: ArchetypeProfile = ArchetypeProfile {
    archetype: Archetype::Grass,
    backtest: BacktestMetrics {
        total_return: 0.0612,
        max_drawdown: -0.0567,
        volatility: 0.1234,
        sharpe_ratio: 0.38,
        trades: 7,
        win_rate: 0.571,
        avg_trade_return: 0.0087,
    },
    metrics: &[("consistency_score", 0.57), ("adaptability_score", 0.68)],
    regime_suitability: "Versatile across market conditions due to regime-switching, though regime detection has inherent lag.",
    risk_alignment_score: 0.76,
    confidence: 0.68,
    strengths: [
        "Adapts to changing market conditions",
        "Balances risk and reward effectively",
        "Regime detection adds an intelligent layer",
    ],
    weaknesses: [
        "Regime switching can cause whipsaw losses",
        "More complex signals may lag in fast markets",
        "Jack of all trades, master of none",
    ],
};

/// Catalog entry for an archetype
pub const fn profile(archetype: Archetype) -> &'static ArchetypeProfile {
    match archetype {
        Archetype::Fire => &FIRE,
        Archetype::Water => &WATER,
        Archetype::Grass => &GRASS,
    }
}

impl ArchetypeProfile {
    pub fn critique(&self) -> Critique {
        Critique {
            agent_name: self.archetype,
            backtest: self.backtest,
            regime_suitability: self.regime_suitability.to_string(),
            risk_alignment_score: self.risk_alignment_score,
            strengths: self.strengths.iter().map(ToString::to_string).collect(),
            weaknesses: self.weaknesses.iter().map(ToString::to_string).collect(),
            confidence: self.confidence,
        }
    }

    pub fn strategy_result(&self) -> StrategyResult {
        StrategyResult {
            agent_name: self.archetype,
            backtest: self.backtest,
            metrics: self
                .metrics
                .iter()
                .map(|(name, value)| ((*name).to_string(), *value))
                .collect::<BTreeMap<_, _>>(),
            critique: self.critique(),
            regime: None,
        }
    }
}

/// Evaluations for all three archetypes
pub fn strategies() -> Strategies {
    Strategies {
        fire: FIRE.strategy_result(),
        water: WATER.strategy_result(),
        grass: GRASS.strategy_result(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_well_formed() {
        for archetype in Archetype::ALL {
            let entry = profile(archetype);
            assert_eq!(entry.archetype, archetype);
            assert!(entry.backtest.max_drawdown <= 0.0);
            assert!(entry.backtest.volatility >= 0.0);
            assert!((0.0..=1.0).contains(&entry.backtest.win_rate));
            assert!((0.0..=1.0).contains(&entry.risk_alignment_score));
            assert!((0.0..=1.0).contains(&entry.confidence));
            assert_eq!(entry.metrics.len(), 2);
        }
    }

    #[test]
    fn test_strategy_result_mirrors_catalog() {
        let water = WATER.strategy_result();
        assert_eq!(water.agent_name, Archetype::Water);
        assert_eq!(water.critique.backtest, water.backtest);
        assert_eq!(water.metrics.get("preservation_score"), Some(&0.84));
        assert_eq!(water.critique.strengths.len(), 3);
    }

    #[test]
    fn test_strategies_keyed_by_archetype() {
        let all = strategies();
        for (archetype, result) in all.iter() {
            assert_eq!(result.agent_name, archetype);
        }
    }
}
