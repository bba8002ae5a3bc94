//! Investor Persona
//!
//! The three-dimensional profile extracted from conversation, plus the
//! extraction payload (summary and ticker) that comes with it.

use serde::{Deserialize, Serialize};

/// Ticker used when the model omits one
pub const DEFAULT_TICKER: &str = "SPY";

/// How much risk the user is comfortable with
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTolerance {
    Low,
    Medium,
    High,
}

/// Investment time horizon: short is under one year, long is one year or more
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeHorizon {
    Short,
    Long,
}

/// How emotionally sensitive the user is to portfolio drops
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawdownSensitivity {
    Low,
    Medium,
    High,
}

impl RiskTolerance {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Label shown on the profile summary card
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Conservative",
            Self::Medium => "Balanced",
            Self::High => "Aggressive",
        }
    }
}

impl TimeHorizon {
    pub const ALL: [Self; 2] = [Self::Short, Self::Long];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Short => "short",
            Self::Long => "long",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Short => "Short-term (< 1 year)",
            Self::Long => "Long-term (1+ years)",
        }
    }
}

impl DrawdownSensitivity {
    pub const ALL: [Self; 3] = [Self::Low, Self::Medium, Self::High];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Comfortable with drops",
            Self::Medium => "Somewhat uneasy",
            Self::High => "Very loss-averse",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {$(
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    )*};
}

display_as_str!(RiskTolerance, TimeHorizon, DrawdownSensitivity);

/// Investor profile. Immutable once extracted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Profile {
    pub risk_tolerance: RiskTolerance,
    pub time_horizon: TimeHorizon,
    pub drawdown_sensitivity: DrawdownSensitivity,
}

impl Profile {
    pub const fn new(
        risk_tolerance: RiskTolerance,
        time_horizon: TimeHorizon,
        drawdown_sensitivity: DrawdownSensitivity,
    ) -> Self {
        Self {
            risk_tolerance,
            time_horizon,
            drawdown_sensitivity,
        }
    }

    /// Human-readable labels for the summary card
    pub const fn labels(&self) -> ProfileLabels {
        ProfileLabels {
            risk_tolerance: self.risk_tolerance.label(),
            time_horizon: self.time_horizon.label(),
            drawdown_sensitivity: self.drawdown_sensitivity.label(),
        }
    }

    /// Every profile in the 3 × 2 × 3 persona space
    pub fn all() -> impl Iterator<Item = Self> {
        RiskTolerance::ALL.into_iter().flat_map(|risk| {
            TimeHorizon::ALL.into_iter().flat_map(move |horizon| {
                DrawdownSensitivity::ALL
                    .into_iter()
                    .map(move |drawdown| Self::new(risk, horizon, drawdown))
            })
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ProfileLabels {
    pub risk_tolerance: &'static str,
    pub time_horizon: &'static str,
    pub drawdown_sensitivity: &'static str,
}

/// Payload produced when the model signals the conversation is complete
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionResult {
    #[serde(flatten)]
    pub profile: Profile,

    /// One-to-two sentence second-person summary
    pub summary: String,

    /// Uppercase ticker symbol
    pub ticker: String,
}

/// Normalize a ticker: trimmed, uppercased, `SPY` when absent or empty.
pub fn normalize_ticker(raw: Option<&str>) -> String {
    match raw.map(str::trim) {
        Some(t) if !t.is_empty() => t.to_uppercase(),
        _ => DEFAULT_TICKER.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_space_is_complete() {
        let all: Vec<_> = Profile::all().collect();
        assert_eq!(all.len(), 18);
        let unique: std::collections::HashSet<_> = all.iter().collect();
        assert_eq!(unique.len(), 18);
    }

    #[test]
    fn test_profile_labels() {
        let labels = Profile::new(RiskTolerance::High, TimeHorizon::Short, DrawdownSensitivity::Medium).labels();
        assert_eq!(labels.risk_tolerance, "Aggressive");
        assert_eq!(labels.time_horizon, "Short-term (< 1 year)");
        assert_eq!(labels.drawdown_sensitivity, "Somewhat uneasy");
    }

    #[test]
    fn test_profile_wire_format() {
        let profile = Profile::new(RiskTolerance::High, TimeHorizon::Long, DrawdownSensitivity::Low);
        let json = serde_json::to_value(profile).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "risk_tolerance": "high",
                "time_horizon": "long",
                "drawdown_sensitivity": "low",
            })
        );
    }

    #[test]
    fn test_extraction_result_is_flat() {
        let result = ExtractionResult {
            profile: Profile::new(RiskTolerance::Low, TimeHorizon::Short, DrawdownSensitivity::High),
            summary: "You are a cautious investor.".into(),
            ticker: "AAPL".into(),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["risk_tolerance"], "low");
        assert_eq!(json["ticker"], "AAPL");
    }

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker(Some(" aapl ")), "AAPL");
        assert_eq!(normalize_ticker(Some("")), "SPY");
        assert_eq!(normalize_ticker(None), "SPY");
    }
}
