//! Server Configuration

use std::str::FromStr;
use std::time::Duration;

use magi_runtime::remote::DEFAULT_ANALYSIS_URL;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_SESSION_TTL_SECS: u64 = 30 * 60;

/// Which analysis backend `confirm` and `/api/analyze` use
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AnalysisMode {
    /// In-process decision engine
    #[default]
    Local,
    /// Control-plane execute endpoint
    Remote,
}

impl FromStr for AnalysisMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "mock" => Ok(Self::Local),
            "remote" => Ok(Self::Remote),
            other => anyhow::bail!("unknown MAGI_ANALYSIS_MODE '{other}' (expected local or remote)"),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub analysis_mode: AnalysisMode,
    pub analysis_url: String,
    /// Idle time after which a session is dropped
    pub session_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.into(),
            analysis_mode: AnalysisMode::Local,
            analysis_url: DEFAULT_ANALYSIS_URL.into(),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        }
    }
}

impl ServerConfig {
    /// Read `BIND_ADDR`, `MAGI_ANALYSIS_MODE`, `MAGI_ANALYSIS_URL` and
    /// `SESSION_TTL_SECS`
    pub fn from_env() -> anyhow::Result<Self> {
        let analysis_mode = match std::env::var("MAGI_ANALYSIS_MODE") {
            Ok(mode) => mode.parse()?,
            Err(_) => AnalysisMode::default(),
        };
        let session_ttl = match std::env::var("SESSION_TTL_SECS") {
            Ok(secs) => parse_ttl(&secs)?,
            Err(_) => Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        };

        Ok(Self {
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.into()),
            analysis_mode,
            analysis_url: std::env::var("MAGI_ANALYSIS_URL")
                .unwrap_or_else(|_| DEFAULT_ANALYSIS_URL.into()),
            session_ttl,
        })
    }
}

fn parse_ttl(raw: &str) -> anyhow::Result<Duration> {
    let secs: u64 = raw
        .trim()
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid SESSION_TTL_SECS '{raw}': {e}"))?;
    anyhow::ensure!(secs > 0, "SESSION_TTL_SECS must be positive");
    Ok(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_mode_parse() {
        assert_eq!("local".parse::<AnalysisMode>().unwrap(), AnalysisMode::Local);
        assert_eq!(" Remote ".parse::<AnalysisMode>().unwrap(), AnalysisMode::Remote);
        assert!("cloud".parse::<AnalysisMode>().is_err());
    }

    #[test]
    fn test_session_ttl_parse() {
        assert_eq!(parse_ttl(" 90 ").unwrap(), Duration::from_secs(90));
        assert!(parse_ttl("0").is_err());
        assert!(parse_ttl("half an hour").is_err());
        assert_eq!(ServerConfig::default().session_ttl, Duration::from_secs(1800));
    }
}
