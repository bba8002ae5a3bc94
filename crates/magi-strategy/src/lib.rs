//! # magi-strategy
//!
//! Persona-aware strategy selection for MagiStock, and the simulated
//! multi-agent pipeline log shown while an analysis runs.
//!
//! ## Archetypes
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Persona (risk, horizon, drawdown)                           │
//! ├──────────────────────────────────────────────────────────────┤
//! │  high risk + low drawdown        → FIRE   momentum      0.88 │
//! │  low risk  or high drawdown      → WATER  conservative  0.91 │
//! │  everything else                 → GRASS  adaptive      0.85 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! All three evaluations are always returned so the view can compare them;
//! the decision only marks which one fits the persona.

pub mod catalog;
pub mod decision;
pub mod pipeline;

pub use catalog::ArchetypeProfile;
pub use decision::{LocalAnalysis, decide, format_pct, select};
pub use pipeline::{Emission, LogEvent, LogKind, PipelineSimulator, Step, Subscription};
