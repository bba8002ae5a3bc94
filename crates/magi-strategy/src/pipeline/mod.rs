//! Simulated analysis pipeline log: the script and its timed emitter.

pub mod emitter;
pub mod events;

pub use emitter::{Emission, PipelineSimulator, Subscription};
pub use events::{
    EVENT_COUNT, LogEvent, LogKind, STEPS, Step, build_events, current_step_index, elapsed_ms,
    total_duration_ms,
};
