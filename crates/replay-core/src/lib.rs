//! Playback controllers for the algorithm replay front end.
//!
//! Three controllers turn compute service responses into animated views:
//!
//! - [`StepPlayer`] -- steps through a backtracking board trace
//! - [`TimeScrubber`] -- reveals a price path ensemble one day at a time
//! - [`EvolutionDriver`] -- runs generations of a route optimizer back to back
//!
//! Each controller is a synchronous state machine (`*State`) plus a handle
//! that runs it on a dedicated tokio task. The task is the only writer of
//! its state: commands arrive over a channel, and every transition
//! publishes a freshly derived view on a `watch` channel.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration
//! - [`schedule`] -- autoplay ticker and in-flight fetch helpers
//! - [`cancel`] -- per-run cancellation tokens
//! - [`attack`] -- attack overlay for board snapshots
//! - [`error`] -- controller errors

mod actor;
pub mod attack;
pub mod cancel;
pub mod config;
pub mod error;
pub mod evolution;
pub mod schedule;
pub mod step_player;
pub mod time_scrubber;

#[cfg(test)]
mod testing;

pub use config::{ConfigError, ReplayConfig};
pub use error::ControllerError;
pub use evolution::{DriverPhase, EvolutionDriver, EvolutionState, EvolutionView, RoundOutcome};
pub use step_player::{StepLogRow, StepPlayer, StepPlayerState, StepPlayerView};
pub use time_scrubber::{
    ScenarioRow, TimeScrubber, TimeScrubberState, TimeScrubberView, Trend, VisibleWindow,
};
