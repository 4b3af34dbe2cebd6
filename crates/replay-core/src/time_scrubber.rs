//! Fixed-rate reveal of a price path ensemble.
//!
//! One `simulate` fetches the whole bundle of day frames. Autoplay then
//! moves a cutoff forward one day per tick; the visible window is always
//! `bundle[0..=cutoff]`. The value at risk is withheld until the reveal
//! has reached the last day.

use std::sync::Arc;
use std::time::Duration;

use replay_client::{ComputeError, ComputeService};
use replay_types::{DayFrame, SimulatePathsResponse, SimulationParams, ValidationError};
use serde::{Serialize, Serializer};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::actor::{Envelope, Handle};
use crate::config::TimeScrubberConfig;
use crate::error::ControllerError;
use crate::schedule::{Ticker, abort, settle};

/// Revealed prefix of the bundle.
///
/// Shares the fetched bundle instead of copying frames, so publishing a
/// view on every tick stays cheap.
#[derive(Debug, Clone, Default)]
pub struct VisibleWindow {
    bundle: Option<Arc<SimulatePathsResponse>>,
    cutoff: usize,
}

impl VisibleWindow {
    /// Frames for days `0..=cutoff`; empty without a bundle.
    pub fn frames(&self) -> &[DayFrame] {
        self.bundle
            .as_deref()
            .and_then(|bundle| bundle.trajectories.get(..=self.cutoff))
            .unwrap_or_default()
    }

    /// Number of revealed days.
    pub fn len(&self) -> usize {
        self.frames().len()
    }

    /// Whether nothing is revealed.
    pub fn is_empty(&self) -> bool {
        self.frames().is_empty()
    }

    /// Most recently revealed frame.
    pub fn last(&self) -> Option<&DayFrame> {
        self.frames().last()
    }
}

impl PartialEq for VisibleWindow {
    fn eq(&self, other: &Self) -> bool {
        self.frames() == other.frames()
    }
}

impl Serialize for VisibleWindow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.frames())
    }
}

/// Direction of a simulated path relative to its starting value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    /// Above the day-0 value.
    Rising,
    /// Below the day-0 value.
    Falling,
    /// Equal to the day-0 value.
    Flat,
}

impl Trend {
    fn between(start: f64, now: f64) -> Self {
        if now > start {
            Self::Rising
        } else if now < start {
            Self::Falling
        } else {
            Self::Flat
        }
    }
}

/// One row of the scenario table.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScenarioRow {
    /// Simulation id.
    pub simulation: u32,
    /// Value on the cutoff day.
    pub value: f64,
    /// Movement since day 0.
    pub trend: Trend,
}

/// Everything the presentation layer needs to draw the scrubber.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TimeScrubberView {
    /// Parameters of the current or pending simulation.
    pub params: Option<SimulationParams>,
    /// Whether a simulation is in flight.
    pub loading: bool,
    /// Whether the reveal is running.
    pub playing: bool,
    /// Number of days in the bundle.
    pub day_count: usize,
    /// Index of the last revealed day.
    pub cutoff: usize,
    /// Revealed frames.
    pub window: VisibleWindow,
    /// Reveal progress in `[0, 1]`.
    pub progress: f64,
    /// 95% value at risk; only present once the reveal has completed.
    pub value_at_risk_95: Option<f64>,
    /// Per-simulation values on the cutoff day.
    pub scenarios: Vec<ScenarioRow>,
    /// Why the last simulation failed, if it did.
    pub last_error: Option<String>,
}

/// Synchronous time scrubber state machine.
#[derive(Debug, Clone)]
pub struct TimeScrubberState {
    config: TimeScrubberConfig,
    params: Option<SimulationParams>,
    bundle: Option<Arc<SimulatePathsResponse>>,
    cutoff: usize,
    playing: bool,
    loading: bool,
    last_error: Option<String>,
}

impl TimeScrubberState {
    /// Create a scrubber with nothing loaded.
    pub const fn new(config: TimeScrubberConfig) -> Self {
        Self {
            config,
            params: None,
            bundle: None,
            cutoff: 0,
            playing: false,
            loading: false,
            last_error: None,
        }
    }

    /// Validate `params` and enter the loading state, dropping any
    /// previous bundle.
    pub fn begin_simulate(
        &mut self,
        params: SimulationParams,
    ) -> Result<SimulationParams, ValidationError> {
        params.validate()?;
        self.params = Some(params);
        self.bundle = None;
        self.cutoff = 0;
        self.playing = false;
        self.loading = true;
        self.last_error = None;
        Ok(params)
    }

    /// Apply the outcome of the last `begin_simulate`.
    pub fn finish_simulate(&mut self, outcome: Result<SimulatePathsResponse, ComputeError>) {
        self.loading = false;
        let bundle = match outcome {
            Ok(bundle) if bundle.trajectories.is_empty() => {
                let err = ComputeError::Decode("empty trajectory bundle".to_owned());
                warn!(error = %err, "simulation returned no frames");
                self.last_error = Some(err.to_string());
                return;
            }
            Ok(bundle) => bundle,
            Err(err) => {
                warn!(error = %err, "simulation failed");
                self.last_error = Some(err.to_string());
                return;
            }
        };

        info!(
            days = bundle.trajectories.len(),
            value_at_risk_95 = bundle.value_at_risk_95,
            "trajectory bundle loaded"
        );
        self.playing = bundle.trajectories.len() > 1;
        self.cutoff = 0;
        self.bundle = Some(Arc::new(bundle));
    }

    /// Rewind to day 0 and restart the reveal. No-op without a bundle.
    pub fn replay(&mut self) {
        if self.bundle.is_some() {
            self.cutoff = 0;
            self.playing = self.last_index() > 0;
        }
    }

    /// Stop the reveal where it is.
    pub const fn pause(&mut self) {
        self.playing = false;
    }

    /// Reveal one more day on an autoplay tick.
    ///
    /// Returns whether anything changed. Reaching the last day stops the
    /// reveal.
    pub fn tick(&mut self) -> bool {
        if !self.playing {
            return false;
        }
        let last = self.last_index();
        if self.cutoff < last {
            self.cutoff = self.cutoff.saturating_add(1);
        }
        if self.cutoff >= last {
            self.playing = false;
        }
        true
    }

    /// Whether the reveal is running.
    pub const fn is_playing(&self) -> bool {
        self.playing
    }

    /// Autoplay period.
    pub const fn tick_period(&self) -> Duration {
        self.config.tick_period()
    }

    fn day_count(&self) -> usize {
        self.bundle
            .as_ref()
            .map_or(0, |bundle| bundle.trajectories.len())
    }

    fn last_index(&self) -> usize {
        self.day_count().saturating_sub(1)
    }

    /// Autoplay is off and the last day is revealed.
    fn is_complete(&self) -> bool {
        !self.playing && self.cutoff == self.last_index()
    }

    #[allow(clippy::cast_precision_loss)]
    fn progress(&self) -> f64 {
        match (self.bundle.as_ref(), self.last_index()) {
            (None, _) => 0.0,
            (Some(_), 0) => 1.0,
            (Some(_), last) => self.cutoff as f64 / last as f64,
        }
    }

    fn scenarios(&self) -> Vec<ScenarioRow> {
        let Some(bundle) = self.bundle.as_deref() else {
            return Vec::new();
        };
        let (Some(first), Some(current)) = (
            bundle.trajectories.first(),
            bundle.trajectories.get(self.cutoff),
        ) else {
            return Vec::new();
        };
        first
            .per_simulation_value
            .iter()
            .take(self.config.scenario_rows)
            .filter_map(|(&simulation, &start)| {
                let value = *current.per_simulation_value.get(&simulation)?;
                Some(ScenarioRow {
                    simulation,
                    value,
                    trend: Trend::between(start, value),
                })
            })
            .collect()
    }

    /// Derive the view for the current state.
    pub fn view(&self) -> TimeScrubberView {
        TimeScrubberView {
            params: self.params,
            loading: self.loading,
            playing: self.playing,
            day_count: self.day_count(),
            cutoff: self.cutoff,
            window: VisibleWindow {
                bundle: self.bundle.clone(),
                cutoff: self.cutoff,
            },
            progress: self.progress(),
            value_at_risk_95: self
                .bundle
                .as_ref()
                .filter(|_| self.is_complete())
                .map(|bundle| bundle.value_at_risk_95),
            scenarios: self.scenarios(),
            last_error: self.last_error.clone(),
        }
    }
}

#[derive(Debug)]
enum Command {
    Simulate(SimulationParams),
    Replay,
    Pause,
}

type SimulateFetch = JoinHandle<Result<SimulatePathsResponse, ComputeError>>;

/// Handle to a time scrubber running on its own task.
#[derive(Debug)]
pub struct TimeScrubber {
    handle: Handle<Command, TimeScrubberView>,
}

impl TimeScrubber {
    /// Spawn a scrubber backed by `service`.
    pub fn spawn<S: ComputeService>(service: Arc<S>, config: TimeScrubberConfig) -> Self {
        let state = TimeScrubberState::new(config);
        let handle = Handle::spawn(state.view(), move |mailbox, views| {
            run(service, state, mailbox, views)
        });
        Self { handle }
    }

    /// Fetch a new ensemble and start revealing it.
    pub async fn simulate(
        &self,
        params: SimulationParams,
    ) -> Result<TimeScrubberView, ControllerError> {
        self.handle.send(Command::Simulate(params)).await
    }

    /// Restart the reveal from day 0 without refetching.
    pub async fn replay(&self) -> Result<TimeScrubberView, ControllerError> {
        self.handle.send(Command::Replay).await
    }

    /// Stop the reveal.
    pub async fn pause(&self) -> Result<TimeScrubberView, ControllerError> {
        self.handle.send(Command::Pause).await
    }

    /// Latest published view.
    pub fn view(&self) -> TimeScrubberView {
        self.handle.view()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<TimeScrubberView> {
        self.handle.subscribe()
    }

    /// Stop the task and wait for it to finish.
    pub async fn shutdown(self) {
        self.handle.shutdown().await;
    }
}

async fn run<S: ComputeService>(
    service: Arc<S>,
    mut state: TimeScrubberState,
    mut mailbox: mpsc::Receiver<Envelope<Command, TimeScrubberView>>,
    views: watch::Sender<TimeScrubberView>,
) {
    let mut ticker = Ticker::new();
    let mut fetch: Option<SimulateFetch> = None;

    loop {
        ticker.sync(state.is_playing(), state.tick_period());

        tokio::select! {
            envelope = mailbox.recv() => {
                let Some(Envelope { command, reply }) = envelope else { break };
                let outcome = match command {
                    Command::Simulate(params) => match state.begin_simulate(params) {
                        Ok(params) => {
                            abort(&mut fetch);
                            let service = Arc::clone(&service);
                            fetch = Some(tokio::spawn(async move {
                                service.simulate_paths(params).await
                            }));
                            Ok(())
                        }
                        Err(err) => Err(ControllerError::from(err)),
                    },
                    Command::Replay => {
                        state.replay();
                        Ok(())
                    }
                    Command::Pause => {
                        state.pause();
                        Ok(())
                    }
                };
                let view = state.view();
                views.send_replace(view.clone());
                reply.send(outcome.map(|()| view));
            }
            () = ticker.tick() => {
                if state.tick() {
                    views.send_replace(state.view());
                }
            }
            joined = settle(&mut fetch) => {
                let outcome = joined.unwrap_or_else(|err| {
                    Err(ComputeError::Transport(format!("simulation task failed: {err}")))
                });
                state.finish_simulate(outcome);
                views.send_replace(state.view());
            }
        }
    }

    abort(&mut fetch);
    debug!("time scrubber stopped");
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use tokio::time::Instant;

    use super::*;
    use crate::testing::FakeService;

    /// Bundle whose simulation `s` moves by `s - 1` per day: sim 0 falls,
    /// sim 1 stays flat, sim 2 rises.
    fn bundle(days: u32) -> SimulatePathsResponse {
        let trajectories = (0..days)
            .map(|day| {
                let per_simulation_value: BTreeMap<u32, f64> = (0..3)
                    .map(|sim| {
                        let drift = (f64::from(sim) - 1.0) * f64::from(day);
                        (sim, 100.0 + drift)
                    })
                    .collect();
                DayFrame {
                    day,
                    per_simulation_value,
                    mean: 100.0,
                    p5: 95.0,
                    p95: 105.0,
                }
            })
            .collect();
        SimulatePathsResponse {
            trajectories,
            value_at_risk_95: 7.5,
        }
    }

    fn loaded(days: u32) -> TimeScrubberState {
        let mut state = TimeScrubberState::new(TimeScrubberConfig::default());
        state.begin_simulate(SimulationParams::default()).unwrap();
        state.finish_simulate(Ok(bundle(days)));
        state
    }

    #[test]
    fn invalid_params_are_rejected() {
        let mut state = TimeScrubberState::new(TimeScrubberConfig::default());
        let params = SimulationParams {
            simulation_count: 5001,
            ..SimulationParams::default()
        };
        assert!(matches!(
            state.begin_simulate(params),
            Err(ValidationError::Params {
                field: "simulation_count",
                ..
            })
        ));
        assert!(!state.view().loading);
    }

    #[test]
    fn simulate_clears_previous_bundle() {
        let mut state = loaded(4);
        state.begin_simulate(SimulationParams::default()).unwrap();
        let view = state.view();
        assert!(view.loading);
        assert_eq!(view.day_count, 0);
        assert!(view.window.is_empty());
        assert_eq!(view.value_at_risk_95, None);
    }

    #[test]
    fn reveal_runs_to_last_day_and_stops() {
        let mut state = loaded(4);
        assert!(state.is_playing());
        assert_eq!(state.view().window.len(), 1);

        for expected in 1..=3 {
            assert!(state.tick());
            assert_eq!(state.view().window.len(), expected + 1);
        }
        assert!(!state.is_playing());
        assert!(!state.tick());
        assert_eq!(state.view().cutoff, 3);
    }

    #[test]
    fn window_length_is_cutoff_plus_one() {
        let mut state = loaded(10);
        for _ in 0..5 {
            state.tick();
            let view = state.view();
            assert_eq!(view.window.len(), view.cutoff + 1);
            assert_eq!(view.window.last().map(|frame| frame.day), u32::try_from(view.cutoff).ok());
        }
    }

    #[test]
    fn value_at_risk_hidden_until_reveal_completes() {
        let mut state = loaded(3);
        assert_eq!(state.view().value_at_risk_95, None);
        state.pause();
        assert_eq!(state.view().value_at_risk_95, None);
        state.replay();
        state.tick();
        state.tick();
        assert_eq!(state.view().value_at_risk_95, Some(7.5));
        state.replay();
        assert_eq!(state.view().value_at_risk_95, None);
        state.tick();
        state.tick();
        assert_eq!(state.view().value_at_risk_95, Some(7.5));
    }

    #[test]
    fn single_day_bundle_is_complete_immediately() {
        let state = loaded(1);
        let view = state.view();
        assert!(!view.playing);
        assert_eq!(view.value_at_risk_95, Some(7.5));
        assert!((view.progress - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn replay_rewinds_without_refetch() {
        let mut state = loaded(3);
        state.tick();
        state.tick();
        state.replay();
        let view = state.view();
        assert_eq!(view.cutoff, 0);
        assert!(view.playing);
        assert_eq!(view.day_count, 3);
    }

    #[test]
    fn replay_without_bundle_is_noop() {
        let mut state = TimeScrubberState::new(TimeScrubberConfig::default());
        state.replay();
        assert!(!state.is_playing());
    }

    #[test]
    fn failed_or_empty_fetch_shows_nothing() {
        let mut state = TimeScrubberState::new(TimeScrubberConfig::default());
        state.begin_simulate(SimulationParams::default()).unwrap();
        state.finish_simulate(Err(ComputeError::Transport("refused".to_owned())));
        assert!(state.view().window.is_empty());
        assert!(state.view().last_error.is_some());

        state.begin_simulate(SimulationParams::default()).unwrap();
        state.finish_simulate(Ok(SimulatePathsResponse {
            trajectories: Vec::new(),
            value_at_risk_95: 1.0,
        }));
        assert_eq!(state.view().day_count, 0);
        assert!(!state.is_playing());
    }

    #[test]
    fn progress_and_scenarios_follow_cutoff() {
        let mut state = loaded(5);
        assert!(state.view().progress.abs() < f64::EPSILON);
        state.tick();
        state.tick();
        let view = state.view();
        assert!((view.progress - 0.5).abs() < f64::EPSILON);

        let trends: Vec<_> = view.scenarios.iter().map(|row| row.trend).collect();
        assert_eq!(trends, vec![Trend::Falling, Trend::Flat, Trend::Rising]);
        assert!((view.scenarios.first().unwrap().value - 98.0).abs() < f64::EPSILON);
    }

    #[test]
    fn window_serializes_as_revealed_frames() {
        let mut state = loaded(3);
        state.tick();
        let json = serde_json::to_value(state.view()).unwrap();
        let window = json.get("window").and_then(serde_json::Value::as_array).unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(json.get("value_at_risk_95"), Some(&serde_json::Value::Null));
    }

    #[test]
    fn scenario_rows_are_capped() {
        let mut state = TimeScrubberState::new(TimeScrubberConfig {
            scenario_rows: 2,
            ..TimeScrubberConfig::default()
        });
        state.begin_simulate(SimulationParams::default()).unwrap();
        state.finish_simulate(Ok(bundle(3)));
        let ids: Vec<_> = state.view().scenarios.iter().map(|row| row.simulation).collect();
        assert_eq!(ids, vec![0, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn reveals_one_day_per_tick() {
        let (service, replies) = FakeService::new();
        let scrubber = TimeScrubber::spawn(Arc::clone(&service), TimeScrubberConfig::default());
        let mut views = scrubber.subscribe();

        let params = SimulationParams {
            horizon_days: 4,
            ..SimulationParams::default()
        };
        let view = scrubber.simulate(params).await.unwrap();
        assert!(view.loading);

        replies.simulate.send(Ok(bundle(5))).unwrap();
        views.wait_for(|v| v.playing).await.unwrap();
        let start = Instant::now();

        let done = views.wait_for(|v| !v.playing).await.unwrap().clone();
        assert_eq!(done.cutoff, 4);
        assert_eq!(done.window.len(), 5);
        assert_eq!(done.value_at_risk_95, Some(7.5));
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(200), "{elapsed:?}");
        assert!(elapsed < Duration::from_millis(250), "{elapsed:?}");

        assert_eq!(service.simulate.requests(), vec![params]);
        scrubber.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn replay_and_pause_commands() {
        let (service, replies) = FakeService::new();
        let scrubber = TimeScrubber::spawn(Arc::clone(&service), TimeScrubberConfig::default());
        let mut views = scrubber.subscribe();

        scrubber.simulate(SimulationParams::default()).await.unwrap();
        replies.simulate.send(Ok(bundle(3))).unwrap();
        views.wait_for(|v| v.day_count == 3 && !v.playing).await.unwrap();

        let replayed = scrubber.replay().await.unwrap();
        assert_eq!(replayed.cutoff, 0);
        assert!(replayed.playing);
        assert_eq!(replayed.value_at_risk_95, None);

        let paused = scrubber.pause().await.unwrap();
        assert!(!paused.playing);
        assert_eq!(paused.cutoff, 0);
        assert_eq!(paused.value_at_risk_95, None);

        let resumed = scrubber.replay().await.unwrap();
        assert!(resumed.playing);
        let done = views.wait_for(|v| !v.playing && v.cutoff == 2).await.unwrap().clone();
        assert_eq!(done.value_at_risk_95, Some(7.5));
        assert_eq!(service.simulate.requests().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_params_never_reach_service() {
        let (service, _replies) = FakeService::new();
        let scrubber = TimeScrubber::spawn(Arc::clone(&service), TimeScrubberConfig::default());
        let params = SimulationParams {
            volatility: 1.5,
            ..SimulationParams::default()
        };

        let err = scrubber.simulate(params).await.unwrap_err();

        assert!(matches!(
            err,
            ControllerError::Validation(ValidationError::Params {
                field: "volatility",
                ..
            })
        ));
        assert!(service.simulate.requests().is_empty());
    }
}
