//! Discrete step player over a backtracking search trace.
//!
//! One `solve` fetches the whole trace; everything after that is local
//! replay. The player holds a cursor into the trace, an autoplay flag that
//! drives a recurring timer, and an attack-overlay toggle. Reaching the
//! last step stops autoplay for good (no wraparound).
//!
//! [`StepPlayerState`] is the synchronous state machine; [`StepPlayer`] runs
//! it on a tokio task and is what the presentation layer talks to.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use replay_client::{ComputeError, ComputeService};
use replay_types::{BoardSize, Phase, SolveBoardRequest, SolveBoardResponse, Step, ValidationError};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::actor::{Envelope, Handle};
use crate::attack::attacked_cells;
use crate::config::StepPlayerConfig;
use crate::error::ControllerError;
use crate::schedule::{Ticker, abort, settle};

/// One row of the step log shown beside the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepLogRow {
    /// 1-based step number.
    pub step: usize,
    /// Short action label.
    pub action: &'static str,
    /// Longer description of the action.
    pub detail: &'static str,
    /// Phase of the recorded step.
    pub phase: Phase,
}

impl StepLogRow {
    fn new(index: usize, phase: Phase) -> Self {
        let (action, detail) = match phase {
            Phase::Placing => ("Place", "searching for a safe square"),
            Phase::Backtracking => ("Backtrack", "dead end"),
        };
        Self {
            step: index.saturating_add(1),
            action,
            detail,
            phase,
        }
    }
}

/// Everything the presentation layer needs to draw the step player.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StepPlayerView {
    /// Board size of the current or pending solve.
    pub size: Option<BoardSize>,
    /// Number of steps in the trace.
    pub step_count: usize,
    /// Cursor into the trace; `None` while the trace is empty.
    pub cursor: Option<usize>,
    /// Board snapshot at the cursor.
    pub current: Option<Step>,
    /// Whether autoplay is on.
    pub playing: bool,
    /// Whether a solve is in flight.
    pub loading: bool,
    /// Whether `step_back` would move the cursor.
    pub can_step_back: bool,
    /// Whether `step_forward` would move the cursor.
    pub can_step_forward: bool,
    /// Whether the attack overlay is enabled.
    pub show_attacks: bool,
    /// Cells under attack at the cursor; empty when the overlay is off.
    pub attacked: BTreeSet<(u8, u8)>,
    /// Log rows for every step up to and including the cursor.
    pub log: Vec<StepLogRow>,
    /// Outcome message reported by the service for the last solve.
    pub message: Option<String>,
    /// Why the last solve failed, if it did.
    pub last_error: Option<String>,
}

/// Synchronous step player state machine.
#[derive(Debug, Clone)]
pub struct StepPlayerState {
    config: StepPlayerConfig,
    size: Option<BoardSize>,
    trace: Vec<Step>,
    cursor: Option<usize>,
    playing: bool,
    loading: bool,
    show_attacks: bool,
    message: Option<String>,
    last_error: Option<String>,
}

impl StepPlayerState {
    /// Create an empty player.
    pub const fn new(config: StepPlayerConfig) -> Self {
        Self {
            config,
            size: None,
            trace: Vec::new(),
            cursor: None,
            playing: false,
            loading: false,
            show_attacks: true,
            message: None,
            last_error: None,
        }
    }

    /// Validate `n` and enter the loading state.
    ///
    /// The current trace is discarded immediately. On success the caller
    /// issues the returned request and reports back through
    /// [`finish_solve`](Self::finish_solve).
    pub fn begin_solve(&mut self, n: u8) -> Result<SolveBoardRequest, ValidationError> {
        let size = BoardSize::new(n)?;
        self.size = Some(size);
        self.trace.clear();
        self.cursor = None;
        self.playing = false;
        self.loading = true;
        self.message = None;
        self.last_error = None;
        Ok(SolveBoardRequest { n: size })
    }

    /// Apply the outcome of the solve started by the last `begin_solve`.
    ///
    /// On success the trace is replaced, the cursor moves to the first step
    /// and autoplay starts. On failure the trace stays empty.
    pub fn finish_solve(&mut self, outcome: Result<SolveBoardResponse, ComputeError>) {
        self.loading = false;
        let Some(size) = self.size else {
            return;
        };
        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, %size, "solve failed");
                self.last_error = Some(err.to_string());
                return;
            }
        };
        if let Some(index) = response.first_malformed_step(size) {
            let err = ComputeError::Decode(format!("step {index} does not fit a {size} board"));
            warn!(error = %err, "solve returned a malformed trace");
            self.last_error = Some(err.to_string());
            return;
        }

        self.trace = response.trace;
        self.message = response.message;
        self.cursor = if self.trace.is_empty() { None } else { Some(0) };
        self.playing = self.trace.len() > 1;
        info!(%size, steps = self.trace.len(), "trace loaded");
    }

    /// Turn autoplay on. No-op on an empty trace or at the last step.
    pub fn play(&mut self) {
        if self.can_step_forward() {
            self.playing = true;
        }
    }

    /// Turn autoplay off.
    pub const fn pause(&mut self) {
        self.playing = false;
    }

    /// Flip autoplay.
    pub fn toggle(&mut self) {
        if self.playing {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Move the cursor one step forward; no-op at the last step.
    pub fn step_forward(&mut self) {
        if let Some(cursor) = self.cursor.filter(|_| self.can_step_forward()) {
            self.cursor = cursor.checked_add(1);
        }
    }

    /// Move the cursor one step back; no-op at the first step.
    pub fn step_back(&mut self) {
        if let Some(previous) = self.cursor.and_then(|cursor| cursor.checked_sub(1)) {
            self.cursor = Some(previous);
        }
    }

    /// Stop autoplay and rewind to the first step.
    pub fn reset(&mut self) {
        self.playing = false;
        self.cursor = if self.trace.is_empty() { None } else { Some(0) };
    }

    /// Enable or disable the attack overlay.
    pub const fn set_show_attacks(&mut self, enabled: bool) {
        self.show_attacks = enabled;
    }

    /// Advance one step on an autoplay tick.
    ///
    /// Returns whether anything changed. Ignored while autoplay is off;
    /// reaching the last step turns autoplay off.
    pub fn tick(&mut self) -> bool {
        if !self.playing {
            return false;
        }
        self.step_forward();
        if !self.can_step_forward() {
            self.playing = false;
        }
        true
    }

    /// Whether autoplay is on.
    pub const fn is_playing(&self) -> bool {
        self.playing
    }

    /// Autoplay period for the current board size.
    pub const fn tick_period(&self) -> Duration {
        match self.size {
            Some(size) => self.config.tick_period(size),
            None => Duration::from_millis(self.config.slow_tick_ms),
        }
    }

    fn can_step_forward(&self) -> bool {
        self.cursor
            .is_some_and(|cursor| cursor.saturating_add(1) < self.trace.len())
    }

    fn current(&self) -> Option<&Step> {
        self.cursor.and_then(|cursor| self.trace.get(cursor))
    }

    /// Derive the view for the current state.
    pub fn view(&self) -> StepPlayerView {
        let current = self.current();
        let attacked = match current {
            Some(step) if self.show_attacks => attacked_cells(step),
            _ => BTreeSet::new(),
        };
        let log = self
            .cursor
            .and_then(|cursor| self.trace.get(..=cursor))
            .unwrap_or_default()
            .iter()
            .enumerate()
            .map(|(index, step)| StepLogRow::new(index, step.phase))
            .collect();

        StepPlayerView {
            size: self.size,
            step_count: self.trace.len(),
            cursor: self.cursor,
            current: current.cloned(),
            playing: self.playing,
            loading: self.loading,
            can_step_back: self.cursor.is_some_and(|cursor| cursor > 0),
            can_step_forward: self.can_step_forward(),
            show_attacks: self.show_attacks,
            attacked,
            log,
            message: self.message.clone(),
            last_error: self.last_error.clone(),
        }
    }
}

#[derive(Debug)]
enum Command {
    Solve(u8),
    Play,
    Pause,
    Toggle,
    StepForward,
    StepBack,
    Reset,
    ShowAttacks(bool),
}

type SolveFetch = JoinHandle<Result<SolveBoardResponse, ComputeError>>;

/// Handle to a step player running on its own task.
///
/// Dropping the handle (or calling [`shutdown`](Self::shutdown)) stops the
/// task, its autoplay timer and any in-flight solve.
#[derive(Debug)]
pub struct StepPlayer {
    handle: Handle<Command, StepPlayerView>,
}

impl StepPlayer {
    /// Spawn a step player backed by `service`.
    pub fn spawn<S: ComputeService>(service: Arc<S>, config: StepPlayerConfig) -> Self {
        let state = StepPlayerState::new(config);
        let handle = Handle::spawn(state.view(), move |mailbox, views| {
            run(service, state, mailbox, views)
        });
        Self { handle }
    }

    /// Fetch and start replaying the trace for an `n`x`n` board.
    ///
    /// Resolves once the request is issued; the trace arrives later on the
    /// view channel. Supersedes any solve still in flight.
    pub async fn solve(&self, n: u8) -> Result<StepPlayerView, ControllerError> {
        self.handle.send(Command::Solve(n)).await
    }

    /// Turn autoplay on.
    pub async fn play(&self) -> Result<StepPlayerView, ControllerError> {
        self.handle.send(Command::Play).await
    }

    /// Turn autoplay off.
    pub async fn pause(&self) -> Result<StepPlayerView, ControllerError> {
        self.handle.send(Command::Pause).await
    }

    /// Flip autoplay.
    pub async fn toggle(&self) -> Result<StepPlayerView, ControllerError> {
        self.handle.send(Command::Toggle).await
    }

    /// Move one step forward.
    pub async fn step_forward(&self) -> Result<StepPlayerView, ControllerError> {
        self.handle.send(Command::StepForward).await
    }

    /// Move one step back.
    pub async fn step_back(&self) -> Result<StepPlayerView, ControllerError> {
        self.handle.send(Command::StepBack).await
    }

    /// Stop autoplay and rewind.
    pub async fn reset(&self) -> Result<StepPlayerView, ControllerError> {
        self.handle.send(Command::Reset).await
    }

    /// Enable or disable the attack overlay.
    pub async fn show_attacks(&self, enabled: bool) -> Result<StepPlayerView, ControllerError> {
        self.handle.send(Command::ShowAttacks(enabled)).await
    }

    /// Latest published view.
    pub fn view(&self) -> StepPlayerView {
        self.handle.view()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<StepPlayerView> {
        self.handle.subscribe()
    }

    /// Stop the task and wait for it to finish.
    pub async fn shutdown(self) {
        self.handle.shutdown().await;
    }
}

fn apply(state: &mut StepPlayerState, command: Command) {
    match command {
        Command::Play => state.play(),
        Command::Pause => state.pause(),
        Command::Toggle => state.toggle(),
        Command::StepForward => state.step_forward(),
        Command::StepBack => state.step_back(),
        Command::Reset => state.reset(),
        Command::ShowAttacks(enabled) => state.set_show_attacks(enabled),
        Command::Solve(_) => {}
    }
}

async fn run<S: ComputeService>(
    service: Arc<S>,
    mut state: StepPlayerState,
    mut mailbox: mpsc::Receiver<Envelope<Command, StepPlayerView>>,
    views: watch::Sender<StepPlayerView>,
) {
    let mut ticker = Ticker::new();
    let mut fetch: Option<SolveFetch> = None;

    loop {
        ticker.sync(state.is_playing(), state.tick_period());

        tokio::select! {
            envelope = mailbox.recv() => {
                let Some(Envelope { command, reply }) = envelope else { break };
                let outcome = match command {
                    Command::Solve(n) => match state.begin_solve(n) {
                        Ok(request) => {
                            abort(&mut fetch);
                            let service = Arc::clone(&service);
                            fetch = Some(tokio::spawn(async move {
                                service.solve_board(request).await
                            }));
                            Ok(())
                        }
                        Err(err) => Err(ControllerError::from(err)),
                    },
                    command => {
                        apply(&mut state, command);
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
                    Err(ComputeError::Transport(format!("solve task failed: {err}")))
                });
                state.finish_solve(outcome);
                views.send_replace(state.view());
            }
        }
    }

    abort(&mut fetch);
    debug!("step player stopped");
}
