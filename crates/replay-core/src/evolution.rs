//! Self-scheduling generational loop against the compute service.
//!
//! The driver owns the city list and the population. While running, exactly
//! one round per run is in flight: each round sends the cities and the
//! current population, and the response's population becomes the input of
//! the next round, dispatched as soon as the previous one is applied.
//!
//! ```text
//!            start()                 round ok (token live)
//!   Idle  ------------>  Running  ------------------------+
//!    ^                    |   ^                           |
//!    |  pause()/reset()   |   +-- dispatch next round <---+
//!    +--------------------+
//!    |  round failed      |
//!    +--------------------+
//! ```
//!
//! Pausing keeps every applied value, so a later `start()` resumes from the
//! retained population. A response is applied only when the token of the
//! run that dispatched it is still current and not cancelled; anything else
//! is discarded unapplied.

use std::sync::Arc;

use replay_client::{ComputeError, ComputeService};
use replay_types::{
    BestRoute, City, EvolveRequest, EvolveResponse, GenerationLogEntry, LogStatus, MIN_CITIES,
    Point, Tour, ValidationError,
};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::actor::{Envelope, Handle};
use crate::cancel::RunToken;
use crate::config::EvolutionConfig;
use crate::error::ControllerError;

/// Whether the round loop is active.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverPhase {
    /// No round will be dispatched.
    #[default]
    Idle,
    /// Rounds are being dispatched back to back.
    Running,
}

/// Result of feeding a round response to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundOutcome {
    /// The response belonged to a superseded or cancelled run.
    Discarded,
    /// The response was applied; the generation counter advanced.
    Applied,
    /// The round failed and the run was halted.
    Halted,
}

/// Everything the presentation layer needs to draw the optimizer.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvolutionView {
    /// Idle or running.
    pub phase: DriverPhase,
    /// Cities in creation order.
    pub cities: Vec<City>,
    /// Best route of the latest generation.
    pub best_route: Option<BestRoute>,
    /// Sample of population tours resolved to coordinates.
    pub ghosts: Vec<Vec<Point>>,
    /// Sampled generation history.
    pub log: Vec<GenerationLogEntry>,
    /// Generations applied since the last reset.
    pub generation: u64,
    /// Length of the current best route; 0 before the first generation.
    pub distance: f64,
    /// Number of tours in the retained population.
    pub population_size: usize,
    /// Whether `start` would be accepted.
    pub can_start: bool,
    /// Why the last run halted, if it did.
    pub last_error: Option<String>,
}

/// Synchronous evolution driver state machine.
///
/// The caller dispatches the request returned by
/// [`next_round`](Self::next_round) after a successful `start` and after
/// every applied round, and reports each response back through
/// [`apply_round`](Self::apply_round) together with the token it was
/// dispatched under.
#[derive(Debug, Clone)]
pub struct EvolutionState {
    config: EvolutionConfig,
    phase: DriverPhase,
    run: Option<RunToken>,
    cities: Vec<City>,
    population: Option<Vec<Tour>>,
    best_route: Option<BestRoute>,
    ghosts: Vec<Vec<Point>>,
    log: Vec<GenerationLogEntry>,
    generation: u64,
    last_error: Option<String>,
}

impl EvolutionState {
    /// Create an idle driver with no cities.
    pub const fn new(config: EvolutionConfig) -> Self {
        Self {
            config,
            phase: DriverPhase::Idle,
            run: None,
            cities: Vec::new(),
            population: None,
            best_route: None,
            ghosts: Vec::new(),
            log: Vec::new(),
            generation: 0,
            last_error: None,
        }
    }

    /// Append a city with the next sequential id.
    ///
    /// Dropped while running. A retained population no longer covers the
    /// grown city list, so it is discarded and the next run starts fresh.
    /// Returns whether the city was added.
    pub fn add_city(&mut self, point: Point) -> bool {
        if self.phase == DriverPhase::Running {
            debug!(x = point.x, y = point.y, "city dropped while running");
            return false;
        }
        let Ok(id) = u32::try_from(self.cities.len()) else {
            return false;
        };
        self.cities.push(City {
            id,
            x: point.x,
            y: point.y,
        });
        if self.population.take().is_some() {
            debug!(cities = self.cities.len(), "population discarded after city change");
        }
        true
    }

    /// Enter the running phase under a fresh run token.
    ///
    /// Returns `Ok(true)` when a run started and `Ok(false)` when one was
    /// already running.
    pub fn start(&mut self) -> Result<bool, ValidationError> {
        if self.phase == DriverPhase::Running {
            return Ok(false);
        }
        if self.cities.len() < MIN_CITIES {
            return Err(ValidationError::NotEnoughCities {
                count: self.cities.len(),
                required: MIN_CITIES,
            });
        }
        let token = RunToken::new();
        info!(
            run = %token.id(),
            cities = self.cities.len(),
            resumed = self.population.is_some(),
            "evolution started"
        );
        self.run = Some(token);
        self.phase = DriverPhase::Running;
        self.last_error = None;
        Ok(true)
    }

    /// Cancel the current run, keeping every applied value.
    pub fn pause(&mut self) {
        if let Some(token) = self.run.take() {
            token.cancel();
            info!(run = %token.id(), generation = self.generation, "evolution paused");
        }
        self.phase = DriverPhase::Idle;
    }

    /// Start when idle, pause when running.
    pub fn toggle(&mut self) -> Result<bool, ValidationError> {
        if self.phase == DriverPhase::Running {
            self.pause();
            Ok(false)
        } else {
            self.start()
        }
    }

    /// Cancel the current run and discard all state.
    pub fn reset(&mut self) {
        self.pause();
        self.cities.clear();
        self.population = None;
        self.best_route = None;
        self.ghosts.clear();
        self.log.clear();
        self.generation = 0;
        self.last_error = None;
    }

    /// Token and request for the next round, if the current run is live.
    pub fn next_round(&self) -> Option<(RunToken, EvolveRequest)> {
        let token = self.live_run()?;
        let request = EvolveRequest {
            cities: self.cities.clone(),
            population: self.population.clone(),
            population_size: self.config.population_size,
            mutation_rate: self.config.mutation_rate,
        };
        Some((token.clone(), request))
    }

    fn live_run(&self) -> Option<&RunToken> {
        self.run
            .as_ref()
            .filter(|token| self.phase == DriverPhase::Running && !token.is_cancelled())
    }

    /// Apply a round response dispatched under `token`.
    ///
    /// All indices are checked before anything is written, so state is
    /// either fully advanced by one generation or left untouched.
    pub fn apply_round(
        &mut self,
        token: &RunToken,
        outcome: Result<EvolveResponse, ComputeError>,
    ) -> RoundOutcome {
        if !self.live_run().is_some_and(|current| current.same_run(token)) {
            debug!(run = %token.id(), "discarding response from a stale run");
            return RoundOutcome::Discarded;
        }

        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                self.halt(&err);
                return RoundOutcome::Halted;
            }
        };
        let Some((route, ghosts)) = self.resolve(&response) else {
            let err = ComputeError::Decode(format!(
                "tour index out of range for {} cities",
                self.cities.len()
            ));
            self.halt(&err);
            return RoundOutcome::Halted;
        };

        self.generation = self.generation.saturating_add(1);
        self.best_route = Some(BestRoute {
            points: route,
            distance: response.best_distance,
        });
        self.ghosts = ghosts;
        self.population = Some(response.next_population);
        self.record(response.best_distance);
        debug!(
            run = %token.id(),
            generation = self.generation,
            distance = response.best_distance,
            "generation applied"
        );
        RoundOutcome::Applied
    }

    /// Resolve the best tour and the ghost sample; `None` if any tour in
    /// the response names a missing city.
    fn resolve(&self, response: &EvolveResponse) -> Option<(Vec<Point>, Vec<Vec<Point>>)> {
        if !response.best_distance.is_finite() {
            return None;
        }
        let route = response.best_tour.resolve(&self.cities)?;
        let mut ghosts = Vec::with_capacity(self.config.ghost_sample_size);
        for (index, tour) in response.next_population.iter().enumerate() {
            let points = tour.resolve(&self.cities)?;
            if index < self.config.ghost_sample_size {
                ghosts.push(points);
            }
        }
        Some((route, ghosts))
    }

    /// Append a log entry for the current generation if it is sampled.
    fn record(&mut self, raw_distance: f64) {
        let generation = self.generation;
        let sampled =
            generation == 1 || generation.checked_rem(self.config.log_interval) == Some(0);
        if !sampled {
            return;
        }

        let rounded = raw_distance.round();
        let previous = self.log.last();
        let improved = previous.is_some_and(|entry| rounded < entry.raw_distance);
        let status = match previous {
            None => LogStatus::Baseline,
            Some(_) if improved => LogStatus::Improved,
            Some(_) => LogStatus::Stable,
        };
        #[allow(clippy::cast_possible_truncation)]
        let distance = rounded as i64;
        info!(generation, distance, improved, "generation logged");
        self.log.push(GenerationLogEntry {
            generation,
            distance,
            raw_distance,
            improved,
            status,
        });
    }

    /// Halt the current run when a round was lost without a response.
    ///
    /// No-op while idle.
    pub fn abandon(&mut self, err: &ComputeError) {
        if self.is_running() {
            self.halt(err);
        }
    }

    /// Stop the current run after a failed round.
    fn halt(&mut self, err: &ComputeError) {
        warn!(error = %err, generation = self.generation, "evolution round failed");
        if let Some(token) = self.run.take() {
            token.cancel();
        }
        self.phase = DriverPhase::Idle;
        self.last_error = Some(err.to_string());
    }

    /// Whether rounds are being dispatched.
    pub fn is_running(&self) -> bool {
        self.phase == DriverPhase::Running
    }

    /// Derive the view for the current state.
    pub fn view(&self) -> EvolutionView {
        EvolutionView {
            phase: self.phase,
            cities: self.cities.clone(),
            best_route: self.best_route.clone(),
            ghosts: self.ghosts.clone(),
            log: self.log.clone(),
            generation: self.generation,
            distance: self.best_route.as_ref().map_or(0.0, |route| route.distance),
            population_size: self.population.as_ref().map_or(0, Vec::len),
            can_start: self.phase == DriverPhase::Idle && self.cities.len() >= MIN_CITIES,
            last_error: self.last_error.clone(),
        }
    }
}

#[derive(Debug)]
enum Command {
    AddCity(Point),
    Start,
    Pause,
    Toggle,
    Reset,
}

type Round = (RunToken, Result<EvolveResponse, ComputeError>);

/// Handle to an evolution driver running on its own task.
///
/// Dropping the handle (or calling [`shutdown`](Self::shutdown)) stops the
/// loop; rounds still in flight are aborted.
#[derive(Debug)]
pub struct EvolutionDriver {
    handle: Handle<Command, EvolutionView>,
}

impl EvolutionDriver {
    /// Spawn a driver backed by `service`.
    pub fn spawn<S: ComputeService>(service: Arc<S>, config: EvolutionConfig) -> Self {
        let state = EvolutionState::new(config);
        let handle = Handle::spawn(state.view(), move |mailbox, views| {
            run(service, state, mailbox, views)
        });
        Self { handle }
    }

    /// Place a city. Ignored while running.
    pub async fn add_city(&self, x: f64, y: f64) -> Result<EvolutionView, ControllerError> {
        self.handle.send(Command::AddCity(Point::new(x, y))).await
    }

    /// Start (or resume) the round loop.
    pub async fn start(&self) -> Result<EvolutionView, ControllerError> {
        self.handle.send(Command::Start).await
    }

    /// Stop dispatching rounds, keeping the applied state.
    pub async fn pause(&self) -> Result<EvolutionView, ControllerError> {
        self.handle.send(Command::Pause).await
    }

    /// Start when idle, pause when running.
    pub async fn toggle(&self) -> Result<EvolutionView, ControllerError> {
        self.handle.send(Command::Toggle).await
    }

    /// Stop and discard all state.
    pub async fn reset(&self) -> Result<EvolutionView, ControllerError> {
        self.handle.send(Command::Reset).await
    }

    /// Latest published view.
    pub fn view(&self) -> EvolutionView {
        self.handle.view()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<EvolutionView> {
        self.handle.subscribe()
    }

    /// Stop the task and wait for it to finish.
    pub async fn shutdown(self) {
        self.handle.shutdown().await;
    }
}

fn dispatch<S: ComputeService>(
    service: &Arc<S>,
    rounds: &mut JoinSet<Round>,
    state: &EvolutionState,
) {
    let Some((token, request)) = state.next_round() else {
        return;
    };
    debug!(
        run = %token.id(),
        cities = request.cities.len(),
        seeded = request.population.is_some(),
        "dispatching round"
    );
    let service = Arc::clone(service);
    rounds.spawn(async move {
        let outcome = service.evolve_generation(request).await;
        (token, outcome)
    });
}

async fn run<S: ComputeService>(
    service: Arc<S>,
    mut state: EvolutionState,
    mut mailbox: mpsc::Receiver<Envelope<Command, EvolutionView>>,
    views: watch::Sender<EvolutionView>,
) {
    let mut rounds: JoinSet<Round> = JoinSet::new();

    loop {
        tokio::select! {
            envelope = mailbox.recv() => {
                let Some(Envelope { command, reply }) = envelope else { break };
                let started = match command {
                    Command::AddCity(point) => {
                        state.add_city(point);
                        Ok(false)
                    }
                    Command::Start => state.start(),
                    Command::Pause => {
                        state.pause();
                        Ok(false)
                    }
                    Command::Toggle => state.toggle(),
                    Command::Reset => {
                        state.reset();
                        Ok(false)
                    }
                };
                if started == Ok(true) {
                    dispatch(&service, &mut rounds, &state);
                }
                let view = state.view();
                views.send_replace(view.clone());
                reply.send(started.map(|_| view).map_err(ControllerError::from));
            }
            Some(joined) = rounds.join_next(), if !rounds.is_empty() => {
                match joined {
                    Ok((token, outcome)) => {
                        if state.apply_round(&token, outcome) == RoundOutcome::Applied {
                            dispatch(&service, &mut rounds, &state);
                        }
                    }
                    Err(err) => {
                        state.abandon(&ComputeError::Transport(format!("round task failed: {err}")));
                    }
                }
                views.send_replace(state.view());
            }
        }
    }

    rounds.abort_all();
    debug!("evolution driver stopped");
}
