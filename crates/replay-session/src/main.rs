//! Interactive session for the algorithm replay controllers.
//!
//! Reads one command per line from stdin, forwards it to the matching
//! controller and prints a one-line summary whenever a controller view
//! changes. Logs go to stderr so the rendered views on stdout stay
//! readable.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `replay-config.yaml` (or `REPLAY_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Probe the compute service health endpoint
//! 4. Spawn the three controllers and the view printer
//! 5. Run the command loop until `quit` or end of input
//! 6. Shut every controller down

mod command;
mod error;
mod render;

use std::path::PathBuf;
use std::sync::Arc;

use replay_client::HttpComputeService;
use replay_core::config::LogFormat;
use replay_core::{
    ControllerError, EvolutionDriver, EvolutionView, ReplayConfig, StepPlayer, StepPlayerView,
    TimeScrubber, TimeScrubberView,
};
use serde::Serialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::command::{Command, Panel, PathsCommand, QueensCommand, TspCommand, USAGE};
use crate::error::SessionError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "replay-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the configuration cannot be loaded or stdin cannot
/// be read.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let config = load_config()?;

    // 2. Initialize structured logging.
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.logging.level)),
        )
        .with_target(true)
        .with_writer(std::io::stderr);
    match config.logging.format {
        LogFormat::Text => subscriber.init(),
        LogFormat::Json => subscriber.json().init(),
    }

    info!(
        base_url = %config.service.base_url,
        population_size = config.evolution.population_size,
        "replay-session starting"
    );

    // 3. Probe the compute service. Unreachable is not fatal.
    let service = Arc::new(HttpComputeService::new(config.service.base_url.clone()));
    match service.health().await {
        Ok(status) if status.is_ok() => info!("compute service is healthy"),
        Ok(status) => warn!(status = %status.status, "compute service reports degraded health"),
        Err(err) => warn!(error = %err, "compute service unreachable, commands will fail until it is up"),
    }

    // 4. Spawn controllers and the view printer.
    let session = Session {
        queens: StepPlayer::spawn(Arc::clone(&service), config.step_player.clone()),
        paths: TimeScrubber::spawn(Arc::clone(&service), config.time_scrubber.clone()),
        tsp: EvolutionDriver::spawn(Arc::clone(&service), config.evolution.clone()),
    };
    let printer = tokio::spawn(print_views(
        session.queens.subscribe(),
        session.paths.subscribe(),
        session.tsp.subscribe(),
    ));

    // 5. Command loop.
    let outcome = command_loop(&session).await;

    // 6. Shutdown.
    printer.abort();
    session.shutdown().await;
    info!("replay-session stopped");
    outcome.map_err(Into::into)
}

/// Load configuration from `REPLAY_CONFIG` or `replay-config.yaml`.
///
/// An explicitly named file must exist; the default file is optional.
fn load_config() -> Result<ReplayConfig, SessionError> {
    if let Some(path) = std::env::var_os("REPLAY_CONFIG") {
        return Ok(ReplayConfig::from_file(&PathBuf::from(path))?);
    }
    let path = PathBuf::from(DEFAULT_CONFIG_PATH);
    if path.exists() {
        Ok(ReplayConfig::from_file(&path)?)
    } else {
        let mut config = ReplayConfig::default();
        config.service.apply_env_overrides();
        Ok(config)
    }
}

async fn command_loop(session: &Session) -> Result<(), SessionError> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    println!("{USAGE}");

    while let Some(line) = lines.next_line().await? {
        let command = match Command::parse(&line) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                println!("{err}\ntype `help` for the command list");
                continue;
            }
        };
        if command == Command::Quit {
            break;
        }
        match session.execute(command).await {
            Ok(Some(output)) => println!("{output}"),
            Ok(None) => {}
            Err(err) => println!("error: {err}"),
        }
    }
    Ok(())
}

/// The three controllers driven by one session.
struct Session {
    queens: StepPlayer,
    paths: TimeScrubber,
    tsp: EvolutionDriver,
}

impl Session {
    /// Run one command. Returns text to print, if any.
    async fn execute(&self, command: Command) -> Result<Option<String>, ControllerError> {
        match command {
            Command::Queens(command) => {
                match command {
                    QueensCommand::Solve(n) => self.queens.solve(n).await?,
                    QueensCommand::Play => self.queens.play().await?,
                    QueensCommand::Pause => self.queens.pause().await?,
                    QueensCommand::Next => self.queens.step_forward().await?,
                    QueensCommand::Prev => self.queens.step_back().await?,
                    QueensCommand::Reset => self.queens.reset().await?,
                    QueensCommand::Attacks(on) => self.queens.show_attacks(on).await?,
                };
            }
            Command::Paths(command) => {
                match command {
                    PathsCommand::Simulate(params) => self.paths.simulate(params).await?,
                    PathsCommand::Replay => self.paths.replay().await?,
                    PathsCommand::Pause => self.paths.pause().await?,
                };
            }
            Command::Tsp(command) => {
                match command {
                    TspCommand::Add { x, y } => self.tsp.add_city(x, y).await?,
                    TspCommand::Start => self.tsp.start().await?,
                    TspCommand::Pause => self.tsp.pause().await?,
                    TspCommand::Toggle => self.tsp.toggle().await?,
                    TspCommand::Reset => self.tsp.reset().await?,
                };
            }
            Command::Show { panel, json } => return Ok(Some(self.show(panel, json))),
            Command::Help => return Ok(Some(USAGE.to_owned())),
            Command::Quit => {}
        }
        Ok(None)
    }

    fn show(&self, panel: Panel, json: bool) -> String {
        match (panel, json) {
            (Panel::Queens, false) => render::queens_detail(&self.queens.view()),
            (Panel::Paths, false) => render::paths_detail(&self.paths.view()),
            (Panel::Tsp, false) => render::tsp_detail(&self.tsp.view()),
            (Panel::Queens, true) => to_json(&self.queens.view()),
            (Panel::Paths, true) => to_json(&self.paths.view()),
            (Panel::Tsp, true) => to_json(&self.tsp.view()),
        }
    }

    async fn shutdown(self) {
        let Self { queens, paths, tsp } = self;
        tokio::join!(queens.shutdown(), paths.shutdown(), tsp.shutdown());
    }
}

fn to_json<T: Serialize>(view: &T) -> String {
    serde_json::to_string_pretty(view).unwrap_or_else(|err| format!("error: {err}"))
}

/// Print a summary line whenever any controller publishes a new view.
///
/// Ends once every controller has shut down.
async fn print_views(
    mut queens: watch::Receiver<StepPlayerView>,
    mut paths: watch::Receiver<TimeScrubberView>,
    mut tsp: watch::Receiver<EvolutionView>,
) {
    let (mut queens_open, mut paths_open, mut tsp_open) = (true, true, true);
    while queens_open || paths_open || tsp_open {
        tokio::select! {
            changed = queens.changed(), if queens_open => match changed {
                Ok(()) => println!("{}", render::queens_summary(&queens.borrow_and_update())),
                Err(_) => queens_open = false,
            },
            changed = paths.changed(), if paths_open => match changed {
                Ok(()) => println!("{}", render::paths_summary(&paths.borrow_and_update())),
                Err(_) => paths_open = false,
            },
            changed = tsp.changed(), if tsp_open => match changed {
                Ok(()) => println!("{}", render::tsp_summary(&tsp.borrow_and_update())),
                Err(_) => tsp_open = false,
            },
        }
    }
}
