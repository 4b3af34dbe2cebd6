//! Command-line parsing for the interactive session.
//!
//! One command per line, whitespace separated:
//!
//! ```text
//! queens solve <n> | play | pause | next | prev | reset | attacks on|off
//! paths simulate <price> <vol> <days> <sims> | replay | pause
//! tsp add <x> <y> | start | pause | toggle | reset
//! show queens|paths|tsp [json]
//! help | quit
//! ```

use std::str::FromStr;

use replay_types::SimulationParams;

/// Usage text printed by `help` and after a parse error.
pub const USAGE: &str = "\
commands:
  queens solve <n>          fetch and replay the search trace for an n x n board (4..=12)
  queens play|pause         start or stop autoplay
  queens next|prev          step forward or back
  queens reset              stop and rewind
  queens attacks on|off     toggle the attack overlay
  paths simulate <price> <vol> <days> <sims>
                            fetch and reveal a price path ensemble
  paths replay|pause        restart or stop the reveal
  tsp add <x> <y>           place a city
  tsp start|pause|toggle    run or stop the optimizer
  tsp reset                 discard cities and results
  show queens|paths|tsp [json]
                            print the full view
  help                      show this text
  quit                      exit";

/// Errors produced while parsing a command line.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// The first word is not a known command.
    #[error("unknown command `{0}`")]
    Unknown(String),

    /// The command is known but its arguments are wrong.
    #[error("usage: {0}")]
    Usage(&'static str),

    /// An argument is not a valid number.
    #[error("`{value}` is not a valid {expected}")]
    Number {
        /// The offending argument.
        value: String,
        /// What was expected.
        expected: &'static str,
    },
}

/// Board player commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueensCommand {
    /// Fetch a trace for an `n`x`n` board.
    Solve(u8),
    /// Start autoplay.
    Play,
    /// Stop autoplay.
    Pause,
    /// Step forward.
    Next,
    /// Step back.
    Prev,
    /// Stop and rewind.
    Reset,
    /// Toggle the attack overlay.
    Attacks(bool),
}

/// Path ensemble commands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PathsCommand {
    /// Fetch a new ensemble.
    Simulate(SimulationParams),
    /// Restart the reveal.
    Replay,
    /// Stop the reveal.
    Pause,
}

/// Route optimizer commands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TspCommand {
    /// Place a city.
    Add {
        /// Horizontal coordinate.
        x: f64,
        /// Vertical coordinate.
        y: f64,
    },
    /// Start or resume.
    Start,
    /// Pause.
    Pause,
    /// Start when idle, pause when running.
    Toggle,
    /// Discard everything.
    Reset,
}

/// Which controller a `show` targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    /// The board player.
    Queens,
    /// The path ensemble.
    Paths,
    /// The route optimizer.
    Tsp,
}

/// A parsed session command.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// Board player command.
    Queens(QueensCommand),
    /// Path ensemble command.
    Paths(PathsCommand),
    /// Route optimizer command.
    Tsp(TspCommand),
    /// Print a full view, as text or JSON.
    Show {
        /// Target controller.
        panel: Panel,
        /// Print the view as JSON.
        json: bool,
    },
    /// Print usage.
    Help,
    /// Exit the session.
    Quit,
}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Result<Option<Self>, ParseError> {
        let words: Vec<&str> = line.split_whitespace().collect();
        let command = match words.as_slice() {
            [] => return Ok(None),
            ["queens", rest @ ..] => Self::Queens(parse_queens(rest)?),
            ["paths", rest @ ..] => Self::Paths(parse_paths(rest)?),
            ["tsp", rest @ ..] => Self::Tsp(parse_tsp(rest)?),
            ["show", rest @ ..] => parse_show(rest)?,
            ["help"] => Self::Help,
            ["quit" | "exit"] => Self::Quit,
            [other, ..] => return Err(ParseError::Unknown((*other).to_owned())),
        };
        Ok(Some(command))
    }
}

fn parse_queens(args: &[&str]) -> Result<QueensCommand, ParseError> {
    const USAGE: &str = "queens solve <n> | play | pause | next | prev | reset | attacks on|off";
    Ok(match args {
        ["solve", n] => QueensCommand::Solve(number(n, "board size")?),
        ["play"] => QueensCommand::Play,
        ["pause"] => QueensCommand::Pause,
        ["next"] => QueensCommand::Next,
        ["prev"] => QueensCommand::Prev,
        ["reset"] => QueensCommand::Reset,
        ["attacks", "on"] => QueensCommand::Attacks(true),
        ["attacks", "off"] => QueensCommand::Attacks(false),
        _ => return Err(ParseError::Usage(USAGE)),
    })
}

fn parse_paths(args: &[&str]) -> Result<PathsCommand, ParseError> {
    const USAGE: &str = "paths simulate <price> <vol> <days> <sims> | replay | pause";
    Ok(match args {
        ["simulate", price, volatility, days, sims] => PathsCommand::Simulate(SimulationParams {
            initial_price: number(price, "price")?,
            volatility: number(volatility, "volatility")?,
            horizon_days: number(days, "day count")?,
            simulation_count: number(sims, "simulation count")?,
        }),
        ["simulate"] => PathsCommand::Simulate(SimulationParams::default()),
        ["replay"] => PathsCommand::Replay,
        ["pause"] => PathsCommand::Pause,
        _ => return Err(ParseError::Usage(USAGE)),
    })
}

fn parse_tsp(args: &[&str]) -> Result<TspCommand, ParseError> {
    const USAGE: &str = "tsp add <x> <y> | start | pause | toggle | reset";
    Ok(match args {
        ["add", x, y] => TspCommand::Add {
            x: number(x, "coordinate")?,
            y: number(y, "coordinate")?,
        },
        ["start"] => TspCommand::Start,
        ["pause"] => TspCommand::Pause,
        ["toggle"] => TspCommand::Toggle,
        ["reset"] => TspCommand::Reset,
        _ => return Err(ParseError::Usage(USAGE)),
    })
}

fn parse_show(args: &[&str]) -> Result<Command, ParseError> {
    const USAGE: &str = "show queens|paths|tsp [json]";
    let (panel, json) = match args {
        [panel] => (*panel, false),
        [panel, "json"] => (*panel, true),
        _ => return Err(ParseError::Usage(USAGE)),
    };
    let panel = match panel {
        "queens" => Panel::Queens,
        "paths" => Panel::Paths,
        "tsp" => Panel::Tsp,
        _ => return Err(ParseError::Usage(USAGE)),
    };
    Ok(Command::Show { panel, json })
}

fn number<T: FromStr>(value: &str, expected: &'static str) -> Result<T, ParseError> {
    value.parse().map_err(|_invalid| ParseError::Number {
        value: value.to_owned(),
        expected,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Command {
        Command::parse(line).unwrap().unwrap()
    }

    #[test]
    fn blank_line_is_no_command() {
        assert_eq!(Command::parse("   ").unwrap(), None);
    }

    #[test]
    fn queens_commands() {
        assert_eq!(parse("queens solve 8"), Command::Queens(QueensCommand::Solve(8)));
        assert_eq!(parse("  queens   next "), Command::Queens(QueensCommand::Next));
        assert_eq!(
            parse("queens attacks off"),
            Command::Queens(QueensCommand::Attacks(false))
        );
    }

    #[test]
    fn out_of_range_size_is_left_to_the_controller() {
        assert_eq!(parse("queens solve 13"), Command::Queens(QueensCommand::Solve(13)));
    }

    #[test]
    fn paths_simulate_with_arguments() {
        let expected = SimulationParams {
            initial_price: 50.0,
            volatility: 0.3,
            horizon_days: 10,
            simulation_count: 200,
        };
        assert_eq!(
            parse("paths simulate 50 0.3 10 200"),
            Command::Paths(PathsCommand::Simulate(expected))
        );
        assert_eq!(
            parse("paths simulate"),
            Command::Paths(PathsCommand::Simulate(SimulationParams::default()))
        );
    }

    #[test]
    fn tsp_commands() {
        assert_eq!(
            parse("tsp add 10 -2.5"),
            Command::Tsp(TspCommand::Add { x: 10.0, y: -2.5 })
        );
        assert_eq!(parse("tsp toggle"), Command::Tsp(TspCommand::Toggle));
    }

    #[test]
    fn show_and_meta_commands() {
        assert_eq!(
            parse("show tsp json"),
            Command::Show {
                panel: Panel::Tsp,
                json: true
            }
        );
        assert_eq!(parse("help"), Command::Help);
        assert_eq!(parse("exit"), Command::Quit);
    }

    #[test]
    fn errors_name_the_problem() {
        assert_eq!(
            Command::parse("dance").unwrap_err(),
            ParseError::Unknown("dance".to_owned())
        );
        assert!(matches!(
            Command::parse("queens solve"),
            Err(ParseError::Usage(_))
        ));
        assert_eq!(
            Command::parse("queens solve eight").unwrap_err(),
            ParseError::Number {
                value: "eight".to_owned(),
                expected: "board size"
            }
        );
        assert!(matches!(
            Command::parse("show maps"),
            Err(ParseError::Usage(_))
        ));
    }
}
