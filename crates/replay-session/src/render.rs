//! Plain-text rendering of controller views.
//!
//! Summaries are one line and printed on every view change; details are
//! printed on `show`.

use std::fmt::Write as _;

use replay_core::{DriverPhase, EvolutionView, StepPlayerView, TimeScrubberView, Trend};
use replay_types::LogStatus;

/// Number of step log rows shown under the board.
const LOG_TAIL: usize = 5;

/// One-line summary of the board player.
pub fn queens_summary(view: &StepPlayerView) -> String {
    let size = view
        .size
        .map_or_else(|| "-".to_owned(), |size| size.to_string());
    if view.loading {
        return format!("queens {size} loading");
    }
    if let Some(err) = &view.last_error {
        return format!("queens {size} failed: {err}");
    }
    match view.cursor {
        None => "queens idle".to_owned(),
        Some(cursor) => format!(
            "queens {size} step {}/{}{}{}",
            cursor.saturating_add(1),
            view.step_count,
            if view.playing { " playing" } else { "" },
            view.current
                .as_ref()
                .map(|step| format!(" [{:?}]", step.phase))
                .unwrap_or_default(),
        ),
    }
}

/// Board grid at the cursor plus the tail of the step log.
///
/// `Q` marks a queen, `x` an attacked cell when the overlay is on.
pub fn queens_detail(view: &StepPlayerView) -> String {
    let mut out = queens_summary(view);
    let Some(step) = &view.current else {
        return out;
    };
    let n = step.board.len();
    for row in 0..n {
        out.push('\n');
        for (col, cell) in step.board.iter().enumerate() {
            let marked = u8::try_from(row)
                .ok()
                .zip(u8::try_from(col).ok())
                .is_some_and(|pos| view.attacked.contains(&pos));
            let glyph = match cell {
                Some(queen) if usize::from(*queen) == row => 'Q',
                _ if marked => 'x',
                _ => '.',
            };
            out.push(glyph);
            if col.saturating_add(1) < n {
                out.push(' ');
            }
        }
    }
    let skip = view.log.len().saturating_sub(LOG_TAIL);
    for row in view.log.iter().skip(skip) {
        let _ = write!(out, "\n  #{:<4} {:<9} {}", row.step, row.action, row.detail);
    }
    out
}

/// One-line summary of the path ensemble.
pub fn paths_summary(view: &TimeScrubberView) -> String {
    if view.loading {
        return "paths loading".to_owned();
    }
    if let Some(err) = &view.last_error {
        return format!("paths failed: {err}");
    }
    let Some(frame) = view.window.last() else {
        return "paths idle".to_owned();
    };
    let mut line = format!(
        "paths day {}/{} mean {:.2} [p5 {:.2}, p95 {:.2}] {:.0}%",
        frame.day,
        view.day_count.saturating_sub(1),
        frame.mean,
        frame.p5,
        frame.p95,
        view.progress * 100.0,
    );
    if let Some(var) = view.value_at_risk_95 {
        let _ = write!(line, " VaR95 {var:.2}");
    }
    line
}

/// Summary plus the scenario table.
pub fn paths_detail(view: &TimeScrubberView) -> String {
    let mut out = paths_summary(view);
    for row in &view.scenarios {
        let arrow = match row.trend {
            Trend::Rising => "up",
            Trend::Falling => "down",
            Trend::Flat => "flat",
        };
        let _ = write!(out, "\n  sim {:<4} {:>10.2} {arrow}", row.simulation, row.value);
    }
    out
}

/// One-line summary of the route optimizer.
pub fn tsp_summary(view: &EvolutionView) -> String {
    let phase = match view.phase {
        DriverPhase::Idle => "idle",
        DriverPhase::Running => "running",
    };
    let mut line = format!(
        "tsp {phase} cities {} generation {}",
        view.cities.len(),
        view.generation
    );
    if view.best_route.is_some() {
        let _ = write!(line, " distance {:.2}", view.distance);
    }
    if view.population_size > 0 {
        let _ = write!(line, " population {}", view.population_size);
    }
    if let Some(err) = &view.last_error {
        let _ = write!(line, " failed: {err}");
    }
    line
}

/// Summary plus cities, best route and generation log.
pub fn tsp_detail(view: &EvolutionView) -> String {
    let mut out = tsp_summary(view);
    for city in &view.cities {
        let _ = write!(out, "\n  city {:<3} ({:.1}, {:.1})", city.id, city.x, city.y);
    }
    if let Some(route) = &view.best_route {
        let stops: Vec<String> = route
            .points
            .iter()
            .map(|p| format!("({:.1}, {:.1})", p.x, p.y))
            .collect();
        let _ = write!(out, "\n  best {}", stops.join(" -> "));
    }
    for entry in &view.log {
        let status = match entry.status {
            LogStatus::Baseline => "baseline",
            LogStatus::Improved => "improved",
            LogStatus::Stable => "stable",
        };
        let _ = write!(
            out,
            "\n  gen {:<6} {:>8} {status}",
            entry.generation, entry.distance
        );
    }
    out
}
