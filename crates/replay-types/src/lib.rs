//! Shared type definitions for the algorithm replay controllers.
//!
//! This crate is the single source of truth for data exchanged with the
//! compute service and for the values the presentation layer renders.
//! Display types flow downstream to `TypeScript` via `ts-rs`.
//!
//! # Modules
//!
//! - [`board`] -- Backtracking search trace and `solve-board` wire types
//! - [`paths`] -- Price path ensemble frames and `simulate-paths` wire types
//! - [`tour`] -- Cities, tours, generation log and `evolve-generation` wire types
//! - [`error`] -- Local input validation errors

pub mod board;
pub mod error;
pub mod paths;
pub mod tour;

pub use board::{BoardSize, Phase, SolveBoardRequest, SolveBoardResponse, Step};
pub use error::ValidationError;
pub use paths::{DayFrame, MAX_SIMULATIONS, SimulatePathsResponse, SimulationParams};
pub use tour::{
    BestRoute, City, EvolveRequest, EvolveResponse, GenerationLogEntry, LogStatus, MIN_CITIES,
    Point, Tour,
};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation for the presentation layer.

    #[test]
    fn export_bindings() {
        // ts-rs writes the bindings to `bindings/` relative to the crate root.
        use ts_rs::TS;

        let _ = crate::board::BoardSize::export_all();
        let _ = crate::board::Phase::export_all();
        let _ = crate::board::Step::export_all();

        let _ = crate::paths::SimulationParams::export_all();
        let _ = crate::paths::DayFrame::export_all();

        let _ = crate::tour::Point::export_all();
        let _ = crate::tour::City::export_all();
        let _ = crate::tour::Tour::export_all();
        let _ = crate::tour::BestRoute::export_all();
        let _ = crate::tour::LogStatus::export_all();
        let _ = crate::tour::GenerationLogEntry::export_all();
    }
}
