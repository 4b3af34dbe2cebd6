//! The compute service seam.
//!
//! Controllers are generic over [`ComputeService`] so tests can drive them
//! with scripted in-memory services while the session uses
//! [`HttpComputeService`](crate::http::HttpComputeService). The methods
//! return `Send` futures so calls can run on spawned tasks; the trait is
//! used through static dispatch only.

use std::future::Future;

use replay_types::{
    EvolveRequest, EvolveResponse, SimulatePathsResponse, SimulationParams, SolveBoardRequest,
    SolveBoardResponse,
};

use crate::error::ComputeError;

/// The three stateless request/response endpoints the controllers replay.
pub trait ComputeService: Send + Sync + 'static {
    /// Run the backtracking search and return its full trace.
    fn solve_board(
        &self,
        request: SolveBoardRequest,
    ) -> impl Future<Output = Result<SolveBoardResponse, ComputeError>> + Send;

    /// Simulate a price path ensemble.
    fn simulate_paths(
        &self,
        params: SimulationParams,
    ) -> impl Future<Output = Result<SimulatePathsResponse, ComputeError>> + Send;

    /// Evolve one generation of the route population.
    fn evolve_generation(
        &self,
        request: EvolveRequest,
    ) -> impl Future<Output = Result<EvolveResponse, ComputeError>> + Send;
}

/// Endpoints exposed by the compute service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    /// `POST /api/solve-board`
    SolveBoard,
    /// `POST /api/simulate-paths`
    SimulatePaths,
    /// `POST /api/evolve-generation`
    EvolveGeneration,
    /// `GET /api/health`
    Health,
}

impl Endpoint {
    /// Path relative to the service base URL.
    pub const fn path(self) -> &'static str {
        match self {
            Self::SolveBoard => "/api/solve-board",
            Self::SimulatePaths => "/api/simulate-paths",
            Self::EvolveGeneration => "/api/evolve-generation",
            Self::Health => "/api/health",
        }
    }
}

impl core::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.path())
    }
}
