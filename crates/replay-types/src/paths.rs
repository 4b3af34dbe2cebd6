//! Monte-Carlo price path ensemble: parameters, day frames and the
//! `simulate-paths` wire types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;

/// Largest ensemble the service accepts in one request.
pub const MAX_SIMULATIONS: u32 = 5000;

/// Parameters of one ensemble simulation.
///
/// Also the request body for `POST /api/simulate-paths`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SimulationParams {
    /// Starting price, strictly positive.
    pub initial_price: f64,
    /// Annualized volatility in `[0, 1]`.
    pub volatility: f64,
    /// Number of trading days to project, at least 1.
    pub horizon_days: u32,
    /// Number of simulated paths, `1..=MAX_SIMULATIONS`.
    pub simulation_count: u32,
}

impl Default for SimulationParams {
    fn default() -> Self {
        Self {
            initial_price: 100.0,
            volatility: 0.2,
            horizon_days: 30,
            simulation_count: 500,
        }
    }
}

impl SimulationParams {
    /// Check every field against its allowed range.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::Params`] naming the first invalid field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(self.initial_price.is_finite() && self.initial_price > 0.0) {
            return Err(ValidationError::Params {
                field: "initial_price",
                reason: format!("must be a positive number, got {}", self.initial_price),
            });
        }
        if !(0.0..=1.0).contains(&self.volatility) {
            return Err(ValidationError::Params {
                field: "volatility",
                reason: format!("must lie in [0, 1], got {}", self.volatility),
            });
        }
        if self.horizon_days == 0 {
            return Err(ValidationError::Params {
                field: "horizon_days",
                reason: "must be at least 1".to_owned(),
            });
        }
        if self.simulation_count == 0 || self.simulation_count > MAX_SIMULATIONS {
            return Err(ValidationError::Params {
                field: "simulation_count",
                reason: format!(
                    "must lie in 1..={MAX_SIMULATIONS}, got {}",
                    self.simulation_count
                ),
            });
        }
        Ok(())
    }
}

/// Ensemble statistics for a single day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct DayFrame {
    /// Day index, 0 is the starting price.
    pub day: u32,
    /// Sampled path values keyed by simulation id.
    pub per_simulation_value: BTreeMap<u32, f64>,
    /// Ensemble mean.
    pub mean: f64,
    /// 5th percentile.
    pub p5: f64,
    /// 95th percentile.
    pub p95: f64,
}

/// Response body of `POST /api/simulate-paths`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulatePathsResponse {
    /// Day-ordered frames, `horizon_days + 1` of them.
    pub trajectories: Vec<DayFrame>,
    /// Loss not exceeded in 95% of outcomes.
    pub value_at_risk_95: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_params_are_valid() {
        assert!(SimulationParams::default().validate().is_ok());
    }

    #[test]
    fn rejects_each_bad_field() {
        let base = SimulationParams::default();
        let cases = [
            (SimulationParams { initial_price: 0.0, ..base }, "initial_price"),
            (SimulationParams { initial_price: f64::NAN, ..base }, "initial_price"),
            (SimulationParams { volatility: 1.5, ..base }, "volatility"),
            (SimulationParams { volatility: -0.1, ..base }, "volatility"),
            (SimulationParams { horizon_days: 0, ..base }, "horizon_days"),
            (SimulationParams { simulation_count: 0, ..base }, "simulation_count"),
            (SimulationParams { simulation_count: 5001, ..base }, "simulation_count"),
        ];
        for (params, expected) in cases {
            match params.validate() {
                Err(ValidationError::Params { field, .. }) => assert_eq!(field, expected),
                other => panic!("expected {expected} to be rejected, got {other:?}"),
            }
        }
    }

    #[test]
    fn volatility_bounds_are_inclusive() {
        let base = SimulationParams::default();
        assert!(SimulationParams { volatility: 0.0, ..base }.validate().is_ok());
        assert!(SimulationParams { volatility: 1.0, ..base }.validate().is_ok());
    }

    #[test]
    fn decodes_string_keyed_simulation_map() {
        let json = r#"{"trajectories":[{"day":0,"per_simulation_value":{"0":100.0,"1":100.0},
                       "mean":100.0,"p5":100.0,"p95":100.0}],"value_at_risk_95":7.5}"#;
        let response: Result<SimulatePathsResponse, _> = serde_json::from_str(json);
        assert!(response.is_ok(), "{response:?}");
        let Ok(response) = response else { return };
        let frame = response.trajectories.first();
        assert_eq!(frame.map(|f| f.per_simulation_value.len()), Some(2));
        assert_eq!(frame.and_then(|f| f.per_simulation_value.get(&1)).copied(), Some(100.0));
    }
}
