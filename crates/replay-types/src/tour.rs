//! Genetic route optimizer: cities, tours, generation log entries and the
//! `evolve-generation` wire types.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Minimum number of cities before the optimizer may run.
pub const MIN_CITIES: usize = 3;

/// A position on the map, in display units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Point {
    /// Create a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// A city placed by the user. Ids follow creation order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct City {
    /// Creation index, also the city's position in the city list.
    pub id: u32,
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl City {
    /// Position of the city.
    pub const fn point(&self) -> Point {
        Point::new(self.x, self.y)
    }
}

/// A closed route visiting every city once, as indices into the city list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(transparent)]
#[ts(export, export_to = "bindings/")]
pub struct Tour(pub Vec<usize>);

impl Tour {
    /// Resolve the tour to city coordinates.
    ///
    /// Returns `None` if any index does not name a city.
    pub fn resolve(&self, cities: &[City]) -> Option<Vec<Point>> {
        self.0
            .iter()
            .map(|&index| cities.get(index).map(City::point))
            .collect()
    }

    /// Number of stops on the tour.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the tour has no stops.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<usize>> for Tour {
    fn from(indices: Vec<usize>) -> Self {
        Self(indices)
    }
}

/// Request body for `POST /api/evolve-generation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolveRequest {
    /// Every city placed so far, in id order.
    pub cities: Vec<City>,
    /// Population carried over from the previous round, `None` on a first round.
    pub population: Option<Vec<Tour>>,
    /// Population size the service should maintain.
    pub population_size: u32,
    /// Per-child mutation probability.
    pub mutation_rate: f64,
}

/// Response body of `POST /api/evolve-generation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvolveResponse {
    /// Shortest tour of the evaluated population.
    pub best_tour: Tour,
    /// Length of `best_tour`.
    pub best_distance: f64,
    /// Population to send with the next round.
    pub next_population: Vec<Tour>,
}

/// The current best tour resolved to coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct BestRoute {
    /// Stops in visiting order; the route closes back to the first stop.
    pub points: Vec<Point>,
    /// Route length as reported by the service.
    pub distance: f64,
}

/// How a logged generation compares to the one logged before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum LogStatus {
    /// First entry of a run history; nothing to compare against.
    Baseline,
    /// Shorter than the previous logged entry.
    Improved,
    /// Not shorter than the previous logged entry.
    Stable,
}

/// One sampled row of the generation history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GenerationLogEntry {
    /// Generation number, 1-based.
    pub generation: u64,
    /// Best distance rounded to the nearest integer.
    pub distance: i64,
    /// Best distance as reported.
    pub raw_distance: f64,
    /// Whether the rounded distance beat the previous entry's raw distance.
    pub improved: bool,
    /// Display label for the row.
    pub status: LogStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> Vec<City> {
        vec![
            City { id: 0, x: 0.0, y: 0.0 },
            City { id: 1, x: 10.0, y: 0.0 },
            City { id: 2, x: 0.0, y: 10.0 },
        ]
    }

    #[test]
    fn resolve_maps_indices_to_points() {
        let tour = Tour(vec![2, 0, 1]);
        let points = tour.resolve(&triangle());
        assert_eq!(
            points,
            Some(vec![Point::new(0.0, 10.0), Point::new(0.0, 0.0), Point::new(10.0, 0.0)])
        );
    }

    #[test]
    fn resolve_rejects_unknown_index() {
        assert!(Tour(vec![0, 3]).resolve(&triangle()).is_none());
    }

    #[test]
    fn first_round_request_sends_null_population() {
        let request = EvolveRequest {
            cities: triangle(),
            population: None,
            population_size: 100,
            mutation_rate: 0.1,
        };
        let json = serde_json::to_value(&request).unwrap_or_default();
        assert!(json.get("population").is_some_and(serde_json::Value::is_null));
        assert_eq!(json.get("cities").and_then(|c| c.as_array()).map(Vec::len), Some(3));
    }

    #[test]
    fn decodes_tours_as_plain_arrays() {
        let json = r#"{"best_tour":[0,1,2],"best_distance":34.14,"next_population":[[0,1,2],[2,1,0]]}"#;
        let response: Result<EvolveResponse, _> = serde_json::from_str(json);
        assert!(response.is_ok());
        let Ok(response) = response else { return };
        assert_eq!(response.best_tour, Tour(vec![0, 1, 2]));
        assert_eq!(response.next_population.len(), 2);
    }
}
