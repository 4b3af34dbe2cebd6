//! Backtracking board search: trace steps and the `solve-board` wire types.
//!
//! A board is stored column-major: `board[col]` holds the row of the queen
//! placed in that column, or `None` while the column is empty. The compute
//! service encodes empty columns as `-1`; `null` is accepted as well.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::ValidationError;

/// Validated board size for a solve request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[serde(try_from = "u8", into = "u8")]
#[ts(export, export_to = "bindings/", type = "number")]
pub struct BoardSize(u8);

impl BoardSize {
    /// Smallest board the service will solve.
    pub const MIN: u8 = 4;
    /// Largest board the service will solve.
    pub const MAX: u8 = 12;

    /// Validate a requested board size.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::BoardSize`] when `n` is outside
    /// [`Self::MIN`]..=[`Self::MAX`].
    pub const fn new(n: u8) -> Result<Self, ValidationError> {
        if n < Self::MIN || n > Self::MAX {
            return Err(ValidationError::BoardSize {
                n,
                min: Self::MIN,
                max: Self::MAX,
            });
        }
        Ok(Self(n))
    }

    /// Return the number of rows (and columns).
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for BoardSize {
    type Error = ValidationError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Self::new(n)
    }
}

impl From<BoardSize> for u8 {
    fn from(size: BoardSize) -> Self {
        size.0
    }
}

impl core::fmt::Display for BoardSize {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}x{}", self.0, self.0)
    }
}

/// What the search was doing when a step was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum Phase {
    /// A queen was placed on a safe square.
    Placing,
    /// A queen was lifted after a dead end.
    Backtracking,
}

/// One recorded board state of the backtracking search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Step {
    /// Queen row per column, `None` for an empty column.
    #[serde(with = "cells")]
    #[ts(type = "Array<number>")]
    pub board: Vec<Option<u8>>,
    /// Search phase that produced this board.
    pub phase: Phase,
}

impl Step {
    /// Iterate over placed queens as `(row, col)` pairs.
    pub fn queens(&self) -> impl Iterator<Item = (u8, u8)> + '_ {
        self.board
            .iter()
            .zip(0_u8..)
            .filter_map(|(cell, col)| cell.map(|row| (row, col)))
    }
}

/// Request body for `POST /api/solve-board`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveBoardRequest {
    /// Board size.
    pub n: BoardSize,
}

/// Response body of `POST /api/solve-board`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SolveBoardResponse {
    /// Ordered search trace.
    pub trace: Vec<Step>,
    /// Human-readable outcome reported by the service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SolveBoardResponse {
    /// Index of the first step whose board does not have `size` columns
    /// or holds a row outside the board.
    pub fn first_malformed_step(&self, size: BoardSize) -> Option<usize> {
        let n = usize::from(size.get());
        self.trace.iter().position(|step| {
            step.board.len() != n || step.board.iter().flatten().any(|row| *row >= size.get())
        })
    }
}

/// Serde adapter mapping `None` to the service's `-1` sentinel.
mod cells {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(board: &[Option<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(board.iter().map(|cell| cell.map_or(-1_i16, i16::from)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Option<u8>>, D::Error> {
        let raw: Vec<Option<i64>> = Vec::deserialize(deserializer)?;
        raw.into_iter()
            .map(|cell| match cell {
                None => Ok(None),
                Some(row) if row < 0 => Ok(None),
                Some(row) => u8::try_from(row)
                    .map(Some)
                    .map_err(|e| D::Error::custom(format!("row index {row} out of range: {e}"))),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_size_bounds() {
        assert!(BoardSize::new(3).is_err());
        assert!(BoardSize::new(4).is_ok());
        assert!(BoardSize::new(12).is_ok());
        assert!(matches!(
            BoardSize::new(13),
            Err(ValidationError::BoardSize { n: 13, min: 4, max: 12 })
        ));
    }

    #[test]
    fn decoding_enforces_board_size_bounds() {
        let eight: Result<BoardSize, _> = serde_json::from_str("8");
        assert_eq!(eight.ok().map(BoardSize::get), Some(8));
        assert!(serde_json::from_str::<BoardSize>("3").is_err());
        assert!(serde_json::from_str::<BoardSize>("13").is_err());
        let twelve = BoardSize::new(12).map(|size| serde_json::to_string(&size).ok());
        assert_eq!(twelve.ok().flatten().as_deref(), Some("12"));
    }

    #[test]
    fn decodes_sentinel_and_null_as_empty() {
        let json = r#"{"trace":[{"board":[1,-1,null,3],"phase":"placing"},
                      {"board":[1,-1,-1,-1],"phase":"backtracking"}]}"#;
        let response: Result<SolveBoardResponse, _> = serde_json::from_str(json);
        assert!(response.is_ok());
        let Ok(response) = response else { return };
        assert_eq!(response.trace.len(), 2);
        assert_eq!(
            response.trace.first().map(|s| s.board.clone()),
            Some(vec![Some(1), None, None, Some(3)])
        );
        assert_eq!(response.trace.get(1).map(|s| s.phase), Some(Phase::Backtracking));
        assert!(response.message.is_none());
    }

    #[test]
    fn encodes_empty_as_minus_one() {
        let step = Step {
            board: vec![Some(0), None],
            phase: Phase::Placing,
        };
        let json = serde_json::to_string(&step).unwrap_or_default();
        assert_eq!(json, r#"{"board":[0,-1],"phase":"placing"}"#);
    }

    #[test]
    fn rejects_oversized_row() {
        let json = r#"{"board":[300],"phase":"placing"}"#;
        assert!(serde_json::from_str::<Step>(json).is_err());
    }

    #[test]
    fn queens_lists_occupied_columns() {
        let step = Step {
            board: vec![Some(2), None, Some(0)],
            phase: Phase::Placing,
        };
        let queens: Vec<_> = step.queens().collect();
        assert_eq!(queens, vec![(2, 0), (0, 2)]);
    }

    #[test]
    fn malformed_step_detection() {
        let size = BoardSize::new(4).unwrap_or(BoardSize(4));
        let good = Step {
            board: vec![Some(1), None, None, None],
            phase: Phase::Placing,
        };
        let short = Step {
            board: vec![Some(1)],
            phase: Phase::Placing,
        };
        let off_board = Step {
            board: vec![Some(4), None, None, None],
            phase: Phase::Placing,
        };
        let response = SolveBoardResponse {
            trace: vec![good.clone(), short],
            message: None,
        };
        assert_eq!(response.first_malformed_step(size), Some(1));
        let response = SolveBoardResponse {
            trace: vec![good.clone(), off_board],
            message: None,
        };
        assert_eq!(response.first_malformed_step(size), Some(1));
        let response = SolveBoardResponse {
            trace: vec![good],
            message: Some("solved".to_owned()),
        };
        assert_eq!(response.first_malformed_step(size), None);
    }
}
