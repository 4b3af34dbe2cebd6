//! Attack overlay for a board snapshot.
//!
//! For every queen at `(row, col)`, every cell of `row` is attacked, and for
//! every other column at distance `d` the cells `(row + d, col')` and
//! `(row - d, col')` are attacked when they lie on the board. Columns are
//! not marked because a column never holds more than one queen. Cells
//! holding a queen are never part of the overlay.

use std::collections::BTreeSet;

use replay_types::Step;

/// Cells under attack on `step`, as `(row, col)` pairs.
///
/// Queens with a row outside the board are ignored.
pub fn attacked_cells(step: &Step) -> BTreeSet<(u8, u8)> {
    let Ok(n) = u8::try_from(step.board.len()) else {
        return BTreeSet::new();
    };
    let queens: BTreeSet<(u8, u8)> = step.queens().filter(|&(row, _)| row < n).collect();

    let mut cells = BTreeSet::new();
    for &(row, col) in &queens {
        for other in 0..n {
            cells.insert((row, other));
            let distance = other.abs_diff(col);
            if distance == 0 {
                continue;
            }
            if let Some(below) = row.checked_add(distance).filter(|r| *r < n) {
                cells.insert((below, other));
            }
            if let Some(above) = row.checked_sub(distance) {
                cells.insert((above, other));
            }
        }
    }
    cells.retain(|cell| !queens.contains(cell));
    cells
}

#[cfg(test)]
mod tests {
    use replay_types::Phase;

    use super::*;

    fn step(board: Vec<Option<u8>>) -> Step {
        Step {
            board,
            phase: Phase::Placing,
        }
    }

    #[test]
    fn empty_board_has_no_attacks() {
        assert!(attacked_cells(&step(vec![None; 8])).is_empty());
    }

    #[test]
    fn corner_queen_attacks_row_and_diagonal() {
        let mut board = vec![None; 8];
        if let Some(first) = board.first_mut() {
            *first = Some(0);
        }
        let cells = attacked_cells(&step(board));

        assert_eq!(cells.len(), 14);
        assert!(!cells.contains(&(0, 0)));
        for col in 1..8 {
            assert!(cells.contains(&(0, col)), "row cell (0, {col})");
            assert!(cells.contains(&(col, col)), "diagonal cell ({col}, {col})");
        }
        // Same column is not part of the overlay.
        assert!(!cells.contains(&(3, 0)));
    }

    #[test]
    fn centre_queen_attacks_both_diagonals() {
        // Queen at row 2, column 2 on a 5x5 board.
        let cells = attacked_cells(&step(vec![None, None, Some(2), None, None]));

        for (row, col) in [(0, 0), (1, 1), (3, 3), (4, 4), (4, 0), (3, 1), (1, 3), (0, 4)] {
            assert!(cells.contains(&(row, col)), "({row}, {col})");
        }
        for col in [0, 1, 3, 4] {
            assert!(cells.contains(&(2, col)));
        }
        assert!(!cells.contains(&(0, 1)));
        assert_eq!(cells.len(), 12);
    }

    #[test]
    fn occupied_cells_are_excluded() {
        // Two queens sharing a row attack each other; neither cell is marked.
        let cells = attacked_cells(&step(vec![Some(1), None, None, Some(1)]));
        assert!(!cells.contains(&(1, 0)));
        assert!(!cells.contains(&(1, 3)));
        assert!(cells.contains(&(1, 1)));
        assert!(cells.contains(&(1, 2)));
    }

    #[test]
    fn out_of_range_rows_are_ignored() {
        assert!(attacked_cells(&step(vec![Some(9), None, None, None])).is_empty());
    }
}
