use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

pub const BOARD_SIZE: usize = 8;
pub const NUM_SQUARES: usize = BOARD_SIZE * BOARD_SIZE;

/// One of the two players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Black,
    White,
}

impl Side {
    pub fn opponent(self) -> Self {
        match self {
            Self::Black => Self::White,
            Self::White => Self::Black,
        }
    }

    /// Wire value used by `Board::to_array` and `Board::from_cells`: 1=black, 2=white.
    pub fn code(self) -> u8 {
        match self {
            Self::Black => 1,
            Self::White => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Black),
            2 => Some(Self::White),
            _ => None,
        }
    }
}

/// Contents of a single square.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cell {
    Empty,
    Black,
    White,
}

/// A board coordinate, row-major, both axes 0..8.
/// Only `Move::new` and validated deserialization build one from raw coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Coords")]
pub struct Move {
    row: u8,
    col: u8,
}

#[derive(Deserialize)]
struct Coords {
    row: u8,
    col: u8,
}

impl TryFrom<Coords> for Move {
    type Error = EngineError;

    fn try_from(coords: Coords) -> Result<Self, Self::Error> {
        Move::new(coords.row, coords.col)
    }
}

impl Move {
    pub fn new(row: u8, col: u8) -> Result<Self, EngineError> {
        if row as usize >= BOARD_SIZE || col as usize >= BOARD_SIZE {
            return Err(EngineError::OutOfRange { row, col });
        }
        Ok(Self { row, col })
    }

    /// Caller contract: `index < 64`.
    pub(crate) fn from_index(index: usize) -> Self {
        debug_assert!(index < NUM_SQUARES);
        Self {
            row: (index / BOARD_SIZE) as u8,
            col: (index % BOARD_SIZE) as u8,
        }
    }

    pub fn row(self) -> u8 {
        self.row
    }

    pub fn col(self) -> u8 {
        self.col
    }

    pub fn index(self) -> usize {
        self.row as usize * BOARD_SIZE + self.col as usize
    }

    pub(crate) fn bit(self) -> u64 {
        crate::board::bit(self.index())
    }
}

impl fmt::Display for Move {
    /// Algebraic notation: column letter then 1-based row, e.g. `d3`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", (b'a' + self.col) as char, self.row + 1)
    }
}

/// Outcome of one facade call, returned from `Engine::analyze` and the WASM boundary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchReport {
    pub best_move: Move,
    pub score: f32,
    /// Deepest fully completed heuristic iteration (0 when the move came from the fallback).
    pub depth: u8,
    /// `true` when the exact endgame solve finished and produced `best_move`.
    pub exact: bool,
    pub nodes: u64,
    pub tt_hits: u64,
    pub timed_out: bool,
}

/// Snapshot of a game for a host to render.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GameState {
    /// `Board::to_array` form.
    pub board: Vec<u8>,
    pub to_move: Side,
    pub black_count: u8,
    pub white_count: u8,
    pub is_game_over: bool,
    pub is_pass: bool,
    pub flipped: Vec<Move>,
}

/// Final result after game over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GameResult {
    pub winner: Option<Side>,
    pub black_count: u8,
    pub white_count: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opponent_swaps_sides() {
        assert_eq!(Side::Black.opponent(), Side::White);
        assert_eq!(Side::White.opponent(), Side::Black);
    }

    #[test]
    fn move_rejects_out_of_range_coordinates() {
        assert!(Move::new(7, 7).is_ok());
        assert!(matches!(
            Move::new(8, 0),
            Err(EngineError::OutOfRange { row: 8, col: 0 })
        ));
    }

    #[test]
    fn move_index_round_trips_and_renders_algebraic() {
        let mv = Move::new(2, 3).unwrap();

        assert_eq!(mv.index(), 19);
        assert_eq!(Move::from_index(19), mv);
        assert_eq!(mv.to_string(), "d3");
        assert_eq!((mv.row(), mv.col()), (2, 3));
    }

    #[test]
    fn deserialized_move_is_range_checked() {
        let mv: Move = serde_json::from_str(r#"{"row":2,"col":3}"#).unwrap();
        assert_eq!(mv, Move::new(2, 3).unwrap());

        assert!(serde_json::from_str::<Move>(r#"{"row":1,"col":11}"#).is_err());
        assert!(serde_json::from_str::<Move>(r#"{"row":8,"col":0}"#).is_err());
    }

    #[test]
    fn side_codes_round_trip() {
        for side in [Side::Black, Side::White] {
            assert_eq!(Side::from_code(side.code()), Some(side));
        }
        assert_eq!(Side::from_code(0), None);
        assert_eq!(Side::from_code(3), None);
    }
}
