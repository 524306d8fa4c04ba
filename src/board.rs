use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;
use crate::types::{BOARD_SIZE, Cell, Move, NUM_SQUARES, Side};

const DIRECTIONS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];
const NOT_COL_0: u64 = 0xfefe_fefe_fefe_fefe;
const NOT_COL_7: u64 = 0x7f7f_7f7f_7f7f_7f7f;

/// a1, h1, a8, h8.
pub const CORNERS: [usize; 4] = [0, 7, 56, 63];
/// C- and X-squares touching each entry of `CORNERS`.
pub const CORNER_NEIGHBOURS: [u64; 4] = [
    bit(1) | bit(8) | bit(9),
    bit(6) | bit(15) | bit(14),
    bit(48) | bit(57) | bit(49),
    bit(62) | bit(55) | bit(54),
];

/// Othello board state represented by two bitboards, bit `row * 8 + col`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Board {
    black: u64,
    white: u64,
}

impl Board {
    /// Creates the initial board:
    /// d4=white, e4=black, d5=black, e5=white.
    pub fn new() -> Self {
        Self {
            black: bit(28) | bit(35),
            white: bit(27) | bit(36),
        }
    }

    pub fn empty() -> Self {
        Self { black: 0, white: 0 }
    }

    /// Builds a board from raw bitboards. Squares set in both masks are black.
    pub fn from_bitboards(black: u64, white: u64) -> Self {
        Self {
            black,
            white: white & !black,
        }
    }

    /// Parses the `[u8; 64]` wire form: 0=empty, 1=black, 2=white.
    pub fn from_cells(cells: &[u8]) -> Result<Self, EngineError> {
        if cells.len() != NUM_SQUARES {
            return Err(EngineError::InvalidBoard(format!(
                "expected {NUM_SQUARES} cells, got {}",
                cells.len()
            )));
        }

        let mut board = Self::empty();
        for (pos, &cell) in cells.iter().enumerate() {
            match Side::from_code(cell) {
                Some(Side::Black) => board.black |= bit(pos),
                Some(Side::White) => board.white |= bit(pos),
                None if cell == 0 => {}
                None => {
                    return Err(EngineError::InvalidBoard(format!(
                        "cell {pos} has invalid value {cell}"
                    )));
                }
            }
        }
        Ok(board)
    }

    pub fn bits(&self, side: Side) -> u64 {
        match side {
            Side::Black => self.black,
            Side::White => self.white,
        }
    }

    /// Returns `(own, opponent)` bitboards for `side`.
    pub(crate) fn sides(&self, side: Side) -> (u64, u64) {
        match side {
            Side::Black => (self.black, self.white),
            Side::White => (self.white, self.black),
        }
    }

    pub fn empty_mask(&self) -> u64 {
        !(self.black | self.white)
    }

    pub fn cell(&self, mv: Move) -> Cell {
        let square = mv.bit();
        if (self.black & square) != 0 {
            Cell::Black
        } else if (self.white & square) != 0 {
            Cell::White
        } else {
            Cell::Empty
        }
    }

    /// Walks from `mv` one step at a time in direction `(d_row, d_col)` over opponent stones.
    /// Returns the run when it is closed by a `side` stone, otherwise an empty run.
    /// An occupied target square or a zero direction yields an empty run.
    pub fn would_flip(&self, side: Side, mv: Move, d_row: i32, d_col: i32) -> Vec<Move> {
        let (me, opp) = self.sides(side);
        if (d_row == 0 && d_col == 0) || ((me | opp) & mv.bit()) != 0 {
            return Vec::new();
        }

        let mut run = Vec::new();
        let mut r = mv.row() as i32 + d_row;
        let mut c = mv.col() as i32 + d_col;

        while in_bounds(r, c) {
            let pos = r as usize * BOARD_SIZE + c as usize;
            let square = bit(pos);
            if (opp & square) != 0 {
                run.push(Move::from_index(pos));
            } else if (me & square) != 0 {
                return run;
            } else {
                break;
            }
            r += d_row;
            c += d_col;
        }

        Vec::new()
    }

    /// Mask of every stone `side` would flip by playing `mv`; 0 when the move is illegal.
    pub fn flips(&self, side: Side, mv: Move) -> u64 {
        let (me, opp) = self.sides(side);
        collect_flips(mv.index(), me, opp)
    }

    pub fn is_legal(&self, side: Side, mv: Move) -> bool {
        self.flips(side, mv) != 0
    }

    /// Returns legal move mask for the given side.
    pub fn legal_moves(&self, side: Side) -> u64 {
        let (me, opp) = self.sides(side);
        let mut candidates = self.empty_mask() & neighbours(opp);
        let mut legal = 0u64;

        while candidates != 0 {
            let pos = candidates.trailing_zeros() as usize;
            candidates &= candidates - 1;
            if collect_flips(pos, me, opp) != 0 {
                legal |= bit(pos);
            }
        }

        legal
    }

    /// Legal moves in row-major order.
    pub fn legal_move_list(&self, side: Side) -> Vec<Move> {
        mask_to_moves(self.legal_moves(side))
    }

    pub fn has_legal_move(&self, side: Side) -> bool {
        self.legal_moves(side) != 0
    }

    /// Returns the board after `side` plays `mv`, leaving `self` untouched.
    pub fn apply_move(&self, side: Side, mv: Move) -> Result<Board, EngineError> {
        let mut next = *self;
        if next.place(mv.index(), side) == 0 {
            return Err(EngineError::IllegalMove {
                row: mv.row(),
                col: mv.col(),
            });
        }
        Ok(next)
    }

    /// Places one stone and flips captured stones.
    /// Returns flipped bit mask. Returns 0 when move is illegal.
    pub(crate) fn place(&mut self, pos: usize, side: Side) -> u64 {
        let (me, opp) = self.sides(side);

        let flips = collect_flips(pos, me, opp);
        if flips == 0 {
            return 0;
        }

        let next_me = me | bit(pos) | flips;
        let next_opp = opp & !flips;

        match side {
            Side::Black => {
                self.black = next_me;
                self.white = next_opp;
            }
            Side::White => {
                self.white = next_me;
                self.black = next_opp;
            }
        }

        flips
    }

    /// Returns `(black_count, white_count)`.
    pub fn count(&self) -> (u8, u8) {
        (self.black.count_ones() as u8, self.white.count_ones() as u8)
    }

    pub fn stones(&self, side: Side) -> u8 {
        self.bits(side).count_ones() as u8
    }

    /// Returns the number of empty squares.
    pub fn empty_count(&self) -> u8 {
        let (black_count, white_count) = self.count();
        NUM_SQUARES as u8 - black_count - white_count
    }

    /// `true` when neither side can move, which includes a full board.
    pub fn is_game_over(&self) -> bool {
        !self.has_legal_move(Side::Black) && !self.has_legal_move(Side::White)
    }

    /// Converts board to `[u8; 64]` where 0=empty, 1=black, 2=white.
    pub fn to_array(&self) -> [u8; NUM_SQUARES] {
        let mut board = [0u8; NUM_SQUARES];
        for (pos, cell) in board.iter_mut().enumerate() {
            let square = bit(pos);
            *cell = if (self.black & square) != 0 {
                Side::Black.code()
            } else if (self.white & square) != 0 {
                Side::White.code()
            } else {
                0
            };
        }
        board
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl FromStr for Board {
    type Err = EngineError;

    /// Parses a diagram: `X`/`B` black, `O`/`W` white, `.`/`-` empty, whitespace ignored.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut cells = Vec::with_capacity(NUM_SQUARES);
        for ch in s.chars().filter(|ch| !ch.is_whitespace()) {
            let cell = match ch {
                'X' | 'x' | 'B' | 'b' => 1,
                'O' | 'o' | 'W' | 'w' => 2,
                '.' | '-' => 0,
                other => {
                    return Err(EngineError::InvalidBoard(format!(
                        "unexpected character {other:?} in diagram"
                    )));
                }
            };
            cells.push(cell);
        }
        Self::from_cells(&cells)
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (pos, cell) in self.to_array().iter().enumerate() {
            let ch = match cell {
                1 => 'X',
                2 => 'O',
                _ => '.',
            };
            write!(f, "{ch}")?;
            if pos % BOARD_SIZE == BOARD_SIZE - 1 {
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

pub(crate) const fn bit(pos: usize) -> u64 {
    if pos < NUM_SQUARES { 1u64 << pos } else { 0 }
}

pub(crate) fn mask_to_moves(mut mask: u64) -> Vec<Move> {
    let mut out = Vec::with_capacity(mask.count_ones() as usize);
    while mask != 0 {
        out.push(Move::from_index(mask.trailing_zeros() as usize));
        mask &= mask - 1;
    }
    out
}

/// Every square adjacent (8-neighbourhood) to a set bit.
pub(crate) fn neighbours(bits: u64) -> u64 {
    (bits << 8)
        | (bits >> 8)
        | ((bits << 1) & NOT_COL_0)
        | ((bits >> 1) & NOT_COL_7)
        | ((bits << 9) & NOT_COL_0)
        | ((bits >> 7) & NOT_COL_0)
        | ((bits << 7) & NOT_COL_7)
        | ((bits >> 9) & NOT_COL_7)
}

fn collect_flips(pos: usize, me: u64, opp: u64) -> u64 {
    if pos >= NUM_SQUARES {
        return 0;
    }

    let move_bit = bit(pos);
    if ((me | opp) & move_bit) != 0 {
        return 0;
    }

    let (row, col) = pos_to_row_col(pos);
    let mut flips = 0u64;

    for (dr, dc) in DIRECTIONS {
        let mut r = row + dr;
        let mut c = col + dc;
        let mut line = 0u64;

        while in_bounds(r, c) {
            let square = bit((r as usize) * BOARD_SIZE + c as usize);
            if (opp & square) != 0 {
                line |= square;
            } else {
                if (me & square) != 0 {
                    flips |= line;
                }
                break;
            }

            r += dr;
            c += dc;
        }
    }

    flips
}

fn pos_to_row_col(pos: usize) -> (i32, i32) {
    ((pos / BOARD_SIZE) as i32, (pos % BOARD_SIZE) as i32)
}

fn in_bounds(row: i32, col: i32) -> bool {
    (0..BOARD_SIZE as i32).contains(&row) && (0..BOARD_SIZE as i32).contains(&col)
}
