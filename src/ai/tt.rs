use std::collections::HashMap;

use once_cell::sync::Lazy;

use crate::board::Board;
use crate::types::{Move, NUM_SQUARES, Side};

static ZOBRIST: Lazy<ZobristTable> = Lazy::new(ZobristTable::new);

/// Zobrist keys for both colours on every square plus the side to move.
pub struct ZobristTable {
    black: [u64; NUM_SQUARES],
    white: [u64; NUM_SQUARES],
    white_to_move: u64,
}

impl ZobristTable {
    /// Fixed seed so fingerprints are reproducible between runs.
    fn new() -> Self {
        const SEED: u64 = 0x1234_5678_9ABC_DEF0;

        let mut state = SEED;
        let mut next = || {
            state = state
                .wrapping_mul(6_364_136_223_846_793_005)
                .wrapping_add(1_442_695_040_888_963_407);
            state
        };

        let mut black = [0u64; NUM_SQUARES];
        let mut white = [0u64; NUM_SQUARES];
        for pos in 0..NUM_SQUARES {
            black[pos] = next();
            white[pos] = next();
        }
        let white_to_move = next();

        Self {
            black,
            white,
            white_to_move,
        }
    }

    pub fn hash(&self, board: &Board, to_move: Side) -> u64 {
        let mut hash = 0u64;

        let mut black_bits = board.bits(Side::Black);
        while black_bits != 0 {
            hash ^= self.black[black_bits.trailing_zeros() as usize];
            black_bits &= black_bits - 1;
        }

        let mut white_bits = board.bits(Side::White);
        while white_bits != 0 {
            hash ^= self.white[white_bits.trailing_zeros() as usize];
            white_bits &= white_bits - 1;
        }

        if to_move == Side::White {
            hash ^= self.white_to_move;
        }

        hash
    }
}

/// Position fingerprint used as the transposition-table key.
pub fn fingerprint(board: &Board, to_move: Side) -> u64 {
    ZOBRIST.hash(board, to_move)
}

/// How a stored score relates to the true value of the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Exact,
    /// True value >= score (fail-high).
    Lower,
    /// True value <= score (fail-low).
    Upper,
}

impl Bound {
    /// Classifies a fail-soft result against the window it was searched with.
    pub fn classify(score: f32, alpha: f32, beta: f32) -> Self {
        if score <= alpha {
            Self::Upper
        } else if score >= beta {
            Self::Lower
        } else {
            Self::Exact
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TtEntry {
    pub depth: u8,
    /// From the perspective of the side to move at the stored node.
    pub score: f32,
    pub bound: Bound,
    pub best_move: Option<Move>,
}

impl TtEntry {
    /// Returns the stored score when it settles a search of `depth` in `(alpha, beta)`.
    pub fn cutoff(&self, depth: u8, alpha: f32, beta: f32) -> Option<f32> {
        if self.depth < depth {
            return None;
        }
        match self.bound {
            Bound::Exact => Some(self.score),
            Bound::Lower if self.score >= beta => Some(self.score),
            Bound::Upper if self.score <= alpha => Some(self.score),
            _ => None,
        }
    }
}

/// Search cache owned by a single top-level move decision.
#[derive(Debug, Default)]
pub struct TranspositionTable {
    entries: HashMap<u64, TtEntry>,
}

impl TranspositionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn probe(&self, key: u64) -> Option<&TtEntry> {
        self.entries.get(&key)
    }

    /// Keeps the deeper of the stored and incoming entries.
    pub fn store(&mut self, key: u64, entry: TtEntry) {
        match self.entries.get(&key) {
            Some(existing) if existing.depth > entry.depth => {}
            _ => {
                self.entries.insert(key, entry);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
