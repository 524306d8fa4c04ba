use serde::{Deserialize, Serialize};

use crate::ai::eval::EvaluationStrategy;
use crate::board::{Board, CORNER_NEIGHBOURS, CORNERS, bit, neighbours};
use crate::types::{BOARD_SIZE, Move, Side};

/// Corners farther than this (Chebyshev distance) are ignored by the corner-gift check.
pub const CORNER_THREAT_RADIUS: u8 = 2;
const STABLE_CORNER_VALUE: f32 = 100.0;
const STABLE_EDGE_VALUE: f32 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrderingWeights {
    /// Per flipped stone.
    pub flip: f32,
    pub corner_move: f32,
    /// Penalty for an X- or C-square whose corner is still empty.
    pub corner_adjacent: f32,
    /// Penalty per corner the opponent can take along a line through the move.
    pub corner_gift: f32,
    /// Per opponent legal move removed by the move.
    pub opponent_mobility: f32,
    /// Bonus when the opponent is left without a legal move.
    pub wipeout: f32,
    /// Penalty for an edge stone not joined to an own corner.
    pub unanchored_edge: f32,
    /// Penalty for an edge move with no own stone around it.
    pub isolated_edge: f32,
    /// Multiplier on the change in coarse stability.
    pub stability: f32,
}

impl OrderingWeights {
    pub fn baseline() -> Self {
        Self {
            flip: 1000.0,
            corner_move: 20_000.0,
            corner_adjacent: 5000.0,
            corner_gift: 0.0,
            opponent_mobility: 10.0,
            wipeout: 30_000.0,
            unanchored_edge: 0.0,
            isolated_edge: 0.0,
            stability: 1.0,
        }
    }

    pub fn advanced() -> Self {
        Self {
            flip: 1000.0,
            corner_move: 10_000.0,
            corner_adjacent: 5000.0,
            corner_gift: 3000.0,
            opponent_mobility: 200.0,
            wipeout: 0.0,
            unanchored_edge: 800.0,
            isolated_edge: 1000.0,
            stability: 2.0,
        }
    }

    pub(crate) fn is_finite(&self) -> bool {
        [
            self.flip,
            self.corner_move,
            self.corner_adjacent,
            self.corner_gift,
            self.opponent_mobility,
            self.wipeout,
            self.unanchored_edge,
            self.isolated_edge,
            self.stability,
        ]
        .iter()
        .all(|w| w.is_finite())
    }
}

/// Orders moves for alpha-beta. Changes how fast the search prunes, never its result.
#[derive(Debug, Clone, Copy)]
pub struct MoveOrderer {
    weights: OrderingWeights,
}

impl MoveOrderer {
    pub fn new(weights: OrderingWeights) -> Self {
        Self { weights }
    }

    /// Sorts `moves` best-first. Equal scores keep their input order.
    pub fn order_moves<E: EvaluationStrategy + ?Sized>(
        &self,
        strategy: &E,
        board: &Board,
        side: Side,
        moves: &[Move],
    ) -> Vec<Move> {
        let context = OrderingContext::new(board, side);
        let mut scored: Vec<(Move, f32)> = moves
            .iter()
            .map(|&mv| (mv, self.score_with(strategy, board, side, mv, &context)))
            .collect();

        scored.sort_by(|(_, left), (_, right)| right.total_cmp(left));
        scored.into_iter().map(|(mv, _)| mv).collect()
    }

    fn score_with<E: EvaluationStrategy + ?Sized>(
        &self,
        strategy: &E,
        board: &Board,
        side: Side,
        mv: Move,
        context: &OrderingContext,
    ) -> f32 {
        let w = &self.weights;
        let opponent = side.opponent();
        let mut after = *board;
        let flips = after.place(mv.index(), side);
        let own_after = after.bits(side);

        let mut score = w.flip * flips.count_ones() as f32 + strategy.square_value(mv);

        if is_corner(mv) {
            score += w.corner_move;
        }
        if next_to_empty_corner(board, mv) {
            score -= w.corner_adjacent;
        }
        score -= w.corner_gift * corner_gifts(&after, opponent, mv) as f32;

        let opp_after = after.legal_moves(opponent).count_ones();
        score += w.opponent_mobility * (context.opp_moves as f32 - opp_after as f32);
        if opp_after == 0 {
            score += w.wipeout;
        }

        if is_edge(mv) && !is_corner(mv) {
            if !anchored_to_corner(own_after, mv) {
                score -= w.unanchored_edge;
            }
            if (context.own & neighbours(mv.bit())) == 0 {
                score -= w.isolated_edge;
            }
        }

        score + w.stability * (coarse_stability(own_after) - context.stability)
    }
}

/// Per-node values shared by every candidate move.
struct OrderingContext {
    own: u64,
    opp_moves: u32,
    stability: f32,
}

impl OrderingContext {
    fn new(board: &Board, side: Side) -> Self {
        let own = board.bits(side);
        Self {
            own,
            opp_moves: board.legal_moves(side.opponent()).count_ones(),
            stability: coarse_stability(own),
        }
    }
}

/// Instant move without search: corners first, then squares that do not sit beside an
/// empty corner, then the highest positional value. Ties keep the input order.
pub fn fallback_move<E: EvaluationStrategy + ?Sized>(
    strategy: &E,
    board: &Board,
    moves: &[Move],
) -> Option<Move> {
    let rank = |mv: Move| -> (u8, f32) {
        let tier = if is_corner(mv) {
            2
        } else if next_to_empty_corner(board, mv) {
            0
        } else {
            1
        };
        (tier, strategy.square_value(mv))
    };

    let mut best: Option<(Move, (u8, f32))> = None;
    for &mv in moves {
        let key = rank(mv);
        let better = match best {
            None => true,
            Some((_, (tier, value))) => key.0 > tier || (key.0 == tier && key.1 > value),
        };
        if better {
            best = Some((mv, key));
        }
    }
    best.map(|(mv, _)| mv)
}

/// Number of empty corners the opponent could take by flanking along the straight
/// line from that corner through `mv`, on the board after `mv` was played.
pub fn corner_gifts(after: &Board, opponent: Side, mv: Move) -> u32 {
    let mut gifts = 0;
    for &corner in &CORNERS {
        let corner_mv = Move::from_index(corner);
        if (after.empty_mask() & bit(corner)) == 0 {
            continue;
        }

        let dr = mv.row() as i32 - corner_mv.row() as i32;
        let dc = mv.col() as i32 - corner_mv.col() as i32;
        let distance = dr.abs().max(dc.abs());
        let straight = dr == 0 || dc == 0 || dr.abs() == dc.abs();
        if distance == 0 || distance > CORNER_THREAT_RADIUS as i32 || !straight {
            continue;
        }

        if !after
            .would_flip(opponent, corner_mv, dr.signum(), dc.signum())
            .is_empty()
        {
            gifts += 1;
        }
    }
    gifts
}

fn is_corner(mv: Move) -> bool {
    CORNERS.contains(&mv.index())
}

fn is_edge(mv: Move) -> bool {
    let last = (BOARD_SIZE - 1) as u8;
    mv.row() == 0 || mv.row() == last || mv.col() == 0 || mv.col() == last
}

fn next_to_empty_corner(board: &Board, mv: Move) -> bool {
    let empty = board.empty_mask();
    CORNERS
        .iter()
        .zip(CORNER_NEIGHBOURS.iter())
        .any(|(&corner, &adjacent)| (empty & bit(corner)) != 0 && (adjacent & mv.bit()) != 0)
}

/// `true` when every square from `mv` along its edge to one of the corners is in `own`.
fn anchored_to_corner(own: u64, mv: Move) -> bool {
    let last = (BOARD_SIZE - 1) as u8;
    let mut directions = Vec::with_capacity(4);
    if mv.row() == 0 || mv.row() == last {
        directions.extend([(0, -1), (0, 1)]);
    }
    if mv.col() == 0 || mv.col() == last {
        directions.extend([(-1, 0), (1, 0)]);
    }

    directions.into_iter().any(|(dr, dc)| {
        let mut r = mv.row() as i32 + dr;
        let mut c = mv.col() as i32 + dc;
        while (0..BOARD_SIZE as i32).contains(&r) && (0..BOARD_SIZE as i32).contains(&c) {
            if (own & bit(r as usize * BOARD_SIZE + c as usize)) == 0 {
                return false;
            }
            r += dr;
            c += dc;
        }
        true
    })
}

/// Held corners plus edge stones joined to a held corner.
fn coarse_stability(own: u64) -> f32 {
    let corners = CORNERS.iter().filter(|&&c| (own & bit(c)) != 0).count();
    if corners == 0 {
        return 0.0;
    }

    let mut edges = own & EDGE_SQUARES;
    let mut anchored = 0;
    while edges != 0 {
        let mv = Move::from_index(edges.trailing_zeros() as usize);
        edges &= edges - 1;
        if !is_corner(mv) && anchored_to_corner(own, mv) {
            anchored += 1;
        }
    }

    corners as f32 * STABLE_CORNER_VALUE + anchored as f32 * STABLE_EDGE_VALUE
}

const EDGE_SQUARES: u64 = 0xff81_8181_8181_81ff;
