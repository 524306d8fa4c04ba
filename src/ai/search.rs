use std::time::Duration;

use log::{debug, warn};
use web_time::Instant;

use crate::ai::eval::EvaluationStrategy;
use crate::ai::ordering::{MoveOrderer, fallback_move};
use crate::ai::rollout::{Rollout, RolloutConfig};
use crate::ai::tt::{Bound, TranspositionTable, TtEntry, fingerprint};
use crate::board::{Board, mask_to_moves};
use crate::types::{Move, SearchReport, Side};

pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
/// Score per disc of final margin. Any decided game outranks a heuristic score.
pub const EXACT_SCALE: f32 = 10_000.0;
const MIN_SCORE: f32 = f32::NEG_INFINITY;
const MAX_SCORE: f32 = f32::INFINITY;
/// Nodes between clock reads inside the tree.
const CLOCK_INTERVAL: u64 = 256;
/// Nodes closer to the leaves than this keep generation order.
const ORDERING_MIN_DEPTH: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
enum SearchResult {
    Complete(Option<Move>, f32),
    TimedOut,
}

impl SearchResult {
    fn negate(self) -> Self {
        match self {
            Self::Complete(mv, score) => Self::Complete(mv, -score),
            Self::TimedOut => Self::TimedOut,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchLimits {
    /// Maximum heuristic depth in plies.
    pub depth: u8,
    /// Positions with at most this many empties are solved exactly.
    pub endgame_threshold: u8,
    pub move_ordering: bool,
    /// `None` searches without a clock.
    pub time_budget: Option<Duration>,
}

impl Default for SearchLimits {
    fn default() -> Self {
        Self {
            depth: 10,
            endgame_threshold: 12,
            move_ordering: true,
            time_budget: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }
}

pub struct Searcher<'a, E: EvaluationStrategy + ?Sized> {
    strategy: &'a E,
    orderer: &'a MoveOrderer,
    limits: SearchLimits,
    rollout: Option<RolloutConfig>,
    table: TranspositionTable,
    deadline: Option<Instant>,
    clock_armed: bool,
    nodes: u64,
    tt_hits: u64,
    timed_out: bool,
}

impl<'a, E: EvaluationStrategy + ?Sized> Searcher<'a, E> {
    pub fn new(strategy: &'a E, orderer: &'a MoveOrderer, limits: SearchLimits) -> Self {
        Self {
            strategy,
            orderer,
            limits,
            rollout: None,
            table: TranspositionTable::new(),
            deadline: None,
            clock_armed: false,
            nodes: 0,
            tt_hits: 0,
            timed_out: false,
        }
    }

    pub fn with_rollout(mut self, rollout: Option<RolloutConfig>) -> Self {
        self.rollout = rollout;
        self
    }

    /// Picks a move among `moves`, which are searched in the given order.
    /// Caller contract: `moves` is non-empty and every entry is legal for `side`.
    pub fn search(&mut self, board: &Board, side: Side, moves: &[Move]) -> SearchReport {
        self.deadline = self.limits.time_budget.map(|budget| Instant::now() + budget);
        self.table = TranspositionTable::new();
        self.clock_armed = false;
        self.nodes = 0;
        self.tt_hits = 0;
        self.timed_out = false;

        debug_assert!(!moves.is_empty(), "search() requires at least one move");
        let Some(&first) = moves.first() else {
            unreachable!("search() called without legal moves");
        };

        if moves.len() == 1 {
            let mut next = *board;
            next.place(first.index(), side);
            return self.report(first, -self.strategy.evaluate(&next, side.opponent()), 0, false);
        }

        if self.limits.time_budget == Some(Duration::ZERO) {
            self.timed_out = true;
            let mv = fallback_move(self.strategy, board, moves).unwrap_or(first);
            return self.report(mv, self.strategy.square_value(mv), 0, false);
        }

        let exact_regime = self.uses_exact_regime(board);
        let max_depth = if exact_regime { 1 } else { self.limits.depth };
        let mut rollout = self
            .rollout
            .filter(|_| !exact_regime)
            .map(|config| Rollout::new(self.strategy, config));

        let mut best_move = first;
        let mut best_score = MIN_SCORE;
        let mut completed = 0;

        for depth in 1..=max_depth {
            // Depth 1 always runs to completion so a searched move exists.
            self.clock_armed = depth > 1;
            match self.search_root(board, side, moves, depth, rollout.as_mut()) {
                SearchResult::Complete(mv, score) => {
                    best_move = mv.unwrap_or(first);
                    best_score = score;
                    completed = depth;
                    debug!(
                        "depth {depth}: best {best_move} score {score} nodes {} tt hits {}",
                        self.nodes, self.tt_hits
                    );
                }
                SearchResult::TimedOut => {
                    if completed <= 1 {
                        warn!("time budget expired after depth {completed}");
                    } else {
                        debug!("depth {depth} abandoned, keeping depth {completed}");
                    }
                    break;
                }
            }
        }

        let mut exact = false;
        if exact_regime && !self.timed_out {
            let empties = board.empty_count();
            debug!("exact solve with {empties} empties");
            self.clock_armed = true;
            self.table = TranspositionTable::new();
            match self.search_root(board, side, moves, empties, None) {
                SearchResult::Complete(mv, score) => {
                    best_move = mv.unwrap_or(first);
                    best_score = score;
                    exact = true;
                }
                SearchResult::TimedOut => {
                    debug!("exact solve abandoned, keeping depth-1 move {best_move}");
                }
            }
        }

        self.report(best_move, best_score, completed, exact)
    }

    pub fn timed_out(&self) -> bool {
        self.timed_out
    }

    pub(crate) fn uses_exact_regime(&self, board: &Board) -> bool {
        board.empty_count() <= self.limits.endgame_threshold
    }

    fn report(&self, best_move: Move, score: f32, depth: u8, exact: bool) -> SearchReport {
        SearchReport {
            best_move,
            score,
            depth,
            exact,
            nodes: self.nodes,
            tt_hits: self.tt_hits,
            timed_out: self.timed_out,
        }
    }

    /// Root moves keep their input order and only a strictly better score replaces
    /// the incumbent, so ties go to the earliest move.
    fn search_root(
        &mut self,
        board: &Board,
        side: Side,
        moves: &[Move],
        depth: u8,
        mut rollout: Option<&mut Rollout<'a, E>>,
    ) -> SearchResult {
        let opponent = side.opponent();
        let mut best_move = None;
        let mut best_score = MIN_SCORE;
        let mut alpha = MIN_SCORE;

        for &mv in moves {
            if self.clock_expired() {
                return SearchResult::TimedOut;
            }

            let mut next = *board;
            next.place(mv.index(), side);
            let mut score = match self
                .negaalpha(&next, opponent, depth - 1, -MAX_SCORE, -alpha)
                .negate()
            {
                SearchResult::TimedOut => return SearchResult::TimedOut,
                SearchResult::Complete(_, score) => score,
            };

            if let Some(rollout) = rollout.as_deref_mut() {
                score += rollout.weight() * rollout.estimate(&next, opponent, side);
            }

            if best_move.is_none() || score > best_score {
                best_score = score;
                best_move = Some(mv);
            }
            // Rollout noise is added after the search, so the window stays open.
            if rollout.is_none() && score > alpha {
                alpha = score;
            }
        }

        SearchResult::Complete(best_move, best_score)
    }

    fn negaalpha(
        &mut self,
        board: &Board,
        side: Side,
        depth: u8,
        alpha: f32,
        beta: f32,
    ) -> SearchResult {
        self.nodes += 1;
        if self.nodes % CLOCK_INTERVAL == 0 && self.clock_expired() {
            return SearchResult::TimedOut;
        }

        if depth == 0 {
            let score = if board.empty_count() == 0 {
                exact_score(board, side)
            } else {
                self.strategy.evaluate(board, side)
            };
            return SearchResult::Complete(None, score);
        }

        let opponent = side.opponent();
        let legal = board.legal_moves(side);
        if legal == 0 {
            if !board.has_legal_move(opponent) {
                return SearchResult::Complete(None, exact_score(board, side));
            }
            return self
                .negaalpha(board, opponent, depth, -beta, -alpha)
                .negate();
        }

        let key = fingerprint(board, side);
        let mut hint = None;
        if let Some(entry) = self.table.probe(key) {
            if let Some(score) = entry.cutoff(depth, alpha, beta) {
                self.tt_hits += 1;
                return SearchResult::Complete(entry.best_move, score);
            }
            hint = entry.best_move;
        }

        let moves = self.ordered_moves(board, side, legal, depth, hint);
        let mut best_move = moves[0];
        let mut best_score = MIN_SCORE;
        let mut alpha_now = alpha;

        for mv in moves {
            let mut next = *board;
            next.place(mv.index(), side);

            match self.negaalpha(&next, opponent, depth - 1, -beta, -alpha_now) {
                SearchResult::TimedOut => return SearchResult::TimedOut,
                SearchResult::Complete(_, score) => {
                    let score = -score;
                    if score > best_score {
                        best_score = score;
                        best_move = mv;
                    }
                    if score > alpha_now {
                        alpha_now = score;
                    }
                    if alpha_now >= beta {
                        break;
                    }
                }
            }
        }

        self.table.store(
            key,
            TtEntry {
                depth,
                score: best_score,
                bound: Bound::classify(best_score, alpha, beta),
                best_move: Some(best_move),
            },
        );

        SearchResult::Complete(Some(best_move), best_score)
    }

    fn ordered_moves(
        &self,
        board: &Board,
        side: Side,
        legal: u64,
        depth: u8,
        hint: Option<Move>,
    ) -> Vec<Move> {
        let moves = mask_to_moves(legal);
        let mut moves = if self.limits.move_ordering && depth >= ORDERING_MIN_DEPTH {
            self.orderer.order_moves(self.strategy, board, side, &moves)
        } else {
            moves
        };

        if let Some(hint) = hint
            && let Some(pos) = moves.iter().position(|&mv| mv == hint)
        {
            let mv = moves.remove(pos);
            moves.insert(0, mv);
        }
        moves
    }

    fn clock_expired(&mut self) -> bool {
        if !self.clock_armed {
            return false;
        }
        if self.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            self.timed_out = true;
        }
        self.timed_out
    }
}

/// Final disc margin for `side`, scaled by `EXACT_SCALE`.
pub fn exact_score(board: &Board, side: Side) -> f32 {
    let own = board.stones(side) as f32;
    let opp = board.stones(side.opponent()) as f32;
    (own - opp) * EXACT_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::eval::HeuristicEvaluator;
    use crate::ai::ordering::OrderingWeights;

    struct ConstantEvaluator;

    impl EvaluationStrategy for ConstantEvaluator {
        fn evaluate(&self, _board: &Board, _side: Side) -> f32 {
            0.0
        }

        fn square_value(&self, _mv: Move) -> f32 {
            0.0
        }
    }

    fn mv(row: u8, col: u8) -> Move {
        Move::new(row, col).unwrap()
    }

    fn limits(depth: u8, time_budget: Option<Duration>) -> SearchLimits {
        SearchLimits {
            depth,
            endgame_threshold: 12,
            move_ordering: true,
            time_budget,
        }
    }

    fn two_corner_board() -> Board {
        "
            . O X X X X O .
            X X X X X X X X
            X X X X X X X X
            X X X X X X X X
            X X X X X X X X
            X X X X X X X X
            X X X X X X X X
            X X X X X X X X
        "
        .parse()
        .unwrap()
    }

    #[test]
    fn search_returns_single_legal_move_immediately() {
        let orderer = MoveOrderer::new(OrderingWeights::baseline());
        let mut searcher = Searcher::new(&ConstantEvaluator, &orderer, limits(6, None));

        let board: Board = "
            . X O O O O O O
            O O O O O O O O
            O O O O O O O O
            O O O O O O O O
            O O O O O O O O
            O O O O O O O O
            O O O O O O O O
            O O O O O O O O
        "
        .parse()
        .unwrap();
        let moves = board.legal_move_list(Side::White);

        let report = searcher.search(&board, Side::White, &moves);

        assert_eq!(report.best_move, mv(0, 0));
        assert_eq!(report.depth, 0);
        assert!(!searcher.timed_out());
    }

    #[test]
    fn search_tie_breaks_to_first_move_when_scores_equal() {
        let orderer = MoveOrderer::new(OrderingWeights::baseline());
        let mut searcher = Searcher::new(&ConstantEvaluator, &orderer, limits(1, None));
        let board = Board::new();
        let moves = board.legal_move_list(Side::Black);

        assert_eq!(searcher.search(&board, Side::Black, &moves).best_move, mv(2, 3));
    }

    #[test]
    fn search_depth_one_completes_before_timeout_cutoff() {
        let orderer = MoveOrderer::new(OrderingWeights::baseline());
        let mut searcher = Searcher::new(
            &ConstantEvaluator,
            &orderer,
            limits(6, Some(Duration::from_nanos(1))),
        );
        let board = Board::new();
        let moves = board.legal_move_list(Side::Black);

        let report = searcher.search(&board, Side::Black, &moves);

        assert!(board.is_legal(Side::Black, report.best_move));
        assert_eq!(report.depth, 1);
        assert!(report.timed_out);
        assert!(searcher.timed_out());
    }

    #[test]
    fn zero_budget_uses_fallback_move() {
        let evaluator = HeuristicEvaluator::advanced();
        let orderer = MoveOrderer::new(OrderingWeights::advanced());
        let mut searcher = Searcher::new(&evaluator, &orderer, limits(6, Some(Duration::ZERO)));
        let board = two_corner_board();
        let moves = board.legal_move_list(Side::Black);

        let report = searcher.search(&board, Side::Black, &moves);

        assert_eq!(report.best_move, mv(0, 0));
        assert_eq!(report.depth, 0);
        assert_eq!(report.nodes, 0);
        assert!(report.timed_out);
    }

    #[test]
    fn exact_regime_threshold_is_inclusive() {
        let orderer = MoveOrderer::new(OrderingWeights::baseline());
        let searcher = Searcher::new(&ConstantEvaluator, &orderer, limits(6, None));
        let board_12 = Board::from_bitboards((1u64 << 52) - 1, 0);
        let board_13 = Board::from_bitboards((1u64 << 51) - 1, 0);

        assert_eq!(board_12.empty_count(), 12);
        assert!(searcher.uses_exact_regime(&board_12));
        assert!(!searcher.uses_exact_regime(&board_13));
    }

    #[test]
    fn exact_solve_scores_final_margin_through_a_pass() {
        let orderer = MoveOrderer::new(OrderingWeights::baseline());
        let mut searcher = Searcher::new(&ConstantEvaluator, &orderer, limits(6, None));
        let board = two_corner_board();
        let moves = board.legal_move_list(Side::Black);
        assert_eq!(moves, vec![mv(0, 0), mv(0, 7)]);

        let report = searcher.search(&board, Side::Black, &moves);

        // Either corner wipes White out; the first one wins the tie.
        assert!(report.exact);
        assert_eq!(report.best_move, mv(0, 0));
        assert_eq!(report.score, 64.0 * EXACT_SCALE);
    }

    #[test]
    fn exact_solve_stops_when_deadline_is_already_exceeded() {
        let orderer = MoveOrderer::new(OrderingWeights::baseline());
        let mut searcher = Searcher::new(&ConstantEvaluator, &orderer, limits(6, None));
        searcher.deadline = Some(Instant::now() - Duration::from_millis(1));
        searcher.clock_armed = true;
        let board = two_corner_board();
        let moves = board.legal_move_list(Side::Black);

        let result = searcher.search_root(&board, Side::Black, &moves, 2, None);

        assert_eq!(result, SearchResult::TimedOut);
        assert!(searcher.timed_out());
    }

    #[test]
    fn repeated_search_is_deterministic() {
        let evaluator = HeuristicEvaluator::baseline();
        let orderer = MoveOrderer::new(OrderingWeights::baseline());
        let board = Board::new()
            .apply_move(Side::Black, mv(2, 3))
            .unwrap()
            .apply_move(Side::White, mv(2, 2))
            .unwrap();
        let moves = board.legal_move_list(Side::Black);

        let first = Searcher::new(&evaluator, &orderer, limits(4, None)).search(
            &board,
            Side::Black,
            &moves,
        );
        let second = Searcher::new(&evaluator, &orderer, limits(4, None)).search(
            &board,
            Side::Black,
            &moves,
        );

        assert_eq!(first, second);
        assert_eq!(first.depth, 4);
        assert!(first.nodes > 0);
    }

    #[test]
    fn seeded_rollout_is_reproducible() {
        let evaluator = HeuristicEvaluator::advanced();
        let orderer = MoveOrderer::new(OrderingWeights::advanced());
        let rollout = Some(RolloutConfig {
            simulations: 4,
            max_plies: 8,
            seed: 42,
            weight: 0.5,
        });
        let board = Board::new();
        let moves = board.legal_move_list(Side::Black);

        let run = || {
            Searcher::new(&evaluator, &orderer, limits(2, None))
                .with_rollout(rollout)
                .search(&board, Side::Black, &moves)
        };

        assert_eq!(run(), run());
    }

    #[test]
    fn exact_score_is_antisymmetric() {
        let board = Board::from_bitboards(0b111, 0b1000);

        assert_eq!(exact_score(&board, Side::Black), 2.0 * EXACT_SCALE);
        assert_eq!(exact_score(&board, Side::White), -2.0 * EXACT_SCALE);
    }
}
