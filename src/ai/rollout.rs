use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::ai::eval::EvaluationStrategy;
use crate::board::Board;
use crate::error::EngineError;
use crate::types::Side;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RolloutConfig {
    /// Playouts per root move.
    pub simulations: u32,
    /// Plies per playout, passes included.
    pub max_plies: u8,
    pub seed: u64,
    /// Multiplier on the mean playout evaluation added to the search score.
    pub weight: f32,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            simulations: 8,
            max_plies: 10,
            seed: 0,
            weight: 0.1,
        }
    }
}

impl RolloutConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.simulations == 0 {
            return Err(EngineError::InvalidConfiguration(
                "rollout needs at least one simulation".to_string(),
            ));
        }
        if !self.weight.is_finite() {
            return Err(EngineError::InvalidConfiguration(
                "rollout weight must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Random playouts from a seeded `SmallRng`; the same seed gives the same estimate.
pub struct Rollout<'a, E: EvaluationStrategy + ?Sized> {
    strategy: &'a E,
    config: RolloutConfig,
    rng: SmallRng,
}

impl<'a, E: EvaluationStrategy + ?Sized> Rollout<'a, E> {
    pub fn new(strategy: &'a E, config: RolloutConfig) -> Self {
        Self {
            strategy,
            config,
            rng: SmallRng::seed_from_u64(config.seed),
        }
    }

    pub fn weight(&self) -> f32 {
        self.config.weight
    }

    /// Mean evaluation for `perspective` over random playouts starting with `to_move`.
    pub fn estimate(&mut self, board: &Board, to_move: Side, perspective: Side) -> f32 {
        let mut total = 0.0f32;
        for _ in 0..self.config.simulations {
            let end = self.playout(board, to_move);
            total += self.strategy.evaluate(&end, perspective);
        }
        total / self.config.simulations as f32
    }

    fn playout(&mut self, board: &Board, to_move: Side) -> Board {
        let mut scratch = *board;
        let mut side = to_move;

        for _ in 0..self.config.max_plies {
            let legal = scratch.legal_moves(side);
            if legal == 0 {
                if !scratch.has_legal_move(side.opponent()) {
                    break;
                }
                side = side.opponent();
                continue;
            }

            let pick = self.rng.gen_range(0..legal.count_ones());
            scratch.place(nth_set_bit(legal, pick), side);
            side = side.opponent();
        }

        scratch
    }
}

fn nth_set_bit(mut mask: u64, n: u32) -> usize {
    for _ in 0..n {
        mask &= mask - 1;
    }
    mask.trailing_zeros() as usize
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::eval::HeuristicEvaluator;

    fn config(seed: u64) -> RolloutConfig {
        RolloutConfig {
            simulations: 16,
            max_plies: 20,
            seed,
            weight: 1.0,
        }
    }

    #[test]
    fn same_seed_gives_same_estimate() {
        let evaluator = HeuristicEvaluator::advanced();
        let board = Board::new();

        let first = Rollout::new(&evaluator, config(7)).estimate(&board, Side::Black, Side::Black);
        let second = Rollout::new(&evaluator, config(7)).estimate(&board, Side::Black, Side::Black);

        assert_eq!(first, second);
        assert!(first.is_finite());
    }

    #[test]
    fn playout_never_touches_caller_board_and_keeps_stone_count() {
        let evaluator = HeuristicEvaluator::baseline();
        let board = Board::new();
        let before = board;
        let mut rollout = Rollout::new(&evaluator, config(3));

        let end = rollout.playout(&board, Side::Black);

        assert_eq!(board, before);
        let (black, white) = end.count();
        assert!(black as usize + white as usize <= 4 + 20);
        assert!(black as usize + white as usize > 4);
    }

    #[test]
    fn nth_set_bit_walks_in_index_order() {
        let mask = (1u64 << 3) | (1u64 << 10) | (1u64 << 40);

        assert_eq!(nth_set_bit(mask, 0), 3);
        assert_eq!(nth_set_bit(mask, 1), 10);
        assert_eq!(nth_set_bit(mask, 2), 40);
    }

    #[test]
    fn zero_simulations_are_rejected() {
        let mut bad = config(0);
        bad.simulations = 0;

        assert!(matches!(
            bad.validate(),
            Err(EngineError::InvalidConfiguration(_))
        ));
        assert!(config(0).validate().is_ok());
    }
}
