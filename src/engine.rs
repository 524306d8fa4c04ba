use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::ai::eval::{EvaluationStrategy, EvaluatorConfig, HeuristicEvaluator};
use crate::ai::ordering::{MoveOrderer, OrderingWeights};
use crate::ai::rollout::RolloutConfig;
use crate::ai::search::{DEFAULT_TIMEOUT_SECS, SearchLimits, Searcher};
use crate::board::Board;
use crate::error::EngineError;
use crate::game::MoveSelector;
use crate::types::{Move, NUM_SQUARES, SearchReport, Side};

/// Everything fixed at engine construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub evaluator: EvaluatorConfig,
    pub ordering: OrderingWeights,
    /// Heuristic search depth in plies.
    pub search_depth: u8,
    /// Empty-square count at or below which the engine solves exactly.
    pub endgame_threshold: u8,
    #[serde(default = "default_move_ordering")]
    pub move_ordering: bool,
    /// Wall-clock budget per decision. `None` disables the clock.
    #[serde(default)]
    pub time_budget_ms: Option<u64>,
    #[serde(default)]
    pub rollout: Option<RolloutConfig>,
}

fn default_move_ordering() -> bool {
    true
}

impl EngineConfig {
    pub fn baseline() -> Self {
        Self {
            evaluator: EvaluatorConfig::baseline(),
            ordering: OrderingWeights::baseline(),
            search_depth: 10,
            endgame_threshold: 12,
            move_ordering: true,
            time_budget_ms: Some(DEFAULT_TIMEOUT_SECS * 1000),
            rollout: None,
        }
    }

    pub fn advanced() -> Self {
        Self {
            evaluator: EvaluatorConfig::advanced(),
            ordering: OrderingWeights::advanced(),
            search_depth: 15,
            endgame_threshold: 15,
            move_ordering: true,
            time_budget_ms: Some(DEFAULT_TIMEOUT_SECS * 1000),
            rollout: None,
        }
    }

    pub fn from_json(text: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| EngineError::InvalidConfiguration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.search_depth == 0 {
            return Err(EngineError::InvalidConfiguration(
                "search depth must be at least 1".to_string(),
            ));
        }
        if self.endgame_threshold as usize > NUM_SQUARES {
            return Err(EngineError::InvalidConfiguration(format!(
                "endgame threshold {} exceeds {NUM_SQUARES} squares",
                self.endgame_threshold
            )));
        }
        if !self.ordering.is_finite() {
            return Err(EngineError::InvalidConfiguration(
                "ordering weights must be finite".to_string(),
            ));
        }
        if let Some(rollout) = &self.rollout {
            rollout.validate()?;
        }
        self.evaluator.validate()
    }

    pub fn limits(&self) -> SearchLimits {
        SearchLimits {
            depth: self.search_depth,
            endgame_threshold: self.endgame_threshold,
            move_ordering: self.move_ordering,
            time_budget: self.time_budget_ms.map(Duration::from_millis),
        }
    }
}

/// The facade external callers use: board and side in, one move or `None` out.
pub struct Engine<E: EvaluationStrategy = HeuristicEvaluator> {
    config: EngineConfig,
    strategy: E,
    orderer: MoveOrderer,
}

impl Engine<HeuristicEvaluator> {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        let strategy = HeuristicEvaluator::new(config.evaluator.clone())?;
        Self::with_strategy(config, strategy)
    }

    pub fn baseline() -> Self {
        Self::from_preset(EngineConfig::baseline(), HeuristicEvaluator::baseline())
    }

    pub fn advanced() -> Self {
        Self::from_preset(EngineConfig::advanced(), HeuristicEvaluator::advanced())
    }

    fn from_preset(config: EngineConfig, strategy: HeuristicEvaluator) -> Self {
        Self {
            orderer: MoveOrderer::new(config.ordering),
            config,
            strategy,
        }
    }
}

impl<E: EvaluationStrategy> Engine<E> {
    /// Uses `strategy` for evaluation; `config.evaluator` is validated but not consulted.
    pub fn with_strategy(config: EngineConfig, strategy: E) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self {
            orderer: MoveOrderer::new(config.ordering),
            config,
            strategy,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn evaluate(&self, board: &Board, side: Side) -> f32 {
        self.strategy.evaluate(board, side)
    }

    /// Returns the chosen move, or `None` when `side` must pass.
    ///
    /// A non-empty `legal` set restricts the choice to those moves; every entry must
    /// be legal. `None` or an empty set means the engine generates the moves itself.
    pub fn choose_move(
        &self,
        board: &Board,
        side: Side,
        legal: Option<&[Move]>,
    ) -> Result<Option<Move>, EngineError> {
        Ok(self
            .analyze(board, side, legal)?
            .map(|report| report.best_move))
    }

    pub fn analyze(
        &self,
        board: &Board,
        side: Side,
        legal: Option<&[Move]>,
    ) -> Result<Option<SearchReport>, EngineError> {
        let moves = self.candidates(board, side, legal)?;
        if moves.is_empty() {
            debug!("{side:?} has no legal move");
            return Ok(None);
        }

        let mut searcher = Searcher::new(&self.strategy, &self.orderer, self.config.limits())
            .with_rollout(self.config.rollout);
        let report = searcher.search(board, side, &moves);

        info!(
            "{side:?} plays {} (score {}, depth {}, exact {}, nodes {}, timed out {})",
            report.best_move,
            report.score,
            report.depth,
            report.exact,
            report.nodes,
            report.timed_out
        );
        Ok(Some(report))
    }

    fn candidates(
        &self,
        board: &Board,
        side: Side,
        legal: Option<&[Move]>,
    ) -> Result<Vec<Move>, EngineError> {
        let supplied = match legal {
            Some(moves) if !moves.is_empty() => moves,
            _ => return Ok(board.legal_move_list(side)),
        };

        for &mv in supplied {
            if !board.is_legal(side, mv) {
                return Err(EngineError::IllegalMove {
                    row: mv.row(),
                    col: mv.col(),
                });
            }
        }

        let mut moves = supplied.to_vec();
        moves.sort();
        moves.dedup();
        Ok(moves)
    }
}

impl<E: EvaluationStrategy + Send + Sync> MoveSelector for Engine<E> {
    fn select_move(&self, board: &Board, side: Side) -> Option<Move> {
        match self.choose_move(board, side, None) {
            Ok(mv) => mv,
            Err(e) => {
                debug!("move selection failed: {e}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mv(row: u8, col: u8) -> Move {
        Move::new(row, col).unwrap()
    }

    fn quick(mut config: EngineConfig) -> EngineConfig {
        config.search_depth = 3;
        config.time_budget_ms = None;
        config
    }

    #[test]
    fn presets_are_valid() {
        assert!(EngineConfig::baseline().validate().is_ok());
        assert!(EngineConfig::advanced().validate().is_ok());
        assert!(Engine::new(EngineConfig::advanced()).is_ok());
    }

    #[test]
    fn invalid_configurations_fail_at_construction() {
        let mut zero_depth = EngineConfig::baseline();
        zero_depth.search_depth = 0;

        let mut threshold = EngineConfig::baseline();
        threshold.endgame_threshold = 65;

        let mut rollout = EngineConfig::baseline();
        rollout.rollout = Some(RolloutConfig {
            simulations: 0,
            ..RolloutConfig::default()
        });

        let mut mixes = EngineConfig::advanced();
        mixes.evaluator.mixes.endgame.material = f32::NAN;

        for config in [zero_depth, threshold, rollout, mixes] {
            assert!(matches!(
                Engine::new(config),
                Err(EngineError::InvalidConfiguration(_))
            ));
        }
    }

    #[test]
    fn config_survives_json() {
        let config = EngineConfig::advanced();
        let text = serde_json::to_string(&config).unwrap();

        assert_eq!(EngineConfig::from_json(&text).unwrap(), config);
        assert!(matches!(
            EngineConfig::from_json("{\"search_depth\": 3}"),
            Err(EngineError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn chooses_a_legal_opening_move() {
        let engine = Engine::new(quick(EngineConfig::baseline())).unwrap();
        let board = Board::new();

        let chosen = engine.choose_move(&board, Side::Black, None).unwrap();

        assert!(chosen.is_some_and(|m| board.is_legal(Side::Black, m)));
    }

    #[test]
    fn supplied_move_set_is_honoured() {
        let engine = Engine::new(quick(EngineConfig::advanced())).unwrap();
        let board = Board::new();
        let only = [mv(5, 4)];

        assert_eq!(
            engine.choose_move(&board, Side::Black, Some(&only)).unwrap(),
            Some(mv(5, 4))
        );
        assert_eq!(
            engine.choose_move(&board, Side::Black, Some(&[mv(0, 0)])),
            Err(EngineError::IllegalMove { row: 0, col: 0 })
        );
    }

    #[test]
    fn no_legal_move_is_none_not_an_error() {
        let engine = Engine::baseline();
        let board: Board = "
            O O O O O O O O
            O O O O O O O O
            O O O O O O O O
            O O O O O O O O
            O O O O O O O O
            O O O O O O O O
            O O O O O O O X
            O O O O O O O .
        "
        .parse()
        .unwrap();

        assert!(board.has_legal_move(Side::White));
        assert_eq!(engine.choose_move(&board, Side::Black, None), Ok(None));
        assert_eq!(engine.choose_move(&board, Side::Black, Some(&[])), Ok(None));
    }

    #[test]
    fn caller_board_is_untouched() {
        let engine = Engine::new(quick(EngineConfig::baseline())).unwrap();
        let board = Board::new();
        let copy = board;

        let _ = engine.analyze(&board, Side::Black, None).unwrap();

        assert_eq!(board, copy);
    }

    struct MaterialOnly;

    impl EvaluationStrategy for MaterialOnly {
        fn evaluate(&self, board: &Board, side: Side) -> f32 {
            board.stones(side) as f32 - board.stones(side.opponent()) as f32
        }

        fn square_value(&self, _mv: Move) -> f32 {
            0.0
        }
    }

    #[test]
    fn custom_strategy_drives_the_search() {
        let mut config = quick(EngineConfig::baseline());
        config.search_depth = 1;
        let engine = Engine::with_strategy(config, MaterialOnly).unwrap();

        let report = engine
            .analyze(&Board::new(), Side::Black, None)
            .unwrap()
            .unwrap();

        // Every opening move flips one stone, so the first wins the tie.
        assert_eq!(report.best_move, mv(2, 3));
        assert_eq!(report.score, 3.0);
    }
}
