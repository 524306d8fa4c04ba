use serde::{Deserialize, Serialize};

use crate::ai::weights::WeightTable;
use crate::board::{Board, CORNER_NEIGHBOURS, CORNERS, bit};
use crate::error::EngineError;
use crate::types::{Move, NUM_SQUARES, Side};

/// Points per legal move of mobility advantage, before phase mixing.
pub const MOBILITY_SCALE: f32 = 10.0;
pub const CORNER_BONUS: f32 = 50.0;
pub const EDGE_RUN_BONUS: f32 = 20.0;
pub const CORNER_ADJACENT_PENALTY: f32 = 20.0;

const EDGE_TRIPLES: [u64; 24] = edge_triples();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Opening,
    Middlegame,
    Endgame,
}

/// Phase boundaries in empty squares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseThresholds {
    /// Strictly more empties than this is the opening.
    pub opening_above: u8,
    /// This many empties or fewer is the endgame.
    pub endgame_at_or_below: u8,
}

impl PhaseThresholds {
    pub const CANONICAL: Self = Self {
        opening_above: 35,
        endgame_at_or_below: 15,
    };

    pub fn classify(&self, empties: u8) -> Phase {
        if empties > self.opening_above {
            Phase::Opening
        } else if empties <= self.endgame_at_or_below {
            Phase::Endgame
        } else {
            Phase::Middlegame
        }
    }
}

/// Coefficients applied to each evaluation term within one phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseMix {
    pub positional: f32,
    pub mobility: f32,
    pub stability: f32,
    pub material: f32,
}

impl PhaseMix {
    fn apply(&self, terms: &EvalTerms) -> f32 {
        self.positional * terms.positional
            + self.mobility * terms.mobility
            + self.stability * terms.stability
            + self.material * terms.material
    }

    fn is_finite(&self) -> bool {
        [self.positional, self.mobility, self.stability, self.material]
            .iter()
            .all(|c| c.is_finite())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseMixes {
    pub opening: PhaseMix,
    pub middlegame: PhaseMix,
    pub endgame: PhaseMix,
}

impl PhaseMixes {
    pub fn for_phase(&self, phase: Phase) -> &PhaseMix {
        match phase {
            Phase::Opening => &self.opening,
            Phase::Middlegame => &self.middlegame,
            Phase::Endgame => &self.endgame,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StabilityBonuses {
    pub corner: f32,
    pub edge_run: f32,
    pub corner_adjacent: f32,
}

impl Default for StabilityBonuses {
    fn default() -> Self {
        Self {
            corner: CORNER_BONUS,
            edge_run: EDGE_RUN_BONUS,
            corner_adjacent: CORNER_ADJACENT_PENALTY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorConfig {
    pub weights: WeightTable,
    /// Multiplier turning table weights into evaluation points.
    pub positional_scale: f32,
    pub phases: PhaseThresholds,
    pub mixes: PhaseMixes,
    #[serde(default)]
    pub stability: StabilityBonuses,
}

impl EvaluatorConfig {
    pub fn baseline() -> Self {
        Self {
            weights: WeightTable::baseline(),
            positional_scale: 1.0,
            phases: PhaseThresholds {
                opening_above: 30,
                endgame_at_or_below: 12,
            },
            mixes: PhaseMixes {
                opening: PhaseMix {
                    positional: 1.0,
                    mobility: 0.8,
                    stability: 1.0,
                    material: 8.0,
                },
                middlegame: PhaseMix {
                    positional: 1.0,
                    mobility: 0.5,
                    stability: 1.0,
                    material: 15.0,
                },
                endgame: PhaseMix {
                    positional: 1.0,
                    mobility: 0.2,
                    stability: 1.0,
                    material: 20.0,
                },
            },
            stability: StabilityBonuses::default(),
        }
    }

    pub fn advanced() -> Self {
        Self {
            weights: WeightTable::advanced(),
            positional_scale: 100.0,
            phases: PhaseThresholds::CANONICAL,
            mixes: PhaseMixes {
                opening: PhaseMix {
                    positional: 0.3,
                    mobility: 1.0,
                    stability: 0.5,
                    material: 0.0,
                },
                middlegame: PhaseMix {
                    positional: 0.4,
                    mobility: 0.6,
                    stability: 1.0,
                    material: 2.0,
                },
                endgame: PhaseMix {
                    positional: 0.6,
                    mobility: 0.1,
                    stability: 1.5,
                    material: 12.0,
                },
            },
            stability: StabilityBonuses::default(),
        }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        let phases = &self.phases;
        if phases.opening_above as usize > NUM_SQUARES
            || phases.opening_above <= phases.endgame_at_or_below
        {
            return Err(EngineError::InvalidConfiguration(format!(
                "phase thresholds out of order: opening above {}, endgame at or below {}",
                phases.opening_above, phases.endgame_at_or_below
            )));
        }
        if !self.positional_scale.is_finite() {
            return Err(EngineError::InvalidConfiguration(
                "positional scale must be finite".to_string(),
            ));
        }
        let mixes = [
            &self.mixes.opening,
            &self.mixes.middlegame,
            &self.mixes.endgame,
        ];
        if !mixes.iter().all(|mix| mix.is_finite()) {
            return Err(EngineError::InvalidConfiguration(
                "phase mix coefficients must be finite".to_string(),
            ));
        }
        let bonuses = &self.stability;
        if ![bonuses.corner, bonuses.edge_run, bonuses.corner_adjacent]
            .iter()
            .all(|b| b.is_finite())
        {
            return Err(EngineError::InvalidConfiguration(
                "stability bonuses must be finite".to_string(),
            ));
        }
        Ok(())
    }
}

/// Unmixed evaluation terms, each `own - opponent`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EvalTerms {
    pub positional: f32,
    pub mobility: f32,
    pub stability: f32,
    pub material: f32,
}

/// Scores positions for the search engine and the move orderer.
pub trait EvaluationStrategy {
    /// Higher is better for `side`.
    fn evaluate(&self, board: &Board, side: Side) -> f32;

    /// Canonical thresholds unless the strategy carries its own.
    fn phase(&self, board: &Board) -> Phase {
        PhaseThresholds::CANONICAL.classify(board.empty_count())
    }

    /// Positional worth of a single square in evaluation points.
    fn square_value(&self, mv: Move) -> f32;
}

/// The weight-table evaluator used by both engine presets. Scores a weighted blend
/// of positional, mobility, stability and material terms, mixed by game phase.
#[derive(Debug, Clone)]
pub struct HeuristicEvaluator {
    config: EvaluatorConfig,
}

impl HeuristicEvaluator {
    pub fn new(config: EvaluatorConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn baseline() -> Self {
        Self {
            config: EvaluatorConfig::baseline(),
        }
    }

    pub fn advanced() -> Self {
        Self {
            config: EvaluatorConfig::advanced(),
        }
    }

    pub fn config(&self) -> &EvaluatorConfig {
        &self.config
    }

    pub fn terms(&self, board: &Board, side: Side) -> EvalTerms {
        let (own, opp) = board.sides(side);
        let empty = board.empty_mask();
        let own_moves = board.legal_moves(side).count_ones() as f32;
        let opp_moves = board.legal_moves(side.opponent()).count_ones() as f32;

        EvalTerms {
            positional: self.positional(own) - self.positional(opp),
            mobility: (own_moves - opp_moves) * MOBILITY_SCALE,
            stability: stability_score(&self.config.stability, own, empty)
                - stability_score(&self.config.stability, opp, empty),
            material: own.count_ones() as f32 - opp.count_ones() as f32,
        }
    }

    fn positional(&self, stones: u64) -> f32 {
        self.config.weights.weighted_sum(stones) * self.config.positional_scale
    }
}

impl EvaluationStrategy for HeuristicEvaluator {
    fn evaluate(&self, board: &Board, side: Side) -> f32 {
        let terms = self.terms(board, side);
        self.config.mixes.for_phase(self.phase(board)).apply(&terms)
    }

    fn phase(&self, board: &Board) -> Phase {
        self.config.phases.classify(board.empty_count())
    }

    fn square_value(&self, mv: Move) -> f32 {
        self.config.weights.get(mv) * self.config.positional_scale
    }
}

/// Corner/edge score for one colour. Approximates stability: held corners,
/// three-in-a-row edge runs, and a penalty for stones beside an empty corner.
pub(crate) fn stability_score(bonuses: &StabilityBonuses, own: u64, empty: u64) -> f32 {
    let mut score = 0.0f32;

    for (&corner, &neighbours) in CORNERS.iter().zip(CORNER_NEIGHBOURS.iter()) {
        let corner_bit = bit(corner);
        if (own & corner_bit) != 0 {
            score += bonuses.corner;
        } else if (empty & corner_bit) != 0 {
            score -= bonuses.corner_adjacent * (own & neighbours).count_ones() as f32;
        }
    }

    let runs = EDGE_TRIPLES
        .iter()
        .filter(|&&mask| (own & mask) == mask)
        .count();
    score + bonuses.edge_run * runs as f32
}

/// Masks of every three consecutive edge squares centred on an inner edge square.
const fn edge_triples() -> [u64; 24] {
    let mut out = [0u64; 24];
    let mut i = 1;
    while i < 7 {
        let k = (i - 1) * 4;
        out[k] = 0b111 << (i - 1);
        out[k + 1] = 0b111 << (56 + i - 1);
        out[k + 2] = bit((i - 1) * 8) | bit(i * 8) | bit((i + 1) * 8);
        out[k + 3] = out[k + 2] << 7;
        i += 1;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boards() -> Vec<Board> {
        let midgame: Board = "
            . . O O O O . .
            . . X O O . . .
            O O X X O X . .
            . O X O X X . .
            . O O X X X X .
            . . X O X . . .
            . . . O . . . .
            . . . . . . . .
        "
        .parse()
        .unwrap();
        let corners: Board = "
            X X X O . . . O
            X O . . . . . .
            . . X O . . . .
            . . O X X . . .
            . . . X O . . .
            . . . . . . . .
            O . . . . . O .
            . . . . . . . X
        "
        .parse()
        .unwrap();
        vec![Board::new(), midgame, corners]
    }

    #[test]
    fn evaluation_is_antisymmetric_between_sides() {
        for evaluator in [HeuristicEvaluator::baseline(), HeuristicEvaluator::advanced()] {
            for board in boards() {
                let black = evaluator.evaluate(&board, Side::Black);
                let white = evaluator.evaluate(&board, Side::White);
                assert_eq!(black, -white, "board:\n{board}");
            }
        }
    }

    #[test]
    fn initial_position_is_balanced() {
        let evaluator = HeuristicEvaluator::advanced();

        assert_eq!(evaluator.evaluate(&Board::new(), Side::Black), 0.0);
    }

    #[test]
    fn canonical_phase_boundaries() {
        let phases = PhaseThresholds::CANONICAL;

        assert_eq!(phases.classify(60), Phase::Opening);
        assert_eq!(phases.classify(36), Phase::Opening);
        assert_eq!(phases.classify(35), Phase::Middlegame);
        assert_eq!(phases.classify(16), Phase::Middlegame);
        assert_eq!(phases.classify(15), Phase::Endgame);
        assert_eq!(phases.classify(0), Phase::Endgame);
    }

    struct SquareCount;

    impl EvaluationStrategy for SquareCount {
        fn evaluate(&self, board: &Board, side: Side) -> f32 {
            board.stones(side) as f32 - board.stones(side.opponent()) as f32
        }

        fn square_value(&self, _mv: Move) -> f32 {
            0.0
        }
    }

    #[test]
    fn phase_follows_the_strategy_thresholds() {
        let opening = Board::new();
        assert_eq!(SquareCount.phase(&opening), Phase::Opening);

        let mut config = EvaluatorConfig::advanced();
        config.phases = PhaseThresholds {
            opening_above: 60,
            endgame_at_or_below: 10,
        };
        let evaluator = HeuristicEvaluator::new(config).unwrap();

        assert_eq!(evaluator.phase(&opening), Phase::Middlegame);
        assert_eq!(HeuristicEvaluator::advanced().phase(&opening), Phase::Opening);
    }

    #[test]
    fn presets_weight_mobility_early_and_material_late() {
        for config in [EvaluatorConfig::baseline(), EvaluatorConfig::advanced()] {
            let m = &config.mixes;
            assert!(m.opening.mobility > m.middlegame.mobility);
            assert!(m.middlegame.mobility > m.endgame.mobility);
            assert!(m.opening.material < m.middlegame.material);
            assert!(m.middlegame.material < m.endgame.material);
        }
    }

    #[test]
    fn stability_counts_corners_and_edge_runs() {
        let bonuses = StabilityBonuses::default();
        // a1, b1, c1 held: one corner and one run centred on b1.
        let own = bit(0) | bit(1) | bit(2);
        let empty = !own;

        assert_eq!(
            stability_score(&bonuses, own, empty),
            CORNER_BONUS + EDGE_RUN_BONUS
        );
    }

    #[test]
    fn stones_beside_empty_corner_are_penalised() {
        let bonuses = StabilityBonuses::default();
        let own = bit(9) | bit(1);
        let empty = !own;

        assert_eq!(
            stability_score(&bonuses, own, empty),
            -2.0 * CORNER_ADJACENT_PENALTY
        );
        // Same stones are not penalised once the corner is taken by anyone.
        assert_eq!(stability_score(&bonuses, own, empty & !bit(0)), 0.0);
    }

    #[test]
    fn edge_triples_cover_each_edge_without_wrapping() {
        assert_eq!(EDGE_TRIPLES[0], bit(0) | bit(1) | bit(2));
        assert_eq!(EDGE_TRIPLES[2], bit(0) | bit(8) | bit(16));
        assert_eq!(EDGE_TRIPLES[3], bit(7) | bit(15) | bit(23));
        assert_eq!(EDGE_TRIPLES[21], bit(61) | bit(62) | bit(63));
    }

    #[test]
    fn terms_report_material_and_mobility() {
        let evaluator = HeuristicEvaluator::baseline();
        let board = Board::new().apply_move(Side::Black, Move::new(2, 3).unwrap()).unwrap();

        let terms = evaluator.terms(&board, Side::Black);

        assert_eq!(terms.material, 3.0);
        // Black has 3 replies to White's 3 after d3.
        assert_eq!(terms.mobility, 0.0);
    }

    #[test]
    fn holding_a_corner_improves_the_score() {
        let evaluator = HeuristicEvaluator::advanced();
        let without: Board = "
            . O X . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . O X . . .
            . . . X O . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
        "
        .parse()
        .unwrap();
        let with: Board = "
            X X X . . . . .
            . . . . . . . .
            . . . . . . . .
            . . . O X . . .
            . . . X O . . .
            . . . . . . . .
            . . . . . . . .
            . . . . . . . .
        "
        .parse()
        .unwrap();

        assert!(
            evaluator.evaluate(&with, Side::Black) > evaluator.evaluate(&without, Side::Black)
        );
    }

    #[test]
    fn validate_rejects_inverted_phase_thresholds() {
        let mut config = EvaluatorConfig::advanced();
        config.phases = PhaseThresholds {
            opening_above: 10,
            endgame_at_or_below: 20,
        };

        assert!(matches!(
            HeuristicEvaluator::new(config),
            Err(EngineError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn validate_rejects_non_finite_mix() {
        let mut config = EvaluatorConfig::baseline();
        config.mixes.endgame.material = f32::INFINITY;

        assert!(HeuristicEvaluator::new(config).is_err());
    }
}
