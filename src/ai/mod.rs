pub mod eval;
pub mod ordering;
pub mod rollout;
pub mod search;
pub mod tt;
pub mod weights;

pub use eval::{EvaluationStrategy, EvaluatorConfig, HeuristicEvaluator, Phase};
pub use ordering::{MoveOrderer, OrderingWeights};
pub use rollout::RolloutConfig;
pub use search::{SearchLimits, Searcher};
pub use weights::WeightTable;
