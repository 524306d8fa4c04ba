use wasm_bindgen::prelude::*;

pub mod ai;
pub mod board;
pub mod engine;
pub mod error;
pub mod game;
pub mod types;

pub use ai::{EvaluationStrategy, HeuristicEvaluator, Phase, WeightTable};
pub use board::Board;
pub use engine::{Engine, EngineConfig};
pub use error::EngineError;
pub use game::{Game, MoveSelector};
pub use types::{Cell, GameResult, GameState, Move, SearchReport, Side};

#[wasm_bindgen]
pub fn wasm_ready() -> bool {
    true
}

/// Picks a move for `side` (1=black, 2=white) on a 64-cell board.
/// Returns a `SearchReport` object, or `null` when the side must pass.
#[wasm_bindgen]
pub fn choose_move(
    cells: &[u8],
    side: u8,
    advanced: bool,
    budget_ms: u32,
) -> Result<JsValue, JsValue> {
    let board = Board::from_cells(cells).map_err(to_js_error)?;
    let side = parse_side(side)?;

    let mut config = if advanced {
        EngineConfig::advanced()
    } else {
        EngineConfig::baseline()
    };
    config.time_budget_ms = Some(u64::from(budget_ms));

    let engine = Engine::new(config).map_err(to_js_error)?;
    match engine.analyze(&board, side, None).map_err(to_js_error)? {
        Some(report) => serde_wasm_bindgen::to_value(&report).map_err(to_js_error),
        None => Ok(JsValue::NULL),
    }
}

/// Legal moves for `side` as `[{row, col}, ...]` in row-major order.
#[wasm_bindgen]
pub fn legal_moves(cells: &[u8], side: u8) -> Result<JsValue, JsValue> {
    let board = Board::from_cells(cells).map_err(to_js_error)?;
    let side = parse_side(side)?;
    serde_wasm_bindgen::to_value(&board.legal_move_list(side)).map_err(to_js_error)
}

fn parse_side(code: u8) -> Result<Side, JsValue> {
    Side::from_code(code).ok_or_else(|| JsValue::from_str(&format!("invalid side {code}")))
}

fn to_js_error(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}
