use thiserror::Error;

/// Errors reported to the engine's immediate caller.
///
/// A missing legal move is not an error: the facade reports it as `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The target square is occupied or the move flips nothing.
    #[error("illegal move at row {row}, col {col}")]
    IllegalMove { row: u8, col: u8 },

    #[error("row/col out of range: ({row}, {col})")]
    OutOfRange { row: u8, col: u8 },

    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("malformed weight table: {0}")]
    WeightFormat(String),

    #[error("invalid board: {0}")]
    InvalidBoard(String),

    /// A game-driver action that does not fit the current turn.
    #[error("invalid turn: {0}")]
    InvalidTurn(String),
}
