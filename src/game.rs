use crate::board::{Board, mask_to_moves};
use crate::error::EngineError;
use crate::types::{GameResult, GameState, Move, Side};

/// Anything that can pick a move for the side to move: the engine, a scripted
/// player in tests, or a host callback.
pub trait MoveSelector: Send + Sync {
    fn select_move(&self, board: &Board, side: Side) -> Option<Move>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct FirstLegalMoveSelector;

impl MoveSelector for FirstLegalMoveSelector {
    fn select_move(&self, board: &Board, side: Side) -> Option<Move> {
        board.legal_move_list(side).first().copied()
    }
}

/// Turn driver. Black moves first; the game ends on a full board or two passes in a row.
#[derive(Debug, Clone)]
pub struct Game {
    board: Board,
    to_move: Side,
    is_game_over: bool,
    is_pass: bool,
    flipped: Vec<Move>,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    pub fn new() -> Self {
        Self::from_position(Board::new(), Side::Black)
    }

    pub fn from_position(board: Board, to_move: Side) -> Self {
        Self {
            board,
            to_move,
            is_game_over: board.empty_count() == 0,
            is_pass: false,
            flipped: Vec::new(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn to_move(&self) -> Side {
        self.to_move
    }

    pub fn is_game_over(&self) -> bool {
        self.is_game_over
    }

    /// `true` when the previous turn was a pass.
    pub fn is_pass(&self) -> bool {
        self.is_pass
    }

    /// Stones flipped by the last move.
    pub fn flipped(&self) -> &[Move] {
        &self.flipped
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        if self.is_game_over {
            return Vec::new();
        }
        self.board.legal_move_list(self.to_move)
    }

    pub fn has_legal_moves_for_current(&self) -> bool {
        !self.is_game_over && self.board.has_legal_move(self.to_move)
    }

    pub fn play(&mut self, row: u8, col: u8) -> Result<(), EngineError> {
        let mv = Move::new(row, col)?;
        self.apply(mv)
    }

    /// Passes the turn. Only allowed when the side to move has no legal move.
    pub fn pass(&mut self) -> Result<(), EngineError> {
        if self.is_game_over {
            return Err(EngineError::InvalidTurn("game is already over".to_string()));
        }
        if self.board.has_legal_move(self.to_move) {
            return Err(EngineError::InvalidTurn(format!(
                "{:?} has a legal move and cannot pass",
                self.to_move
            )));
        }

        if self.is_pass {
            self.is_game_over = true;
        }
        self.is_pass = true;
        self.flipped.clear();
        self.to_move = self.to_move.opponent();
        Ok(())
    }

    /// Lets `selector` play for the side to move, passing when it has no move.
    /// Returns the move played, or `None` for a pass or a finished game.
    pub fn play_selector(
        &mut self,
        selector: &dyn MoveSelector,
    ) -> Result<Option<Move>, EngineError> {
        if self.is_game_over {
            return Ok(None);
        }
        if !self.board.has_legal_move(self.to_move) {
            self.pass()?;
            return Ok(None);
        }

        let mv = selector
            .select_move(&self.board, self.to_move)
            .ok_or_else(|| {
                EngineError::InvalidTurn(format!(
                    "selector returned no move for {:?}",
                    self.to_move
                ))
            })?;
        self.apply(mv)?;
        Ok(Some(mv))
    }

    /// Final score, once the game is over.
    pub fn result(&self) -> Option<GameResult> {
        if !self.is_game_over {
            return None;
        }

        let (black_count, white_count) = self.board.count();
        let winner = if black_count > white_count {
            Some(Side::Black)
        } else if white_count > black_count {
            Some(Side::White)
        } else {
            None
        };
        Some(GameResult {
            winner,
            black_count,
            white_count,
        })
    }

    pub fn state(&self) -> GameState {
        let (black_count, white_count) = self.board.count();
        GameState {
            board: self.board.to_array().to_vec(),
            to_move: self.to_move,
            black_count,
            white_count,
            is_game_over: self.is_game_over,
            is_pass: self.is_pass,
            flipped: self.flipped.clone(),
        }
    }

    fn apply(&mut self, mv: Move) -> Result<(), EngineError> {
        if self.is_game_over {
            return Err(EngineError::InvalidTurn("game is already over".to_string()));
        }

        let flips = self.board.place(mv.index(), self.to_move);
        if flips == 0 {
            return Err(EngineError::IllegalMove {
                row: mv.row(),
                col: mv.col(),
            });
        }

        self.is_pass = false;
        self.flipped = mask_to_moves(flips);
        self.to_move = self.to_move.opponent();
        if self.board.empty_count() == 0 {
            self.is_game_over = true;
        }
        Ok(())
    }
}
