//! Errors reported by [crate::select_move].

use thiserror::Error;

/// Why no move could be selected for a position.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectMoveError {
    /// The position string could not be parsed. No search was attempted.
    #[error("Malformed position \"{fen}\": {reason}")]
    MalformedPosition { fen: String, reason: String },

    /// The position is checkmate or stalemate.
    #[error("No legal move in position \"{fen}\"")]
    NoLegalMove { fen: String },
}
