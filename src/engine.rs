use crate::{Board, Move, Result};

pub trait Engine {
    /// creates a new engine in the given position
    fn new_from_board(board: Board) -> Self;

    /// advance the position by `mve`
    fn accept_move(&mut self, mve: Move);

    /// start searching for the best move. This done on a separate thread.
    fn start_search(&mut self);

    /// stop searching for the best move.
    fn end_search(&mut self) -> Result<()>;

    /// returns the best move the engine found so far or `None`.
    /// This must be set to `Some` after [Engine::start_search] and
    /// [Engine::end_search] have been called, unless the game is over.
    fn best_move(&self) -> Option<Move>;

    /// returns the score of the current position for the side to move
    fn current_score(&self) -> Score;
}

pub mod eval;
pub mod hopkins;
pub mod score;
pub mod search;

pub use score::{Evaluation, Score};
pub use search::{SearchConfig, SearchStats, SelectedMove, Searcher};
