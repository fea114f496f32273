use anyhow::{bail, Context};
use tracing::{debug, warn};

use super::{Engine, Result, Score, SearchConfig, SearchStats, Searcher};
use crate::{Board, Move, SelectMoveError};
use std::{
    sync::{
        atomic::{AtomicBool, AtomicI32, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
};

/// Picks a move for the position in `fen` by searching `depth` plies.
///
/// The move is returned in coordinate notation, e.g. `e2e4` or `e7e8q`.
/// A depth of 0 is treated as 1.
pub fn select_move(fen: &str, depth: u32) -> std::result::Result<String, SelectMoveError> {
    let mut board = Board::from_fen(fen).map_err(|reason| SelectMoveError::MalformedPosition {
        fen: fen.to_string(),
        reason,
    })?;

    let mut searcher = Searcher::new(SearchConfig::default().with_depth(depth));
    let selected = searcher
        .select_move(&mut board, depth)
        .map_err(|err| match err {
            SelectMoveError::NoLegalMove { .. } => SelectMoveError::NoLegalMove {
                fen: fen.to_string(),
            },
            err => err,
        })?;

    Ok(selected.mve.to_string())
}

/// Fixed depth alpha-beta engine. Searches run on their own thread and can
/// be stopped early with [Engine::end_search].
pub struct Hopkins {
    board: Board,
    config: SearchConfig,
    control: Arc<SearchControl>,
    search_thread: Option<JoinHandle<Result<()>>>,
}

struct SearchControl {
    searcher: Mutex<Option<Searcher>>,
    abort_search: Arc<AtomicBool>,
    score: AtomicI32,
    best_move: Mutex<Option<Move>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SearchControl {
    /// Takes the searcher out for the duration of a search. A searcher lost
    /// to a panicking search thread is replaced.
    fn take_searcher(&self, config: SearchConfig) -> Searcher {
        lock(&self.searcher)
            .take()
            .unwrap_or_else(|| Searcher::with_abort_flag(config, self.abort_search.clone()))
    }

    fn run(&self, mut searcher: Searcher, mut board: Board, depth: u32) -> Result<()> {
        searcher.reset_stats();
        let result = searcher.select_move(&mut board, depth);
        if let Ok(selected) = &result {
            *lock(&self.best_move) = Some(selected.mve);
            self.score.store(selected.score.0, Ordering::SeqCst);
        }
        *lock(&self.searcher) = Some(searcher);

        result
            .map(|_| ())
            .with_context(|| format!("search to depth {depth}"))
    }
}

impl Engine for Hopkins {
    fn new_from_board(board: Board) -> Self {
        Self::with_config(board, SearchConfig::default())
    }

    fn accept_move(&mut self, mve: Move) {
        let restart_search = self.search_thread.is_some();
        if restart_search {
            if let Err(e) = self.end_search() {
                warn!("previous search failed: {e:#}");
            }
        }
        debug!(%mve, "accepting move");
        self.board.play_move(mve);
        *lock(&self.control.best_move) = None;
        self.control.score.store(0, Ordering::SeqCst);
        if restart_search {
            self.start_search();
        }
    }

    fn start_search(&mut self) {
        if self.search_thread.is_some() {
            return;
        }

        self.control.abort_search.store(false, Ordering::SeqCst);

        let searcher = self.control.take_searcher(self.config);
        let board = self.board.clone();
        let control = self.control.clone();
        let depth = self.config.depth;
        self.search_thread = Some(thread::spawn(move || control.run(searcher, board, depth)));
    }

    fn end_search(&mut self) -> Result<()> {
        if let Some(search_thread) = self.search_thread.take() {
            self.control.abort_search.store(true, Ordering::SeqCst);
            match search_thread.join() {
                Ok(result) => result.context("end search")?,
                Err(search_panic) => bail!("Search thread panicked: {search_panic:?}"),
            };
        }

        Ok(())
    }

    fn best_move(&self) -> Option<Move> {
        *lock(&self.control.best_move)
    }

    fn current_score(&self) -> Score {
        Score(self.control.score.load(Ordering::SeqCst))
    }
}

impl Hopkins {
    pub fn with_config(board: Board, config: SearchConfig) -> Self {
        let abort_search = Arc::new(AtomicBool::new(false));
        let searcher = Searcher::with_abort_flag(config, abort_search.clone());
        let control = Arc::new(SearchControl {
            searcher: Mutex::new(Some(searcher)),
            abort_search,
            score: AtomicI32::new(0),
            best_move: Mutex::new(None),
        });

        Hopkins {
            board,
            config,
            control,
            search_thread: None,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Searches on the calling thread until `target_depth` is done.
    pub fn search_to_depth(&mut self, target_depth: u32) -> Result<(Option<Move>, Score)> {
        if self.search_thread.is_some() {
            bail!("Can't search to depth while search is already running");
        }

        self.control.abort_search.store(false, Ordering::SeqCst);

        let searcher = self.control.take_searcher(self.config);
        let board = self.board.clone();

        self.control.run(searcher, board, target_depth)?;

        Ok((self.best_move(), self.current_score()))
    }

    /// Counters of the last finished search. `None` while a search runs.
    pub fn stats(&self) -> Option<SearchStats> {
        lock(&self.control.searcher).as_ref().map(Searcher::stats)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::START_BOARD_FEN;

    #[test]
    fn selects_mate_in_one() {
        assert_eq!(
            select_move("6k1/5ppp/8/8/8/8/5PPP/4R1K1 w - - 0 1", 2).unwrap(),
            "e1e8"
        );
    }

    #[test]
    fn selects_free_queen() {
        assert_eq!(
            select_move("4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1", 2).unwrap(),
            "d2d5"
        );
    }

    #[test]
    fn avoids_defended_pawn() {
        let mve = select_move("4k3/8/2p5/3p4/8/8/8/3QK3 w - - 0 1", 2).unwrap();
        assert_ne!(mve, "d1d5");
    }

    #[test]
    fn promotion_is_written_with_piece() {
        assert_eq!(select_move("8/P6k/8/8/8/8/8/K7 w - - 0 1", 1).unwrap(), "a7a8q");
    }

    #[test]
    fn depth_zero_searches_one_ply() {
        let fen = "4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1";
        assert_eq!(select_move(fen, 0).unwrap(), select_move(fen, 1).unwrap());
    }

    #[test]
    fn start_position_move_is_legal() {
        let mve = select_move(START_BOARD_FEN, 2).unwrap();
        let board = Board::from_fen(START_BOARD_FEN).unwrap();
        assert!(board.legal_moves().iter().any(|m| m.to_string() == mve));
    }

    #[test]
    fn malformed_positions() {
        for fen in [
            "",
            "not a fen",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq - 0 1",
            "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR x KQkq - 0 1",
            "8/8/8/8/8/8/8/8 w - - 0 1",
            "8/8/8/8/8/3Pk3/8/4K3 w - e4 0 1",
            "4k3/8/8/8/4p3/3P4/8/4K3 w - e4 0 1",
        ] {
            assert!(
                matches!(
                    select_move(fen, 2),
                    Err(SelectMoveError::MalformedPosition { .. })
                ),
                "{fen:?}"
            );
        }
    }

    #[test]
    fn finished_games_have_no_move() {
        for fen in [
            "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3",
            "7k/5Q2/6K1/8/8/8/8/8 b - - 0 1",
        ] {
            assert_eq!(
                select_move(fen, 2),
                Err(SelectMoveError::NoLegalMove {
                    fen: fen.to_string()
                })
            );
        }
    }

    #[test]
    fn search_to_depth_reports_move_and_stats() {
        let board = Board::from_fen("6k1/5ppp/8/8/8/8/5PPP/4R1K1 w - - 0 1").unwrap();
        let mut engine = Hopkins::new_from_board(board);
        let (mve, score) = engine.search_to_depth(2).unwrap();
        assert_eq!(mve.map(|m| m.to_string()).as_deref(), Some("e1e8"));
        assert_eq!(score, Score::mate_in(1));
        let stats = engine.stats().unwrap();
        assert!(stats.nodes > 0);
    }

    #[test]
    fn threaded_search_finishes() {
        let board = Board::from_fen("4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1").unwrap();
        let mut engine = Hopkins::with_config(board, SearchConfig::default().with_depth(2));
        engine.start_search();
        // nothing was aborted yet, but end_search aborts. Wait for a result first.
        while engine.best_move().is_none() {
            thread::yield_now();
        }
        engine.end_search().unwrap();
        assert_eq!(engine.best_move().map(|m| m.to_string()).as_deref(), Some("d2d5"));
        assert!(engine.stats().is_some());
    }

    #[test]
    fn aborted_search_still_moves() {
        let board = Board::from_fen(START_BOARD_FEN).unwrap();
        let mut engine = Hopkins::with_config(board.clone(), SearchConfig::default().with_depth(8));
        engine.start_search();
        engine.end_search().unwrap();
        let mve = engine.best_move().unwrap();
        assert!(board.legal_moves().contains(&mve));
        assert_eq!(engine.board(), &board);
    }

    #[test]
    fn accept_move_advances_the_position() {
        let board = Board::from_fen(START_BOARD_FEN).unwrap();
        let mut engine = Hopkins::with_config(board, SearchConfig::default().with_depth(1));
        let mve = engine.search_to_depth(1).unwrap().0.unwrap();
        engine.accept_move(mve);
        assert_eq!(engine.best_move(), None);
        assert_eq!(engine.board().side_to_move(), crate::Color::Black);
        let reply = engine.search_to_depth(1).unwrap().0.unwrap();
        assert!(engine.board().legal_moves().contains(&reply));
    }
}
