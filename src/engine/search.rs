//! Negamax alpha-beta search with a quiescence extension, and the root move
//! selector built on top of it.
//!
//! All scores in this module are [Score]s, seen by the side to move at the
//! node that produced them. A child's score is negated on the way up.

use std::{
    cmp::Reverse,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
};

use tracing::{debug, info, warn};

use crate::{Board, Move, SelectMoveError};

use super::{
    eval::{piece_value, static_evaluation},
    score::Score,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchConfig {
    /// Root depth used by [crate::Hopkins].
    pub depth: u32,
    /// Resolve captures past the horizon. When disabled, depth 0 nodes are
    /// scored statically.
    pub quiescence: bool,
    /// Number of quiescence plies in which quiet checks count as tactical.
    pub quiescence_check_plies: u32,
    /// Try captures and promotions first at interior nodes.
    pub move_ordering: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            depth: 4,
            quiescence: true,
            quiescence_check_plies: 0,
            move_ordering: true,
        }
    }
}

impl SearchConfig {
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_quiescence(mut self, quiescence: bool) -> Self {
        self.quiescence = quiescence;
        self
    }

    pub fn with_quiescence_checks(mut self, plies: u32) -> Self {
        self.quiescence_check_plies = plies;
        self
    }

    pub fn with_move_ordering(mut self, move_ordering: bool) -> Self {
        self.move_ordering = move_ordering;
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Main search nodes above the horizon. Depth 0 leaves only count here
    /// when quiescence is off, otherwise they are quiescence nodes.
    pub nodes: u64,
    /// Calls to the quiescence search.
    pub quiescence_nodes: u64,
    pub beta_cutoffs: u64,
    /// Deepest ply reached, quiescence included.
    pub max_ply: u32,
}

impl SearchStats {
    pub fn total_nodes(&self) -> u64 {
        self.nodes + self.quiescence_nodes
    }
}

/// The move picked at the root and its score for the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectedMove {
    pub mve: Move,
    pub score: Score,
}

pub struct Searcher {
    config: SearchConfig,
    abort: Arc<AtomicBool>,
    stats: SearchStats,
}

impl Searcher {
    pub fn new(config: SearchConfig) -> Self {
        Self::with_abort_flag(config, Arc::new(AtomicBool::new(false)))
    }

    /// Creates a searcher that stops as soon as `abort` is set.
    pub fn with_abort_flag(config: SearchConfig, abort: Arc<AtomicBool>) -> Self {
        Searcher {
            config,
            abort,
            stats: SearchStats::default(),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    pub fn stats(&self) -> SearchStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = SearchStats::default();
    }

    pub fn abort_flag(&self) -> Arc<AtomicBool> {
        self.abort.clone()
    }

    #[inline]
    fn aborted(&self) -> bool {
        self.abort.load(Ordering::Relaxed)
    }

    /// Picks the best move for the side to move by searching every legal move
    /// to `depth - 1` with a full window. Ties go to the move generated first.
    ///
    /// A depth of 0 is searched like a depth of 1. If the abort flag is raised
    /// the best move among the fully searched ones is returned, or the first
    /// legal move if none finished.
    pub fn select_move(
        &mut self,
        board: &mut Board,
        depth: u32,
    ) -> Result<SelectedMove, SelectMoveError> {
        let moves = board.legal_moves();
        let Some(&first) = moves.first() else {
            return Err(SelectMoveError::NoLegalMove {
                fen: board.generate_fen(),
            });
        };
        let child_depth = depth.max(1) - 1;

        let mut best: Option<SelectedMove> = None;
        for mve in moves {
            if self.aborted() {
                break;
            }
            let score = {
                let mut child = board.scoped_move(mve);
                -self.negamax(&mut child, child_depth, 1, Score::NEG_INFINITY, Score::INFINITY)
            };
            if self.aborted() {
                debug!(%mve, "search interrupted, discarding root move");
                break;
            }
            debug!(%mve, %score, "root move searched");
            if best.map_or(true, |best| score > best.score) {
                best = Some(SelectedMove { mve, score });
            }
        }

        let selected = best.unwrap_or_else(|| {
            warn!("search aborted before any root move finished, playing {first}");
            SelectedMove {
                mve: first,
                score: static_evaluation(board).for_side(board.side_to_move()),
            }
        });
        info!(
            mve = %selected.mve,
            score = %selected.score,
            depth,
            nodes = self.stats.nodes,
            quiescence_nodes = self.stats.quiescence_nodes,
            "selected move"
        );
        Ok(selected)
    }

    /// Alpha-beta search of `board` to `depth`. The position is restored
    /// before this returns.
    pub fn search(&mut self, board: &mut Board, depth: u32, alpha: Score, beta: Score) -> Score {
        self.negamax(board, depth, 0, alpha, beta)
    }

    /// Quiescence search of `board`, as done at the horizon of [Searcher::search].
    pub fn quiesce(&mut self, board: &mut Board, alpha: Score, beta: Score) -> Score {
        self.quiesce_at(board, 0, 0, alpha, beta)
    }

    fn negamax(
        &mut self,
        board: &mut Board,
        depth: u32,
        ply: u32,
        mut alpha: Score,
        beta: Score,
    ) -> Score {
        assert!(
            alpha < beta,
            "search window is empty: alpha {} >= beta {}",
            alpha.0,
            beta.0
        );

        if depth == 0 {
            return self.horizon(board, ply, alpha, beta);
        }

        self.enter(ply);
        let mut moves = board.legal_moves();
        if let Some(score) = terminal_score(board, &moves, ply) {
            return score;
        }

        if self.config.move_ordering {
            order_moves(board, &mut moves);
        }

        for mve in moves {
            if self.aborted() {
                break;
            }
            let score = {
                let mut child = board.scoped_move(mve);
                -self.negamax(&mut child, depth - 1, ply + 1, -beta, -alpha)
            };
            if score >= beta {
                self.stats.beta_cutoffs += 1;
                return beta;
            }
            if score > alpha {
                alpha = score;
            }
        }

        alpha
    }

    /// Score of a node at depth 0.
    pub(crate) fn horizon(&mut self, board: &mut Board, ply: u32, alpha: Score, beta: Score) -> Score {
        if self.config.quiescence {
            return self.quiesce_at(board, ply, 0, alpha, beta);
        }

        self.enter(ply);
        let moves = board.legal_moves();
        terminal_score(board, &moves, ply)
            .unwrap_or_else(|| static_evaluation(board).for_side(board.side_to_move()))
    }

    fn quiesce_at(
        &mut self,
        board: &mut Board,
        ply: u32,
        quiescence_ply: u32,
        mut alpha: Score,
        beta: Score,
    ) -> Score {
        assert!(
            alpha < beta,
            "quiescence window is empty: alpha {} >= beta {}",
            alpha.0,
            beta.0
        );

        self.stats.quiescence_nodes += 1;
        self.stats.max_ply = self.stats.max_ply.max(ply);

        let moves = board.legal_moves();
        if let Some(score) = terminal_score(board, &moves, ply) {
            return score;
        }

        // the side to move may always decline to capture
        let stand_pat = static_evaluation(board).for_side(board.side_to_move());
        if stand_pat >= beta {
            self.stats.beta_cutoffs += 1;
            return beta;
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }

        let with_checks = quiescence_ply < self.config.quiescence_check_plies;
        let mut tactical: Vec<Move> = moves
            .into_iter()
            .filter(|&mve| {
                board.captured_piece(mve).is_some()
                    || mve.promote_to.is_some()
                    || (with_checks && board.gives_check(mve))
            })
            .collect();
        order_moves(board, &mut tactical);

        for mve in tactical {
            if self.aborted() {
                break;
            }
            let score = {
                let mut child = board.scoped_move(mve);
                -self.quiesce_at(&mut child, ply + 1, quiescence_ply + 1, -beta, -alpha)
            };
            if score >= beta {
                self.stats.beta_cutoffs += 1;
                return beta;
            }
            if score > alpha {
                alpha = score;
            }
        }

        alpha
    }

    #[inline]
    fn enter(&mut self, ply: u32) {
        self.stats.nodes += 1;
        self.stats.max_ply = self.stats.max_ply.max(ply);
    }
}

/// Score of a game that is over at `ply`, or `None` if play goes on.
/// `moves` must be the legal moves of `board`.
pub(crate) fn terminal_score(board: &Board, moves: &[Move], ply: u32) -> Option<Score> {
    if moves.is_empty() {
        let checkmate = board.is_in_check(board.side_to_move());
        assert!(
            checkmate || board.is_stalemate(),
            "no legal moves in {} but the game is not over",
            board.generate_fen()
        );
        return Some(if checkmate {
            Score::mated_in(ply)
        } else {
            Score::ZERO
        });
    }
    if board.has_insufficient_material() || board.is_draw_by_rule() {
        return Some(Score::ZERO);
    }
    None
}

/// Most valuable victim first, cheapest attacker first among equal victims.
/// Promotions follow the captures; everything else keeps its generated order.
fn move_order_key(board: &Board, mve: Move) -> i32 {
    let promotion = mve.promote_to.map_or(0, |piece| piece_value(piece.typ()));
    match board.captured_piece(mve) {
        Some(victim) => {
            let attacker = board[mve.from].map_or(0, |piece| piece_value(piece.typ()));
            10_000 + piece_value(victim.typ()) * 100 - attacker + promotion
        }
        None if promotion > 0 => 5_000 + promotion,
        None => 0,
    }
}

/// Stable sort by [move_order_key].
pub(crate) fn order_moves(board: &Board, moves: &mut [Move]) {
    moves.sort_by_key(|&mve| Reverse(move_order_key(board, mve)));
}
