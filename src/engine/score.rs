//! Score types.
//!
//! Two perspectives exist and they never mix implicitly:
//! [Evaluation] is always from White's point of view, [Score] is always from
//! the point of view of the side about to move. The only way from one to the
//! other is [Evaluation::for_side].

use std::{fmt, ops::Neg};

use crate::Color;

/// Magnitude of a mate at the root. Larger than any material and positional sum.
pub const MATE: i32 = 1_000_000;

/// Strictly outside every reachable score, mates included.
pub const INFINITY: i32 = 1_100_000;

/// Deepest ply a mate score can be adjusted for.
pub const MAX_PLY: u32 = 1024;

/// Centipawn value of a position for the side to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Score(pub i32);

impl Score {
    pub const ZERO: Score = Score(0);
    pub const INFINITY: Score = Score(INFINITY);
    pub const NEG_INFINITY: Score = Score(-INFINITY);

    /// The side to move is checkmated, `ply` half moves from the root.
    #[inline]
    pub const fn mated_in(ply: u32) -> Score {
        Score(-(MATE - ply as i32))
    }

    /// The side to move delivers mate `ply` half moves from the root.
    #[inline]
    pub const fn mate_in(ply: u32) -> Score {
        Score(MATE - ply as i32)
    }

    #[inline]
    pub fn is_mate(self) -> bool {
        self.0.abs() > MATE - MAX_PLY as i32
    }
}

impl Neg for Score {
    type Output = Score;

    #[inline]
    fn neg(self) -> Score {
        Score(-self.0)
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_mate() {
            let plies = MATE - self.0.abs();
            let moves = (plies + 1) / 2;
            if self.0 > 0 {
                write!(f, "mate {moves}")
            } else {
                write!(f, "mate -{moves}")
            }
        } else {
            write!(f, "cp {}", self.0)
        }
    }
}

/// Centipawn value of a position for White.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Evaluation(pub i32);

impl Evaluation {
    pub const DRAW: Evaluation = Evaluation(0);

    /// The same value, seen by `side`.
    #[inline]
    pub fn for_side(self, side: Color) -> Score {
        match side {
            Color::White => Score(self.0),
            Color::Black => Score(-self.0),
        }
    }
}

impl Neg for Evaluation {
    type Output = Evaluation;

    #[inline]
    fn neg(self) -> Evaluation {
        Evaluation(-self.0)
    }
}
