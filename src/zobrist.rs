use crate::{Color, Piece, PiecePositions};
use core::fmt;
use lazy_static::lazy_static;
use rand::Rng;
use std::{
    array,
    collections::{hash_map::DefaultHasher, HashSet},
    hash::{Hash, Hasher},
};

lazy_static! {
    /// Keys shared by every [crate::Board] of the process. Never mutated after
    /// initialization.
    pub static ref ZOBRIST_KEYS: ZobristKeys = {
        #[cfg(test)]
        let mut rng = {
            use rand::rngs::StdRng;
            use rand::SeedableRng;
            StdRng::seed_from_u64(123456789)
        };
        #[cfg(not(test))]
        let mut rng = rand::thread_rng();

        ZobristKeys::new_random(&mut rng)
    };
}

#[derive(Clone, Hash, PartialEq, Eq)]
pub struct CastleKeys {
    pub king_side: u64,
    pub queen_side: u64,
}

#[derive(Clone, Hash, PartialEq, Eq)]
pub struct ZobristKeys {
    pub black_to_move: u64,
    pub white_castle: CastleKeys,
    pub black_castle: CastleKeys,
    pub en_passant_col: [u64; 8],
    pub pieces: [u64; 64 * 12],
}

impl fmt::Debug for ZobristKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut hasher = DefaultHasher::new();
        Hash::hash(self, &mut hasher);
        let hash = hasher.finish();
        f.debug_struct("ZobristKeys")
            .field("hash", &hash)
            .finish_non_exhaustive()
    }
}

impl ZobristKeys {
    pub fn new_random(rng: &mut impl Rng) -> Self {
        let mut used = HashSet::new();
        let mut next_key = || loop {
            let key = rng.next_u64();
            if key != 0 && used.insert(key) {
                break key;
            }
        };

        let en_passant_col = array::from_fn(|_| next_key());
        let pieces = array::from_fn(|_| next_key());

        Self {
            black_to_move: next_key(),
            white_castle: CastleKeys {
                king_side: next_key(),
                queen_side: next_key(),
            },
            black_castle: CastleKeys {
                king_side: next_key(),
                queen_side: next_key(),
            },
            en_passant_col,
            pieces,
        }
    }

    pub fn castle(&self, color: Color) -> &CastleKeys {
        match color {
            Color::White => &self.white_castle,
            Color::Black => &self.black_castle,
        }
    }

    #[inline]
    pub fn piece(&self, square: u8, piece: Piece) -> u64 {
        self.pieces[square as usize * 12 + piece.zobrist_index()]
    }

    #[inline]
    pub fn en_passant(&self, square: u8) -> u64 {
        self.en_passant_col[(square % 8) as usize]
    }

    /// Key of the castling rights in `positions`.
    pub fn castle_rights(&self, positions: &PiecePositions) -> u64 {
        let keys = self.castle(positions.color);
        let mut hash = 0;
        if positions.castle_king {
            hash ^= keys.king_side;
        }
        if positions.castle_queen {
            hash ^= keys.queen_side;
        }
        hash
    }

    /// Full hash of a position, computed from scratch.
    pub fn hash(
        &self,
        fields: &[Option<Piece>; 64],
        white_pos: &PiecePositions,
        black_pos: &PiecePositions,
        en_passant: Option<u8>,
        next_move: Color,
    ) -> u64 {
        let mut hash = 0;
        if next_move == Color::Black {
            hash ^= self.black_to_move;
        }
        if let Some(en_passant) = en_passant {
            hash ^= self.en_passant(en_passant);
        }
        hash ^= self.castle_rights(white_pos);
        hash ^= self.castle_rights(black_pos);

        for (square, piece) in fields.iter().enumerate() {
            if let Some(piece) = *piece {
                hash ^= self.piece(square as u8, piece);
            }
        }

        hash
    }
}

#[cfg(test)]
mod test {
    use super::ZOBRIST_KEYS;
    use crate::{Board, Color, Piece, PieceType, START_BOARD_FEN};

    #[test]
    fn piece_keys_are_distinct_per_square_and_piece() {
        let white_king = Piece::new(PieceType::King, Color::White);
        let black_king = Piece::new(PieceType::King, Color::Black);
        let white_pawn = Piece::new(PieceType::Pawn, Color::White);

        assert_ne!(ZOBRIST_KEYS.piece(0, white_king), ZOBRIST_KEYS.piece(0, black_king));
        assert_ne!(ZOBRIST_KEYS.piece(0, white_king), ZOBRIST_KEYS.piece(1, white_king));
        assert_ne!(ZOBRIST_KEYS.piece(12, white_pawn), ZOBRIST_KEYS.piece(1, white_king));
    }

    #[test]
    fn debug_prints_a_digest_of_the_keys() {
        let debug = format!("{:?}", *ZOBRIST_KEYS);
        assert!(debug.starts_with("ZobristKeys { hash: "), "{debug}");
        assert_eq!(debug, format!("{:?}", *ZOBRIST_KEYS));
    }

    #[test]
    fn position_hash_matches_incremental_hash() {
        let mut board = Board::from_fen(START_BOARD_FEN).unwrap();
        assert_eq!(board.zobrist_hash, board.calculate_zobrist_hash());
        for mve in board.legal_moves() {
            board.play_move(mve);
            assert_eq!(board.zobrist_hash, board.calculate_zobrist_hash(), "{mve}");
            for reply in board.legal_moves() {
                let unmove = board.play_move(reply);
                assert_eq!(board.zobrist_hash, board.calculate_zobrist_hash(), "{mve} {reply}");
                board.undo_move(reply, unmove);
            }
            board = Board::from_fen(START_BOARD_FEN).unwrap();
        }
    }
}
