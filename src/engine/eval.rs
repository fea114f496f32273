//! Static evaluation: material plus piece-square tables.
//!
//! Every table here is a process-wide constant.

use crate::{square, Board, Color, PieceType};

use super::score::{Evaluation, Score, MATE};

/// Material worth per [PieceType::index], in tenths of a pawn. The king has no
/// material value, its presence is structural.
pub const PIECE_VALUES: [i32; 6] = [10, 28, 30, 50, 90, 0];

/// The piece-square tables are tuned at this many times the resolution of
/// [PIECE_VALUES].
pub const TABLE_SCALE: i32 = 10;

#[inline]
pub const fn piece_value(typ: PieceType) -> i32 {
    PIECE_VALUES[typ.index()]
}

#[rustfmt::skip]
const PAWN_TABLE: [i32; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
    50, 50, 50, 50, 50, 50, 50, 50,
    10, 10, 20, 30, 30, 20, 10, 10,
     5,  5, 10, 25, 25, 10,  5,  5,
     0,  0,  0, 20, 20,  0,  0,  0,
     5, -5,-10,  0,  0,-10, -5,  5,
     5, 10, 10,-20,-20, 10, 10,  5,
     0,  0,  0,  0,  0,  0,  0,  0,
];

#[rustfmt::skip]
const KNIGHT_TABLE: [i32; 64] = [
    -50,-40,-30,-30,-30,-30,-40,-50,
    -40,-20,  0,  0,  0,  0,-20,-40,
    -30,  0, 10, 15, 15, 10,  0,-30,
    -30,  5, 15, 20, 20, 15,  5,-30,
    -30,  0, 15, 20, 20, 15,  0,-30,
    -30,  5, 10, 15, 15, 10,  5,-30,
    -40,-20,  0,  5,  5,  0,-20,-40,
    -50,-40,-30,-30,-30,-30,-40,-50,
];

#[rustfmt::skip]
const BISHOP_TABLE: [i32; 64] = [
    -20,-10,-10,-10,-10,-10,-10,-20,
    -10,  0,  0,  0,  0,  0,  0,-10,
    -10,  0,  5, 10, 10,  5,  0,-10,
    -10,  5,  5, 10, 10,  5,  5,-10,
    -10,  0, 10, 10, 10, 10,  0,-10,
    -10, 10, 10, 10, 10, 10, 10,-10,
    -10,  5,  0,  0,  0,  0,  5,-10,
    -20,-10,-10,-10,-10,-10,-10,-20,
];

#[rustfmt::skip]
const ROOK_TABLE: [i32; 64] = [
      0,  0,  0,  0,  0,  0,  0,  0,
      5, 10, 10, 10, 10, 10, 10,  5,
     -5,  0,  0,  0,  0,  0,  0, -5,
     -5,  0,  0,  0,  0,  0,  0, -5,
     -5,  0,  0,  0,  0,  0,  0, -5,
     -5,  0,  0,  0,  0,  0,  0, -5,
     -5,  0,  0,  0,  0,  0,  0, -5,
      0,  0,  0,  5,  5,  0,  0,  0,
];

#[rustfmt::skip]
const QUEEN_TABLE: [i32; 64] = [
    -20,-10,-10, -5, -5,-10,-10,-20,
    -10,  0,  0,  0,  0,  0,  0,-10,
    -10,  0,  5,  5,  5,  5,  0,-10,
     -5,  0,  5,  5,  5,  5,  0, -5,
      0,  0,  5,  5,  5,  5,  0, -5,
    -10,  5,  5,  5,  5,  5,  0,-10,
    -10,  0,  5,  0,  0,  0,  0,-10,
    -20,-10,-10, -5, -5,-10,-10,-20,
];

// Used in every game phase. No endgame table yet.
#[rustfmt::skip]
const KING_TABLE: [i32; 64] = [
    -30,-40,-40,-50,-50,-40,-40,-30,
    -30,-40,-40,-50,-50,-40,-40,-30,
    -30,-40,-40,-50,-50,-40,-40,-30,
    -30,-40,-40,-50,-50,-40,-40,-30,
    -20,-30,-30,-40,-40,-30,-30,-20,
    -10,-20,-20,-20,-20,-20,-20,-10,
      0,  0,  0,  0,  0,  0,  0,  0,
      0,  0,  0,  0,  0,  0,  0,  0,
];

/// Piece-square tables per [PieceType::index]. Laid out the way White sees the
/// board, a8 first; black pieces are looked up at the mirrored square.
pub const PIECE_SQUARE_TABLES: [[i32; 64]; 6] = [
    PAWN_TABLE,
    KNIGHT_TABLE,
    BISHOP_TABLE,
    ROOK_TABLE,
    QUEEN_TABLE,
    KING_TABLE,
];

/// Positional bonus of a `color` piece of kind `typ` standing on `sq`.
#[inline]
pub fn table_value(typ: PieceType, color: Color, sq: u8) -> i32 {
    let index = match color {
        Color::White => sq,
        Color::Black => square::mirror(sq),
    };
    PIECE_SQUARE_TABLES[typ.index()][index as usize]
}

/// Material balance for White, kings excluded, in [PIECE_VALUES] units.
pub fn material_score(board: &Board) -> i32 {
    PieceType::ALL_TYPES
        .iter()
        .filter(|&&typ| typ != PieceType::King)
        .map(|&typ| {
            let white = board.piece_squares(typ, Color::White).count() as i32;
            let black = board.piece_squares(typ, Color::Black).count() as i32;
            piece_value(typ) * (white - black)
        })
        .sum()
}

/// Piece-square balance for White, kings included, in table units.
pub fn positional_score(board: &Board) -> i32 {
    PieceType::ALL_TYPES
        .iter()
        .map(|&typ| {
            let white: i32 = board
                .piece_squares(typ, Color::White)
                .map(|sq| table_value(typ, Color::White, sq))
                .sum();
            let black: i32 = board
                .piece_squares(typ, Color::Black)
                .map(|sq| table_value(typ, Color::Black, sq))
                .sum();
            white - black
        })
        .sum()
}

/// Material and position only, ignoring whether the game is over.
///
/// The result is `material + positional / TABLE_SCALE` multiplied through by
/// [TABLE_SCALE], which keeps it integral and puts a pawn at 100.
pub fn static_evaluation(board: &Board) -> Evaluation {
    Evaluation(material_score(board) * TABLE_SCALE + positional_score(board))
}

/// Evaluates `board` for White.
///
/// A checkmate is worth [MATE] against the side to move, stalemate and
/// insufficient material are exact draws.
pub fn evaluate(board: &Board) -> Evaluation {
    if board.legal_moves().is_empty() {
        return if board.is_in_check(board.side_to_move()) {
            match board.side_to_move() {
                Color::White => Evaluation(-MATE),
                Color::Black => Evaluation(MATE),
            }
        } else {
            Evaluation::DRAW
        };
    }
    if board.has_insufficient_material() {
        return Evaluation::DRAW;
    }
    static_evaluation(board)
}

/// [evaluate] from the point of view of the side to move.
///
/// Search does not call this. It scores terminal positions itself so that
/// mates can be adjusted by their distance from the root.
#[inline]
pub fn relative_evaluate(board: &Board) -> Score {
    evaluate(board).for_side(board.side_to_move())
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;
    use crate::START_BOARD_FEN;

    /// Flips the board vertically and swaps the colors of all pieces and the
    /// side to move.
    pub(crate) fn color_flipped_fen(fen: &str) -> String {
        let parts: Vec<&str> = fen.split_whitespace().collect();
        let swap_case = |s: &str| -> String {
            s.chars()
                .map(|c| {
                    if c.is_ascii_uppercase() {
                        c.to_ascii_lowercase()
                    } else {
                        c.to_ascii_uppercase()
                    }
                })
                .collect()
        };

        let placement = parts[0]
            .split('/')
            .rev()
            .map(swap_case)
            .collect::<Vec<_>>()
            .join("/");
        let side = if parts[1] == "w" { "b" } else { "w" };
        let castling = if parts[2] == "-" {
            "-".to_string()
        } else {
            let swapped = swap_case(parts[2]);
            "KQkq".chars().filter(|c| swapped.contains(*c)).collect()
        };
        let en_passant = if parts[3] == "-" {
            "-".to_string()
        } else {
            let sq = square::parse(parts[3]).unwrap();
            square::name(square::mirror(sq))
        };
        format!(
            "{placement} {side} {castling} {en_passant} {} {}",
            parts[4], parts[5]
        )
    }

    const SYMMETRY_FENS: &[&str] = &[
        START_BOARD_FEN,
        "r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4",
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1",
        "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
        "rnbqkbnr/ppp2ppp/4p3/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 1",
        "4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1",
        "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3",
        "7k/5Q2/6K1/8/8/8/8/8 b - - 0 1",
    ];

    #[test]
    fn color_flip_helper() {
        assert_eq!(color_flipped_fen(START_BOARD_FEN), "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR b KQkq - 0 1");
        assert_eq!(
            color_flipped_fen("rnbqkbnr/ppp2ppp/4p3/3pP3/8/8/PPPP1PPP/RNBQKBNR w KQkq d6 0 1"),
            "rnbqkbnr/pppp1ppp/8/8/3Pp3/4P3/PPP2PPP/RNBQKBNR b KQkq d3 0 1"
        );
    }

    #[test]
    fn symmetry() {
        for fen in SYMMETRY_FENS {
            let board = Board::from_fen(fen).unwrap();
            let flipped = Board::from_fen(&color_flipped_fen(fen)).unwrap();
            assert_eq!(evaluate(&board), -evaluate(&flipped), "{fen}");
            assert_eq!(relative_evaluate(&board), relative_evaluate(&flipped), "{fen}");
        }
    }

    #[test]
    fn start_position_is_balanced() {
        let board = Board::from_fen(START_BOARD_FEN).unwrap();
        assert_eq!(evaluate(&board), Evaluation(0));
    }

    #[test]
    fn material_counts_without_kings() {
        let board = Board::from_fen("4k3/8/8/3q4/8/8/3R4/4K3 w - - 0 1").unwrap();
        assert_eq!(material_score(&board), 50 - 90);
        let board = Board::from_fen("4k3/pppp4/8/8/8/8/8/RN2K3 w - - 0 1").unwrap();
        assert_eq!(material_score(&board), 50 + 28 - 4 * 10);
    }

    #[test]
    fn positional_uses_mirrored_square_for_black() {
        // kings on mirrored squares cancel out, only the knights differ
        let center = Board::from_fen("4k3/8/8/8/3N4/8/8/4K3 w - - 0 1").unwrap();
        let corner = Board::from_fen("4k3/8/8/8/8/8/8/N3K3 w - - 0 1").unwrap();
        assert_eq!(positional_score(&center), 20);
        assert_eq!(positional_score(&corner), -50);
        // both are bare minor piece endings, so only the static score differs
        assert!(static_evaluation(&center) > static_evaluation(&corner));
        assert_eq!(evaluate(&center), evaluate(&corner));

        let black_knight = Board::from_fen("4k3/8/8/3n4/8/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(positional_score(&black_knight), -20);
    }

    #[test]
    fn static_evaluation_scales_material() {
        let board = Board::from_fen("4k3/8/8/8/3N4/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(static_evaluation(&board), Evaluation(280 + 20));
    }

    #[test]
    fn checkmate_scores() {
        let white_mated = Board::from_fen(
            "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3",
        )
        .unwrap();
        assert_eq!(evaluate(&white_mated), Evaluation(-MATE));
        assert_eq!(relative_evaluate(&white_mated), Score(-MATE));

        let black_mated = Board::from_fen("4R1k1/5ppp/8/8/8/8/8/6K1 b - - 1 1").unwrap();
        assert_eq!(evaluate(&black_mated), Evaluation(MATE));
        assert_eq!(relative_evaluate(&black_mated), Score(-MATE));
    }

    #[test]
    fn draws_are_zero() {
        let stalemate = Board::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        assert_eq!(evaluate(&stalemate), Evaluation::DRAW);

        let bare_kings = Board::from_fen("8/8/8/4k3/8/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(evaluate(&bare_kings), Evaluation::DRAW);

        let lone_bishop = Board::from_fen("8/8/8/4k3/8/8/8/4KB2 b - - 0 1").unwrap();
        assert_eq!(evaluate(&lone_bishop), Evaluation::DRAW);
    }

    #[test]
    fn evaluation_is_deterministic() {
        let board = Board::from_fen(SYMMETRY_FENS[2]).unwrap();
        assert_eq!(evaluate(&board), evaluate(&board.clone()));
    }
}
