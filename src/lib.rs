use core::fmt;
use std::{
    collections::{hash_map::Entry, HashMap},
    fmt::Display,
    num::NonZeroU8,
    ops::{Deref, DerefMut, Index, IndexMut, Not},
};

use zobrist::ZOBRIST_KEYS;

pub mod engine;
pub mod error;
pub mod square;
pub mod zobrist;

pub use engine::hopkins::{select_move, Hopkins};
pub use error::SelectMoveError;

pub type Result<T> = anyhow::Result<T>;

pub const START_BOARD_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PieceType {
    King = 0b001,
    Queen = 0b010,
    Bishop = 0b011,
    Knight = 0b100,
    Rook = 0b101,
    Pawn = 0b110,
}

impl PieceType {
    pub const ALL_TYPES: [PieceType; 6] = {
        use PieceType::*;
        [Pawn, Knight, Bishop, Rook, Queen, King]
    };

    pub const ALL_PROMTION_TARGETS: [PieceType; 4] = {
        use PieceType::*;
        [Queen, Rook, Knight, Bishop]
    };

    /// Dense index in `0..6`, ordered pawn to king. Used for per-kind tables.
    #[inline]
    pub const fn index(self) -> usize {
        match self {
            PieceType::Pawn => 0,
            PieceType::Knight => 1,
            PieceType::Bishop => 2,
            PieceType::Rook => 3,
            PieceType::Queen => 4,
            PieceType::King => 5,
        }
    }

    fn from_bits(bits: u8) -> PieceType {
        match bits {
            0b001 => PieceType::King,
            0b010 => PieceType::Queen,
            0b011 => PieceType::Bishop,
            0b100 => PieceType::Knight,
            0b101 => PieceType::Rook,
            0b110 => PieceType::Pawn,
            _ => panic!("Invalid chess piece"),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Color {
    White = 0,
    Black = 0b1000,
}

impl Color {
    pub const ALL_COLORS: [Color; 2] = [Color::White, Color::Black];
}

impl Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::White => f.write_str("White"),
            Color::Black => f.write_str("Black"),
        }
    }
}

impl Not for Color {
    type Output = Color;

    fn not(self) -> Self::Output {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash)]
pub struct Piece(NonZeroU8);

impl Piece {
    pub fn new(typ: PieceType, color: Color) -> Self {
        // Safety: typ is always > 0
        unsafe { Piece(NonZeroU8::new_unchecked(typ as u8 | color as u8)) }
    }

    #[inline(always)]
    pub fn typ(&self) -> PieceType {
        PieceType::from_bits(self.0.get() & 0b111)
    }

    #[inline(always)]
    pub fn color(&self) -> Color {
        if self.0.get() & Color::Black as u8 == Color::Black as u8 {
            Color::Black
        } else {
            Color::White
        }
    }

    pub fn fen_char(&self) -> char {
        let c = match self.typ() {
            PieceType::King => 'k',
            PieceType::Queen => 'q',
            PieceType::Bishop => 'b',
            PieceType::Knight => 'n',
            PieceType::Rook => 'r',
            PieceType::Pawn => 'p',
        };
        match self.color() {
            Color::White => c.to_ascii_uppercase(),
            Color::Black => c,
        }
    }

    pub fn from_fen_char(c: char) -> Option<Self> {
        let typ = match c.to_ascii_lowercase() {
            'k' => PieceType::King,
            'q' => PieceType::Queen,
            'b' => PieceType::Bishop,
            'n' => PieceType::Knight,
            'r' => PieceType::Rook,
            'p' => PieceType::Pawn,
            _ => return None,
        };
        let color = if c.is_ascii_uppercase() {
            Color::White
        } else {
            Color::Black
        };
        Some(Piece::new(typ, color))
    }

    pub(crate) fn zobrist_index(&self) -> usize {
        let color_offset = match self.color() {
            Color::White => 0,
            Color::Black => 6,
        };
        self.typ().index() + color_offset
    }
}

impl fmt::Debug for Piece {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Piece")
            .field("type", &self.typ())
            .field("color", &self.color())
            .finish()
    }
}

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MoveType {
    #[default]
    Normal = 0,
    Castle,
    EnPassant,
    Promotion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    pub from: u8,
    pub to: u8,
    pub promote_to: Option<Piece>,
    pub typ: MoveType,
}

impl Move {
    pub fn new(from: u8, to: u8) -> Self {
        Move {
            from,
            to,
            promote_to: None,
            typ: MoveType::Normal,
        }
    }

    pub fn en_passant(from: u8, to: u8) -> Self {
        Move {
            from,
            to,
            promote_to: None,
            typ: MoveType::EnPassant,
        }
    }

    pub fn castle(from: u8, to: u8) -> Self {
        Move {
            from,
            to,
            promote_to: None,
            typ: MoveType::Castle,
        }
    }

    pub fn promotion(from: u8, to: u8, target: Piece) -> Self {
        Move {
            from,
            to,
            promote_to: Some(target),
            typ: MoveType::Promotion,
        }
    }

    /// Rook origin and destination of a castling move.
    fn castle_rook_squares(&self) -> (u8, u8) {
        debug_assert_eq!(self.typ, MoveType::Castle);
        if self.to > self.from {
            (self.to + 1, self.to - 1)
        } else {
            (self.to - 2, self.to + 1)
        }
    }
}

/// Long algebraic coordinate notation: `e2e4`, `e7e8q`, `e1g1`.
impl Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", square::name(self.from), square::name(self.to))?;
        if let Some(promotion) = self.promote_to {
            write!(f, "{}", promotion.fen_char().to_ascii_lowercase())?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PiecePositions {
    pub color: Color,
    pub king: u8,
    pub castle_king: bool,
    pub castle_queen: bool,
}

/// Everything [Board::undo_move] needs to take back a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Unmove {
    moved: Piece,
    captured: Option<(u8, Piece)>,
    white_pieces: PiecePositions,
    black_pieces: PiecePositions,
    en_passant_square: Option<u8>,
    half_moves_since_capture: u8,
    full_move_count: u32,
    zobrist_hash: u64,
}

impl Unmove {
    pub fn captured(&self) -> Option<Piece> {
        self.captured.map(|(_, piece)| piece)
    }
}

const KNIGHT_OFFSETS: [(i8, i8); 8] = [
    (2, 1),
    (2, -1),
    (1, -2),
    (-1, -2),
    (-2, -1),
    (-2, 1),
    (-1, 2),
    (1, 2),
];

const KING_OFFSETS: [(i8, i8); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
];

const ROOK_DIRECTIONS: [(i8, i8); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];
const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, -1), (1, 1), (-1, 1), (-1, -1)];

#[inline]
fn offset_square(square: u8, (dx, dy): (i8, i8)) -> Option<u8> {
    let x = (square % 8) as i8 + dx;
    let y = (square / 8) as i8 + dy;
    if (0..8).contains(&x) && (0..8).contains(&y) {
        Some((y * 8 + x) as u8)
    } else {
        None
    }
}

/// Returns true if any piece of color `by` attacks `target` on `fields`.
fn is_square_attacked(fields: &[Option<Piece>; 64], target: u8, by: Color) -> bool {
    let holds = |square: u8, types: &[PieceType]| {
        fields[square as usize].is_some_and(|p| p.color() == by && types.contains(&p.typ()))
    };

    // a white pawn attacks upwards, so it sits one row below the target
    let pawn_dy = match by {
        Color::White => 1,
        Color::Black => -1,
    };
    for dx in [-1, 1] {
        if let Some(square) = offset_square(target, (dx, pawn_dy)) {
            if holds(square, &[PieceType::Pawn][..]) {
                return true;
            }
        }
    }

    for offset in KNIGHT_OFFSETS {
        if let Some(square) = offset_square(target, offset) {
            if holds(square, &[PieceType::Knight][..]) {
                return true;
            }
        }
    }

    for offset in KING_OFFSETS {
        if let Some(square) = offset_square(target, offset) {
            if holds(square, &[PieceType::King][..]) {
                return true;
            }
        }
    }

    let sliders = [
        (ROOK_DIRECTIONS, [PieceType::Rook, PieceType::Queen]),
        (BISHOP_DIRECTIONS, [PieceType::Bishop, PieceType::Queen]),
    ];
    for (directions, types) in sliders {
        for direction in directions {
            let mut current = target;
            while let Some(square) = offset_square(current, direction) {
                if fields[square as usize].is_some() {
                    if holds(square, &types[..]) {
                        return true;
                    }
                    break;
                }
                current = square;
            }
        }
    }

    false
}

#[derive(Debug, Clone)]
pub struct Board {
    fields: [Option<Piece>; 64],

    pub white_pieces: PiecePositions,
    pub black_pieces: PiecePositions,

    pub next_move: Color,

    pub en_passant_square: Option<u8>,

    pub half_moves_since_capture: u8,
    pub full_move_count: u32,

    pub previous_positions: HashMap<u64, u8>,

    pub zobrist_hash: u64,
}

impl PartialEq<Board> for Board {
    fn eq(&self, other: &Board) -> bool {
        // those should be all fields, except for zobrist hash and history
        self.fields == other.fields
            && self.white_pieces == other.white_pieces
            && self.black_pieces == other.black_pieces
            && self.next_move == other.next_move
            && self.en_passant_square == other.en_passant_square
            && self.half_moves_since_capture == other.half_moves_since_capture
            && self.full_move_count == other.full_move_count
    }
}
impl Eq for Board {}

impl Board {
    pub fn from_fen(fen: &str) -> std::result::Result<Self, String> {
        let mut parts = fen.split_whitespace();

        let placement = parts.next().ok_or_else(|| "Empty FEN".to_string())?;

        let mut fields = [None; 64];
        let mut idx = 0usize;
        let mut kings = [Vec::new(), Vec::new()];

        // parse piece positions
        for char in placement.chars() {
            match char {
                '1'..='8' => {
                    idx += char as usize - '0' as usize;
                    if idx > 64 {
                        return Err("Too many squares in FEN".to_string());
                    }
                }
                '/' => {
                    if idx % 8 != 0 || idx == 0 || idx == 64 {
                        return Err("'/' must come between 2 lines".to_string());
                    }
                }
                _ => {
                    let piece = Piece::from_fen_char(char)
                        .ok_or_else(|| format!("unexpected '{char}' instead of piece"))?;
                    if idx >= 64 {
                        return Err("Too many squares in FEN".to_string());
                    }
                    if piece.typ() == PieceType::King {
                        kings[(piece.color() == Color::Black) as usize].push(idx as u8);
                    }
                    fields[idx] = Some(piece);
                    idx += 1;
                }
            }
        }
        if idx != 64 {
            return Err(format!("Expected 64 squares but got {idx}"));
        }

        let [white_kings, black_kings] = kings;
        let (white_king, black_king) = match (white_kings.as_slice(), black_kings.as_slice()) {
            ([white], [black]) => (*white, *black),
            _ => return Err("Expected exactly one king per color".to_string()),
        };

        let next_move = match parts.next() {
            Some("b") => Color::Black,
            Some("w") => Color::White,
            _ => return Err("Expected either 'w' or 'b' to move".to_string()),
        };

        let mut white_castle_king: bool = false;
        let mut white_castle_queen: bool = false;
        let mut black_castle_king: bool = false;
        let mut black_castle_queen: bool = false;

        match parts.next() {
            Some("-") => {}
            Some(castling) => {
                for c in castling.chars() {
                    match c {
                        'k' => black_castle_king = true,
                        'q' => black_castle_queen = true,
                        'K' => white_castle_king = true,
                        'Q' => white_castle_queen = true,
                        c => return Err(format!("Expected castling availability but got {c:?}")),
                    }
                }
            }
            None => return Err("Expected castling availability".to_string()),
        }

        let en_passant_square = match parts.next() {
            Some("-") => None,
            Some(name) => Some(
                square::parse(name)
                    .ok_or_else(|| format!("Expected en-passant square, got '{name}'"))?,
            ),
            None => return Err("Expected en-passant".to_string()),
        };

        // anything past 100 is a draw already, so larger clocks saturate
        let half_moves_since_capture: u8 = match parts.next() {
            Some(half_moves) => half_moves
                .parse::<u32>()
                .map(|half_moves| u8::try_from(half_moves).unwrap_or(u8::MAX))
                .map_err(|_| "Could not parse half-move-count".to_string())?,
            None => 0,
        };

        let full_move_count: u32 = match parts.next() {
            Some(full_moves) => full_moves
                .parse()
                .map_err(|_| "Could not parse move-count".to_string())?,
            None => 1,
        };

        if parts.next().is_some() {
            return Err("Expected end of FEN".to_string());
        }

        let white_pieces = PiecePositions {
            color: Color::White,
            king: white_king,
            castle_king: white_castle_king,
            castle_queen: white_castle_queen,
        };
        let black_pieces = PiecePositions {
            color: Color::Black,
            king: black_king,
            castle_king: black_castle_king,
            castle_queen: black_castle_queen,
        };

        let zobrist_hash = ZOBRIST_KEYS.hash(
            &fields,
            &white_pieces,
            &black_pieces,
            en_passant_square,
            next_move,
        );

        let mut previous_positions = HashMap::new();
        previous_positions.insert(zobrist_hash, 1);

        let board = Board {
            fields,
            white_pieces,
            black_pieces,
            next_move,
            en_passant_square,
            half_moves_since_capture,
            full_move_count,
            previous_positions,
            zobrist_hash,
        };

        if let Some(en_passant) = en_passant_square {
            board.check_en_passant_square(en_passant)?;
        }

        if board.is_in_check(!next_move) {
            return Err(format!("{} to move but {} is in check", next_move, !next_move));
        }

        Ok(board)
    }

    /// An en-passant square must lie directly behind a pawn of the side not
    /// to move that could just have made a double step.
    fn check_en_passant_square(&self, en_passant: u8) -> std::result::Result<(), String> {
        let (target_row, pawn_row, start_row) = match self.next_move {
            Color::White => (2, 3, 1),
            Color::Black => (5, 4, 6),
        };
        let col = square::col(en_passant);
        let pushed_pawn = Piece::new(PieceType::Pawn, !self.next_move);
        if square::row(en_passant) != target_row
            || self[en_passant].is_some()
            || self[square::at(col, start_row)].is_some()
            || self[square::at(col, pawn_row)] != Some(pushed_pawn)
        {
            return Err(format!(
                "En-passant square {} does not match the position",
                square::name(en_passant)
            ));
        }
        Ok(())
    }

    pub fn calculate_zobrist_hash(&self) -> u64 {
        ZOBRIST_KEYS.hash(
            &self.fields,
            &self.white_pieces,
            &self.black_pieces,
            self.en_passant_square,
            self.next_move,
        )
    }

    pub fn generate_fen(&self) -> String {
        let mut fen = String::new();

        for row in 0..8 {
            let mut empty_count = 0;
            for col in 0..8 {
                match self[square::at(col, row)] {
                    Some(piece) => {
                        if empty_count > 0 {
                            fen.push_str(&empty_count.to_string());
                            empty_count = 0;
                        }
                        fen.push(piece.fen_char())
                    }
                    None => empty_count += 1,
                }
            }
            if empty_count > 0 {
                fen.push_str(&empty_count.to_string());
            }
            if row != 7 {
                fen.push('/');
            }
        }

        fen.push(' ');
        match self.next_move {
            Color::White => fen.push('w'),
            Color::Black => fen.push('b'),
        }
        fen.push(' ');

        if !self.white_pieces.castle_king
            && !self.white_pieces.castle_queen
            && !self.black_pieces.castle_king
            && !self.black_pieces.castle_queen
        {
            fen.push('-');
        } else {
            if self.white_pieces.castle_king {
                fen.push('K');
            }
            if self.white_pieces.castle_queen {
                fen.push('Q');
            }
            if self.black_pieces.castle_king {
                fen.push('k');
            }
            if self.black_pieces.castle_queen {
                fen.push('q');
            }
        }
        fen.push(' ');

        match self.en_passant_square {
            Some(en_passant_square) => fen.push_str(&square::name(en_passant_square)),
            None => fen.push('-'),
        }
        fen.push(' ');

        fen.push_str(&self.half_moves_since_capture.to_string());
        fen.push(' ');
        fen.push_str(&self.full_move_count.to_string());

        fen
    }

    #[inline]
    pub fn side_to_move(&self) -> Color {
        self.next_move
    }

    /// Squares holding a piece of kind `typ` and color `color`, a8 first.
    pub fn piece_squares(&self, typ: PieceType, color: Color) -> impl Iterator<Item = u8> + '_ {
        let wanted = Piece::new(typ, color);
        (0..64u8).filter(move |&square| self[square] == Some(wanted))
    }

    /// Threefold repetition or 100 half moves without capture or pawn move.
    pub fn is_draw_by_rule(&self) -> bool {
        if self
            .previous_positions
            .get(&self.zobrist_hash)
            .is_some_and(|&count| count >= 3)
        {
            return true;
        }
        self.half_moves_since_capture >= 100
    }

    pub fn is_checkmate(&self) -> bool {
        self.is_in_check(self.next_move) && self.legal_moves().is_empty()
    }

    pub fn is_stalemate(&self) -> bool {
        !self.is_in_check(self.next_move) && self.legal_moves().is_empty()
    }

    /// Neither side can possibly deliver mate.
    pub fn has_insufficient_material(&self) -> bool {
        Color::ALL_COLORS
            .iter()
            .all(|&color| self.lacks_mating_material(color))
    }

    fn lacks_mating_material(&self, color: Color) -> bool {
        let mut own = [0usize; 6];
        let mut other = [0usize; 6];
        let mut light_bishops = 0;
        let mut dark_bishops = 0;
        for (square, piece) in self.fields.iter().enumerate() {
            let Some(piece) = piece else { continue };
            if piece.color() == color {
                own[piece.typ().index()] += 1;
            } else {
                other[piece.typ().index()] += 1;
            }
            if piece.typ() == PieceType::Bishop {
                if square::is_dark(square as u8) {
                    dark_bishops += 1;
                } else {
                    light_bishops += 1;
                }
            }
        }

        let count = |counts: &[usize; 6], typ: PieceType| counts[typ.index()];
        if count(&own, PieceType::Pawn) > 0
            || count(&own, PieceType::Rook) > 0
            || count(&own, PieceType::Queen) > 0
        {
            return false;
        }

        if count(&own, PieceType::Knight) > 0 {
            // a lone knight can only mate with help from enemy pieces
            let own_pieces: usize = own.iter().sum();
            let helpers = count(&other, PieceType::Pawn)
                + count(&other, PieceType::Knight)
                + count(&other, PieceType::Bishop)
                + count(&other, PieceType::Rook);
            return own_pieces <= 2 && helpers == 0;
        }

        if count(&own, PieceType::Bishop) > 0 {
            let same_color = light_bishops == 0 || dark_bishops == 0;
            return same_color
                && count(&other, PieceType::Pawn) == 0
                && count(&other, PieceType::Knight) == 0;
        }

        true
    }

    #[inline]
    pub fn piece_positions(&self, color: Color) -> &PiecePositions {
        match color {
            Color::White => &self.white_pieces,
            Color::Black => &self.black_pieces,
        }
    }

    #[inline]
    pub fn piece_positions_mut(&mut self, color: Color) -> &mut PiecePositions {
        match color {
            Color::White => &mut self.white_pieces,
            Color::Black => &mut self.black_pieces,
        }
    }

    pub fn is_in_check(&self, king_color: Color) -> bool {
        let king_pos = self.piece_positions(king_color).king;
        is_square_attacked(&self.fields, king_pos, !king_color)
    }

    /// The piece `mve` removes from the board, if any.
    pub fn captured_piece(&self, mve: Move) -> Option<Piece> {
        match mve.typ {
            MoveType::Castle => None,
            MoveType::EnPassant => {
                self[mve.from].map(|pawn| Piece::new(PieceType::Pawn, !pawn.color()))
            }
            MoveType::Normal | MoveType::Promotion => self[mve.to],
        }
    }

    /// Piece placement after `mve`, leaving everything else untouched.
    fn fields_after(&self, mve: Move) -> [Option<Piece>; 64] {
        let mut fields = self.fields;
        let from = mve.from as usize;
        let to = mve.to as usize;
        match mve.typ {
            MoveType::EnPassant => {
                fields[square::at(square::col(mve.to), square::row(mve.from)) as usize] = None;
            }
            MoveType::Castle => {
                let (rook_from, rook_to) = mve.castle_rook_squares();
                fields[rook_to as usize] = fields[rook_from as usize].take();
            }
            MoveType::Normal | MoveType::Promotion => {}
        }
        fields[to] = mve.promote_to.or(fields[from]);
        fields[from] = None;
        fields
    }

    /// Checks if a given move is valid. This does ignore [Board.next_move] and
    /// instead pretends that it is temporarialy set to the color of the piece
    /// in `mve`.
    pub fn is_valid_move(&self, mve: Move) -> bool {
        let Some(piece) = self[mve.from] else {
            return false;
        };
        let color = piece.color();
        let fields = self.fields_after(mve);
        let king = if piece.typ() == PieceType::King {
            mve.to
        } else {
            self.piece_positions(color).king
        };
        !is_square_attacked(&fields, king, !color)
    }

    /// Returns true if playing `mve` attacks the opponent king.
    pub fn gives_check(&self, mve: Move) -> bool {
        let Some(piece) = self[mve.from] else {
            return false;
        };
        let enemy = !piece.color();
        let fields = self.fields_after(mve);
        is_square_attacked(&fields, self.piece_positions(enemy).king, piece.color())
    }

    fn generate_valid_moves_ignore_checks(&self, color: Color) -> Vec<Move> {
        let mut moves = Vec::with_capacity(218);
        for pos in 0..64u8 {
            if let Some(piece) = self[pos] {
                if piece.color() == color {
                    self.generate_moves_for_piece_int(pos, piece, &mut moves);
                }
            }
        }
        moves
    }

    /// All legal moves for `color`, in a fixed order that only depends on
    /// the position.
    pub fn generate_valid_moves(&self, color: Color) -> Vec<Move> {
        let mut moves = self.generate_valid_moves_ignore_checks(color);
        moves.retain(|m| self.is_valid_move(*m));
        moves
    }

    /// All legal moves for the side to move.
    #[inline]
    pub fn legal_moves(&self) -> Vec<Move> {
        self.generate_valid_moves(self.next_move)
    }

    fn generate_moves_for_piece_int(&self, piece_at: u8, piece: Piece, moves: &mut Vec<Move>) {
        match piece.typ() {
            PieceType::King => self.generate_king_moves(piece_at, piece, moves),
            PieceType::Queen => {
                self.generate_sliding_moves(piece_at, piece, &ROOK_DIRECTIONS, moves);
                self.generate_sliding_moves(piece_at, piece, &BISHOP_DIRECTIONS, moves);
            }
            PieceType::Bishop => {
                self.generate_sliding_moves(piece_at, piece, &BISHOP_DIRECTIONS, moves)
            }
            PieceType::Knight => self.generate_step_moves(piece_at, piece, &KNIGHT_OFFSETS, moves),
            PieceType::Rook => self.generate_sliding_moves(piece_at, piece, &ROOK_DIRECTIONS, moves),
            PieceType::Pawn => self.generate_pawn_moves(piece_at, piece, moves),
        }
    }

    fn generate_step_moves(
        &self,
        piece_at: u8,
        piece: Piece,
        offsets: &[(i8, i8)],
        moves: &mut Vec<Move>,
    ) {
        let color = piece.color();
        for &offset in offsets {
            let Some(target) = offset_square(piece_at, offset) else {
                continue;
            };
            match self[target] {
                Some(other) if other.color() == color => {}
                _ => moves.push(Move::new(piece_at, target)),
            }
        }
    }

    fn generate_pawn_moves(&self, piece_at: u8, piece: Piece, moves: &mut Vec<Move>) {
        let color = piece.color();
        let (dir, promotion_row, double_move_start) = match color {
            Color::White => (-1, 0, 6),
            Color::Black => (1, 7, 1),
        };

        // add possible moves to `target`, including possible promotions
        let add_moves = |moves: &mut Vec<Move>, target: u8| {
            if square::row(target) == promotion_row {
                for promo in PieceType::ALL_PROMTION_TARGETS {
                    moves.push(Move::promotion(piece_at, target, Piece::new(promo, color)));
                }
            } else {
                moves.push(Move::new(piece_at, target));
            }
        };

        // move 1 forward
        if let Some(target) = offset_square(piece_at, (0, dir)) {
            if self[target].is_none() {
                add_moves(moves, target);
                // check if we can move 2 forward
                if square::row(piece_at) == double_move_start {
                    if let Some(target) = offset_square(piece_at, (0, 2 * dir)) {
                        if self[target].is_none() {
                            add_moves(moves, target);
                        }
                    }
                }
            }
        }

        // check capture and en-passant
        for dx in [-1, 1] {
            let Some(target) = offset_square(piece_at, (dx, dir)) else {
                continue;
            };
            if self.en_passant_square == Some(target) {
                moves.push(Move::en_passant(piece_at, target));
            } else if let Some(other) = self[target] {
                if other.color() != color {
                    add_moves(moves, target);
                }
            }
        }
    }

    fn generate_king_moves(&self, piece_at: u8, piece: Piece, moves: &mut Vec<Move>) {
        let color = piece.color();
        self.generate_step_moves(piece_at, piece, &KING_OFFSETS, moves);

        let castle_row = match color {
            Color::White => 7,
            Color::Black => 0,
        };
        if piece_at != square::at(4, castle_row) {
            return;
        }

        let bidx = |col| square::at(col, castle_row);
        let rook = Some(Piece::new(PieceType::Rook, color));

        let piece_positions = self.piece_positions(color);
        let castle_king = piece_positions.castle_king
            && self[bidx(7)] == rook
            && self[bidx(5)].is_none()
            && self[bidx(6)].is_none();
        let castle_queen = piece_positions.castle_queen
            && self[bidx(0)] == rook
            && self[bidx(1)].is_none()
            && self[bidx(2)].is_none()
            && self[bidx(3)].is_none();

        if !castle_king && !castle_queen {
            return;
        }

        let attacked = |col| is_square_attacked(&self.fields, bidx(col), !color);
        if attacked(4) {
            return;
        }

        if castle_king && !attacked(5) && !attacked(6) {
            moves.push(Move::castle(piece_at, bidx(6)));
        }
        if castle_queen && !attacked(3) && !attacked(2) {
            moves.push(Move::castle(piece_at, bidx(2)));
        }
    }

    fn generate_sliding_moves(
        &self,
        piece_at: u8,
        piece: Piece,
        directions: &[(i8, i8)],
        moves: &mut Vec<Move>,
    ) {
        let color = piece.color();
        for &direction in directions {
            let mut current = piece_at;
            while let Some(target) = offset_square(current, direction) {
                match self[target] {
                    None => moves.push(Move::new(piece_at, target)),
                    Some(p) => {
                        if p.color() != color {
                            moves.push(Move::new(piece_at, target));
                        }
                        break;
                    }
                }
                current = target;
            }
        }
    }

    /// Plays a given move and returns what is needed to take it back with
    /// [Board::undo_move]. This assumes that the move is valid.
    pub fn play_move(&mut self, mve: Move) -> Unmove {
        let Some(moved) = self[mve.from] else {
            panic!("no piece to move on {}", square::name(mve.from));
        };
        debug_assert_eq!(moved.color(), self.next_move);
        let color = moved.color();
        let keys = &*ZOBRIST_KEYS;

        let mut unmove = Unmove {
            moved,
            captured: None,
            white_pieces: self.white_pieces,
            black_pieces: self.black_pieces,
            en_passant_square: self.en_passant_square,
            half_moves_since_capture: self.half_moves_since_capture,
            full_move_count: self.full_move_count,
            zobrist_hash: self.zobrist_hash,
        };

        // state keys are removed here and added back once the move is done
        let mut hash = self.zobrist_hash;
        if let Some(en_passant) = self.en_passant_square {
            hash ^= keys.en_passant(en_passant);
        }
        hash ^= keys.castle_rights(&self.white_pieces);
        hash ^= keys.castle_rights(&self.black_pieces);

        match mve.typ {
            MoveType::EnPassant => {
                let captured_at = square::at(square::col(mve.to), square::row(mve.from));
                if let Some(captured) = self[captured_at].take() {
                    debug_assert_eq!(captured.typ(), PieceType::Pawn);
                    unmove.captured = Some((captured_at, captured));
                }
            }
            MoveType::Castle => {
                let (rook_from, rook_to) = mve.castle_rook_squares();
                let Some(rook) = self[rook_from].take() else {
                    panic!("castling without a rook on {}", square::name(rook_from));
                };
                debug_assert_eq!(rook.typ(), PieceType::Rook);
                self[rook_to] = Some(rook);
                hash ^= keys.piece(rook_from, rook);
                hash ^= keys.piece(rook_to, rook);
            }
            MoveType::Normal | MoveType::Promotion => {
                unmove.captured = self[mve.to].map(|captured| (mve.to, captured));
            }
        }
        if let Some((captured_at, captured)) = unmove.captured {
            hash ^= keys.piece(captured_at, captured);
        }

        // piece might be different from moved piece, because of possible promotion
        let placed = mve.promote_to.unwrap_or(moved);
        self[mve.from] = None;
        self[mve.to] = Some(placed);
        hash ^= keys.piece(mve.from, moved);
        hash ^= keys.piece(mve.to, placed);

        if moved.typ() == PieceType::King {
            let positions = self.piece_positions_mut(color);
            positions.king = mve.to;
            positions.castle_king = false;
            positions.castle_queen = false;
        }
        // moving from or capturing on a rook corner loses that castling right
        for corner in [mve.from, mve.to] {
            match corner {
                63 => self.white_pieces.castle_king = false,
                56 => self.white_pieces.castle_queen = false,
                7 => self.black_pieces.castle_king = false,
                0 => self.black_pieces.castle_queen = false,
                _ => {}
            }
        }

        self.en_passant_square =
            if moved.typ() == PieceType::Pawn && mve.to.abs_diff(mve.from) == 16 {
                Some(mve.to.min(mve.from) + 8)
            } else {
                None
            };

        if unmove.captured.is_some() || moved.typ() == PieceType::Pawn {
            self.half_moves_since_capture = 0;
        } else {
            self.half_moves_since_capture = self.half_moves_since_capture.saturating_add(1);
        }
        if color == Color::Black {
            self.full_move_count += 1;
        }

        // toggle color for next move
        self.next_move = !color;
        hash ^= keys.black_to_move;
        if let Some(en_passant) = self.en_passant_square {
            hash ^= keys.en_passant(en_passant);
        }
        hash ^= keys.castle_rights(&self.white_pieces);
        hash ^= keys.castle_rights(&self.black_pieces);
        self.zobrist_hash = hash;

        *self.previous_positions.entry(hash).or_insert(0) += 1;

        unmove
    }

    /// Takes back `mve`, which must be the last move played on this board.
    pub fn undo_move(&mut self, mve: Move, unmove: Unmove) {
        if let Entry::Occupied(mut seen) = self.previous_positions.entry(self.zobrist_hash) {
            *seen.get_mut() -= 1;
            if *seen.get() == 0 {
                seen.remove();
            }
        }

        self[mve.to] = None;
        self[mve.from] = Some(unmove.moved);
        if mve.typ == MoveType::Castle {
            let (rook_from, rook_to) = mve.castle_rook_squares();
            self[rook_from] = self[rook_to].take();
        }
        if let Some((captured_at, captured)) = unmove.captured {
            self[captured_at] = Some(captured);
        }

        self.next_move = unmove.moved.color();
        self.white_pieces = unmove.white_pieces;
        self.black_pieces = unmove.black_pieces;
        self.en_passant_square = unmove.en_passant_square;
        self.half_moves_since_capture = unmove.half_moves_since_capture;
        self.full_move_count = unmove.full_move_count;
        self.zobrist_hash = unmove.zobrist_hash;
    }

    /// Plays `mve` for as long as the returned guard lives. The move is taken
    /// back when the guard is dropped.
    pub fn scoped_move(&mut self, mve: Move) -> PlayedMove<'_> {
        #[cfg(feature = "slow-stats")]
        let before = (self.clone(), self.zobrist_hash);
        let unmove = self.play_move(mve);
        PlayedMove {
            board: self,
            mve,
            unmove,
            #[cfg(feature = "slow-stats")]
            before,
        }
    }
}

/// A move applied to a [Board] until this guard is dropped.
pub struct PlayedMove<'a> {
    board: &'a mut Board,
    mve: Move,
    unmove: Unmove,
    #[cfg(feature = "slow-stats")]
    before: (Board, u64),
}

impl PlayedMove<'_> {
    pub fn captured(&self) -> Option<Piece> {
        self.unmove.captured()
    }
}

impl Deref for PlayedMove<'_> {
    type Target = Board;

    fn deref(&self) -> &Board {
        self.board
    }
}

impl DerefMut for PlayedMove<'_> {
    fn deref_mut(&mut self) -> &mut Board {
        self.board
    }
}

impl Drop for PlayedMove<'_> {
    fn drop(&mut self) {
        self.board.undo_move(self.mve, self.unmove);

        #[cfg(feature = "slow-stats")]
        {
            let (before, hash) = &self.before;
            assert_eq!(self.board, before, "undo of {} changed the board", self.mve);
            assert_eq!(self.board.zobrist_hash, *hash);
            assert_eq!(self.board.previous_positions, before.previous_positions);
        }
    }
}

impl Index<usize> for Board {
    type Output = Option<Piece>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.fields[index]
    }
}

impl IndexMut<usize> for Board {
    fn index_mut(&mut self, index: usize) -> &mut Self::Output {
        &mut self.fields[index]
    }
}

impl Index<u8> for Board {
    type Output = Option<Piece>;

    fn index(&self, index: u8) -> &Self::Output {
        &self[index as usize]
    }
}

impl IndexMut<u8> for Board {
    fn index_mut(&mut self, index: u8) -> &mut Self::Output {
        &mut self[index as usize]
    }
}
