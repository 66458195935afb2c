use crate::bitboard::*;
use crate::error::{EngineError, EngineResult};
use crate::movegen::Move;
use crate::zobrist::ZOBRIST;
use std::fmt;
use std::ops::{Deref, DerefMut};

pub const STARTPOS: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    White = 0,
    Black = 1,
}

impl Color {
    pub fn flip(self) -> Self {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PieceKind {
    Pawn = 0,
    Knight = 1,
    Bishop = 2,
    Rook = 3,
    Queen = 4,
    King = 5,
}

impl PieceKind {
    pub const ALL: [PieceKind; 6] = [
        PieceKind::Pawn,
        PieceKind::Knight,
        PieceKind::Bishop,
        PieceKind::Rook,
        PieceKind::Queen,
        PieceKind::King,
    ];

    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn to_char(self) -> char {
        match self {
            PieceKind::Pawn => 'p',
            PieceKind::Knight => 'n',
            PieceKind::Bishop => 'b',
            PieceKind::Rook => 'r',
            PieceKind::Queen => 'q',
            PieceKind::King => 'k',
        }
    }

    pub fn from_char(ch: char) -> Option<Self> {
        match ch.to_ascii_lowercase() {
            'p' => Some(PieceKind::Pawn),
            'n' => Some(PieceKind::Knight),
            'b' => Some(PieceKind::Bishop),
            'r' => Some(PieceKind::Rook),
            'q' => Some(PieceKind::Queen),
            'k' => Some(PieceKind::King),
            _ => None,
        }
    }
}

/// A colored piece. Indices 0..5 are white pawn..king, 6..11 black pawn..king.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Piece {
    WhitePawn = 0,
    WhiteKnight = 1,
    WhiteBishop = 2,
    WhiteRook = 3,
    WhiteQueen = 4,
    WhiteKing = 5,
    BlackPawn = 6,
    BlackKnight = 7,
    BlackBishop = 8,
    BlackRook = 9,
    BlackQueen = 10,
    BlackKing = 11,
}

impl Piece {
    pub const ALL: [Piece; 12] = [
        Piece::WhitePawn,
        Piece::WhiteKnight,
        Piece::WhiteBishop,
        Piece::WhiteRook,
        Piece::WhiteQueen,
        Piece::WhiteKing,
        Piece::BlackPawn,
        Piece::BlackKnight,
        Piece::BlackBishop,
        Piece::BlackRook,
        Piece::BlackQueen,
        Piece::BlackKing,
    ];

    #[inline(always)]
    pub fn new(kind: PieceKind, color: Color) -> Self {
        Self::ALL[color.index() * 6 + kind.index()]
    }

    #[inline(always)]
    pub fn index(self) -> usize {
        self as usize
    }

    #[inline(always)]
    pub fn kind(self) -> PieceKind {
        PieceKind::ALL[self.index() % 6]
    }

    #[inline(always)]
    pub fn color(self) -> Color {
        if self.index() < 6 {
            Color::White
        } else {
            Color::Black
        }
    }

    pub fn to_char(self) -> char {
        let ch = self.kind().to_char();
        match self.color() {
            Color::White => ch.to_ascii_uppercase(),
            Color::Black => ch,
        }
    }

    pub fn from_char(ch: char) -> Option<Self> {
        let kind = PieceKind::from_char(ch)?;
        let color = if ch.is_ascii_uppercase() { Color::White } else { Color::Black };
        Some(Piece::new(kind, color))
    }
}

pub const PIECE_VALUES: [i32; 6] = [100, 320, 330, 500, 900, 20000];

// Castling rights bits
pub const WHITE_KINGSIDE: u8 = 1;
pub const WHITE_QUEENSIDE: u8 = 2;
pub const BLACK_KINGSIDE: u8 = 4;
pub const BLACK_QUEENSIDE: u8 = 8;

// Occupancy indices
pub const WHITE: usize = 0;
pub const BLACK: usize = 1;
pub const BOTH: usize = 2;

/// Rights that survive a move touching each square: rights &= table[from] & table[to].
#[rustfmt::skip]
const CASTLING_MASK: [u8; 64] = [
    13, 15, 15, 15, 12, 15, 15, 14,
    15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15,
    15, 15, 15, 15, 15, 15, 15, 15,
     7, 15, 15, 15,  3, 15, 15, 11,
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoardState {
    pub pieces: [Bitboard; 12],
    pub occupancy: [Bitboard; 3],
    pub side_to_move: Color,
    pub castling_rights: u8,
    pub ep_square: Option<Square>,
    pub halfmove_clock: u16,
    pub fullmove_number: u16,
    pub hash: u64,
}

/// Saved copy of every mutable field, taken before a move is applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Snapshot(BoardState);

impl Default for BoardState {
    fn default() -> Self {
        Self::startpos()
    }
}

impl BoardState {
    fn empty() -> Self {
        BoardState {
            pieces: [EMPTY; 12],
            occupancy: [EMPTY; 3],
            side_to_move: Color::White,
            castling_rights: 0,
            ep_square: None,
            halfmove_clock: 0,
            fullmove_number: 1,
            hash: 0,
        }
    }

    pub fn startpos() -> Self {
        let mut board = Self::empty();

        let back_rank = [
            (PieceKind::Rook, 0x81u64),
            (PieceKind::Knight, 0x42),
            (PieceKind::Bishop, 0x24),
            (PieceKind::Queen, 0x08),
            (PieceKind::King, 0x10),
        ];
        board.pieces[Piece::WhitePawn.index()] = RANK_2;
        board.pieces[Piece::BlackPawn.index()] = RANK_7;
        for (kind, bb) in back_rank {
            board.pieces[Piece::new(kind, Color::White).index()] = bb;
            board.pieces[Piece::new(kind, Color::Black).index()] = bb << 56;
        }

        board.castling_rights = WHITE_KINGSIDE | WHITE_QUEENSIDE | BLACK_KINGSIDE | BLACK_QUEENSIDE;
        board.refresh();
        board
    }

    pub fn from_fen(fen: &str) -> EngineResult<Self> {
        let mut fields = fen.split_whitespace();
        let mut board = Self::empty();

        let placement = fields
            .next()
            .ok_or(EngineError::MissingFenField { field: "placement" })?;
        let bad_placement = || EngineError::InvalidFenField {
            field: "placement",
            value: placement.to_string(),
        };

        let ranks: Vec<&str> = placement.split('/').collect();
        if ranks.len() != 8 {
            return Err(bad_placement());
        }

        for (i, rank_str) in ranks.iter().enumerate() {
            let rank = 7 - i as u8;
            let mut file = 0u8;
            for ch in rank_str.chars() {
                if let Some(skip) = ch.to_digit(10) {
                    if !(1..=8).contains(&skip) {
                        return Err(bad_placement());
                    }
                    file += skip as u8;
                } else {
                    let piece = Piece::from_char(ch).ok_or_else(bad_placement)?;
                    if file > 7 {
                        return Err(bad_placement());
                    }
                    if piece.kind() == PieceKind::Pawn && (rank == 0 || rank == 7) {
                        return Err(bad_placement());
                    }
                    let sq = rank * 8 + file;
                    board.pieces[piece.index()] = set_bit(board.pieces[piece.index()], sq);
                    file += 1;
                }
                if file > 8 {
                    return Err(bad_placement());
                }
            }
            if file != 8 {
                return Err(bad_placement());
            }
        }

        let side = fields.next().ok_or(EngineError::MissingFenField { field: "side" })?;
        board.side_to_move = match side {
            "w" => Color::White,
            "b" => Color::Black,
            _ => {
                return Err(EngineError::InvalidFenField {
                    field: "side",
                    value: side.to_string(),
                })
            }
        };

        let castling = fields
            .next()
            .ok_or(EngineError::MissingFenField { field: "castling" })?;
        if castling != "-" {
            for ch in castling.chars() {
                board.castling_rights |= match ch {
                    'K' => WHITE_KINGSIDE,
                    'Q' => WHITE_QUEENSIDE,
                    'k' => BLACK_KINGSIDE,
                    'q' => BLACK_QUEENSIDE,
                    _ => {
                        return Err(EngineError::InvalidFenField {
                            field: "castling",
                            value: castling.to_string(),
                        })
                    }
                };
            }
        }
        // Rights whose king or rook has left its home square are dropped.
        board.castling_rights &= board.castling_supported_by_placement();

        let ep = fields
            .next()
            .ok_or(EngineError::MissingFenField { field: "en passant" })?;
        if ep != "-" {
            let sq = parse_square(ep)?;
            if !board.is_valid_ep_square(sq) {
                return Err(EngineError::InvalidFenField {
                    field: "en passant",
                    value: ep.to_string(),
                });
            }
            board.ep_square = Some(sq);
        }

        // Clocks are optional; many GUIs omit them.
        if let Some(halfmove) = fields.next() {
            board.halfmove_clock = halfmove.parse().map_err(|_| EngineError::InvalidFenField {
                field: "halfmove clock",
                value: halfmove.to_string(),
            })?;
        }
        if let Some(fullmove) = fields.next() {
            board.fullmove_number = fullmove.parse().map_err(|_| EngineError::InvalidFenField {
                field: "fullmove number",
                value: fullmove.to_string(),
            })?;
        }

        board.refresh();
        Ok(board)
    }

    fn castling_supported_by_placement(&self) -> u8 {
        let on = |kind: PieceKind, color: Color, sq: Square| get_bit(self.bitboard(kind, color), sq);
        let mut rights = 0;
        if on(PieceKind::King, Color::White, 4) {
            if on(PieceKind::Rook, Color::White, 7) {
                rights |= WHITE_KINGSIDE;
            }
            if on(PieceKind::Rook, Color::White, 0) {
                rights |= WHITE_QUEENSIDE;
            }
        }
        if on(PieceKind::King, Color::Black, 60) {
            if on(PieceKind::Rook, Color::Black, 63) {
                rights |= BLACK_KINGSIDE;
            }
            if on(PieceKind::Rook, Color::Black, 56) {
                rights |= BLACK_QUEENSIDE;
            }
        }
        rights
    }

    /// An en passant target sits empty behind an enemy pawn that has just
    /// double-pushed: rank 6 with white to move, rank 3 with black to move.
    fn is_valid_ep_square(&self, sq: Square) -> bool {
        let (target_rank, pawn_sq) = match self.side_to_move {
            Color::White => (5, sq.wrapping_sub(8)),
            Color::Black => (2, sq + 8),
        };
        let occupied = self.pieces.iter().any(|&bb| get_bit(bb, sq));
        rank_of(sq) == target_rank
            && !occupied
            && get_bit(self.bitboard(PieceKind::Pawn, self.side_to_move.flip()), pawn_sq)
    }

    pub fn to_fen(&self) -> String {
        let mut fen = String::new();

        for rank in (0..8u8).rev() {
            let mut empty = 0;
            for file in 0..8u8 {
                match self.piece_at(rank * 8 + file) {
                    Some(piece) => {
                        if empty > 0 {
                            fen.push_str(&empty.to_string());
                            empty = 0;
                        }
                        fen.push(piece.to_char());
                    }
                    None => empty += 1,
                }
            }
            if empty > 0 {
                fen.push_str(&empty.to_string());
            }
            if rank > 0 {
                fen.push('/');
            }
        }

        fen.push(' ');
        fen.push(if self.side_to_move == Color::White { 'w' } else { 'b' });

        fen.push(' ');
        if self.castling_rights == 0 {
            fen.push('-');
        } else {
            if self.castling_rights & WHITE_KINGSIDE != 0 { fen.push('K'); }
            if self.castling_rights & WHITE_QUEENSIDE != 0 { fen.push('Q'); }
            if self.castling_rights & BLACK_KINGSIDE != 0 { fen.push('k'); }
            if self.castling_rights & BLACK_QUEENSIDE != 0 { fen.push('q'); }
        }

        fen.push(' ');
        match self.ep_square {
            Some(sq) => fen.push_str(&square_name(sq)),
            None => fen.push('-'),
        }

        fen.push_str(&format!(" {} {}", self.halfmove_clock, self.fullmove_number));
        fen
    }

    /// Rebuilds occupancies and the fingerprint from the piece bitboards.
    fn refresh(&mut self) {
        self.occupancy = [EMPTY; 3];
        for piece in Piece::ALL {
            self.occupancy[piece.color().index()] |= self.pieces[piece.index()];
        }
        self.occupancy[BOTH] = self.occupancy[WHITE] | self.occupancy[BLACK];
        self.hash = ZOBRIST.hash(self);
    }

    #[inline(always)]
    pub fn bitboard(&self, kind: PieceKind, color: Color) -> Bitboard {
        self.pieces[Piece::new(kind, color).index()]
    }

    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        if !get_bit(self.occupancy[BOTH], sq) {
            return None;
        }
        Piece::ALL
            .into_iter()
            .find(|piece| get_bit(self.pieces[piece.index()], sq))
    }

    pub fn king_square(&self, color: Color) -> Option<Square> {
        lsb(self.bitboard(PieceKind::King, color))
    }

    pub fn is_square_attacked(&self, sq: Square, by: Color) -> bool {
        let tables = &ATTACK_TABLES;
        let occ = self.occupancy[BOTH];

        // A pawn of `by` attacks sq iff a pawn of the other side on sq would attack it.
        if tables.pawn_attacks[by.flip().index()][sq as usize] & self.bitboard(PieceKind::Pawn, by) != 0 {
            return true;
        }

        if tables.knight_attacks[sq as usize] & self.bitboard(PieceKind::Knight, by) != 0 {
            return true;
        }

        if tables.king_attacks[sq as usize] & self.bitboard(PieceKind::King, by) != 0 {
            return true;
        }

        let queens = self.bitboard(PieceKind::Queen, by);

        if tables.get_bishop_attacks(sq, occ) & (self.bitboard(PieceKind::Bishop, by) | queens) != 0 {
            return true;
        }

        if tables.get_rook_attacks(sq, occ) & (self.bitboard(PieceKind::Rook, by) | queens) != 0 {
            return true;
        }

        false
    }

    pub fn is_in_check(&self, color: Color) -> bool {
        match self.king_square(color) {
            Some(king_sq) => self.is_square_attacked(king_sq, color.flip()),
            None => false,
        }
    }

    /// True when the side to move is in check.
    pub fn in_check(&self) -> bool {
        self.is_in_check(self.side_to_move)
    }

    #[inline(always)]
    fn put_piece(&mut self, piece: Piece, sq: Square) {
        self.pieces[piece.index()] = set_bit(self.pieces[piece.index()], sq);
        self.occupancy[piece.color().index()] = set_bit(self.occupancy[piece.color().index()], sq);
        self.occupancy[BOTH] = set_bit(self.occupancy[BOTH], sq);
        self.hash ^= ZOBRIST.piece(piece, sq);
    }

    #[inline(always)]
    fn remove_piece(&mut self, piece: Piece, sq: Square) {
        self.pieces[piece.index()] = clear_bit(self.pieces[piece.index()], sq);
        self.occupancy[piece.color().index()] = clear_bit(self.occupancy[piece.color().index()], sq);
        self.occupancy[BOTH] = clear_bit(self.occupancy[BOTH], sq);
        self.hash ^= ZOBRIST.piece(piece, sq);
    }

    #[inline(always)]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot(*self)
    }

    #[inline(always)]
    pub fn restore(&mut self, snapshot: Snapshot) {
        *self = snapshot.0;
    }

    /// Plays `mv` in place. Returns false and leaves the board untouched if
    /// the move would leave the mover's king attacked.
    pub fn apply_unguarded(&mut self, mv: Move) -> bool {
        let snapshot = self.snapshot();
        let us = self.side_to_move;
        let them = us.flip();

        self.remove_piece(mv.piece, mv.from);

        if mv.is_en_passant() {
            let captured_sq = match us {
                Color::White => mv.to - 8,
                Color::Black => mv.to + 8,
            };
            self.remove_piece(Piece::new(PieceKind::Pawn, them), captured_sq);
        } else if mv.is_capture() {
            if let Some(captured) = self.piece_at(mv.to) {
                self.remove_piece(captured, mv.to);
            }
        }

        self.put_piece(mv.promotion.unwrap_or(mv.piece), mv.to);

        if mv.is_castle() {
            let (rook_from, rook_to) = match mv.to {
                6 => (7, 5),
                2 => (0, 3),
                62 => (63, 61),
                _ => (56, 59),
            };
            let rook = Piece::new(PieceKind::Rook, us);
            self.remove_piece(rook, rook_from);
            self.put_piece(rook, rook_to);
        }

        if let Some(ep_sq) = self.ep_square.take() {
            self.hash ^= ZOBRIST.en_passant(ep_sq);
        }
        if mv.is_double_push() {
            let ep_sq = (mv.from + mv.to) / 2;
            self.ep_square = Some(ep_sq);
            self.hash ^= ZOBRIST.en_passant(ep_sq);
        }

        self.hash ^= ZOBRIST.castling(self.castling_rights);
        self.castling_rights &= CASTLING_MASK[mv.from as usize] & CASTLING_MASK[mv.to as usize];
        self.hash ^= ZOBRIST.castling(self.castling_rights);

        if mv.piece.kind() == PieceKind::Pawn || mv.is_capture() {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock = self.halfmove_clock.saturating_add(1);
        }
        if us == Color::Black {
            self.fullmove_number = self.fullmove_number.saturating_add(1);
        }

        self.side_to_move = them;
        self.hash ^= ZOBRIST.side();

        if self.is_in_check(us) {
            self.restore(snapshot);
            return false;
        }

        true
    }

    /// Plays `mv` and returns a guard that takes it back when dropped, or
    /// `None` if the move is illegal.
    pub fn apply(&mut self, mv: Move) -> Option<MoveGuard<'_>> {
        let snapshot = self.snapshot();
        if !self.apply_unguarded(mv) {
            return None;
        }
        Some(MoveGuard {
            board: self,
            snapshot,
            committed: false,
        })
    }

    /// Passes the turn: flips the side to move and clears en passant.
    pub fn apply_null(&mut self) -> MoveGuard<'_> {
        let snapshot = self.snapshot();

        if let Some(ep_sq) = self.ep_square.take() {
            self.hash ^= ZOBRIST.en_passant(ep_sq);
        }
        self.side_to_move = self.side_to_move.flip();
        self.hash ^= ZOBRIST.side();

        MoveGuard {
            board: self,
            snapshot,
            committed: false,
        }
    }
}

/// Scoped move application. The board is restored to its pre-move state
/// when the guard is dropped, unless the move was committed.
pub struct MoveGuard<'a> {
    board: &'a mut BoardState,
    snapshot: Snapshot,
    committed: bool,
}

impl MoveGuard<'_> {
    /// Keeps the move on the board.
    pub fn commit(mut self) {
        self.committed = true;
    }
}

impl Deref for MoveGuard<'_> {
    type Target = BoardState;

    fn deref(&self) -> &BoardState {
        self.board
    }
}

impl DerefMut for MoveGuard<'_> {
    fn deref_mut(&mut self) -> &mut BoardState {
        self.board
    }
}

impl Drop for MoveGuard<'_> {
    fn drop(&mut self) {
        if !self.committed {
            self.board.restore(self.snapshot);
        }
    }
}

impl fmt::Display for BoardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for rank in (0..8u8).rev() {
            write!(f, "{}  ", rank + 1)?;
            for file in 0..8u8 {
                let ch = self.piece_at(rank * 8 + file).map_or('.', Piece::to_char);
                write!(f, " {}", ch)?;
            }
            writeln!(f)?;
        }
        writeln!(f)?;
        writeln!(f, "    a b c d e f g h")?;
        writeln!(f)?;
        writeln!(f, "Fen: {}", self.to_fen())?;
        write!(f, "Key: {:016X}", self.hash)
    }
}

pub fn parse_square(s: &str) -> EngineResult<Square> {
    let bytes = s.as_bytes();
    if bytes.len() != 2 {
        return Err(EngineError::InvalidSquare(s.to_string()));
    }
    let file = bytes[0].wrapping_sub(b'a');
    let rank = bytes[1].wrapping_sub(b'1');
    if file > 7 || rank > 7 {
        return Err(EngineError::InvalidSquare(s.to_string()));
    }
    Ok(rank * 8 + file)
}
