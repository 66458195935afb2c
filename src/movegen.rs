use crate::bitboard::*;
use crate::board::{
    parse_square, BoardState, Color, Piece, PieceKind, BLACK_KINGSIDE, BLACK_QUEENSIDE, BOTH, WHITE_KINGSIDE,
    WHITE_QUEENSIDE,
};
use crate::error::{EngineError, EngineResult};
use std::fmt;

// Move flags
pub const QUIET: u8 = 0;
pub const CAPTURE: u8 = 1;
pub const DOUBLE_PUSH: u8 = 2;
pub const EN_PASSANT: u8 = 4;
pub const CASTLE: u8 = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Move {
    pub from: Square,
    pub to: Square,
    pub piece: Piece,
    pub promotion: Option<Piece>,
    pub flags: u8,
}

pub type MoveList = Vec<Move>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveKind {
    All,
    Captures,
}

const PROMOTION_ORDER: [PieceKind; 4] = [
    PieceKind::Queen,
    PieceKind::Rook,
    PieceKind::Bishop,
    PieceKind::Knight,
];

impl Move {
    pub fn new(from: Square, to: Square, piece: Piece, flags: u8) -> Self {
        Move {
            from,
            to,
            piece,
            promotion: None,
            flags,
        }
    }

    pub fn promoting(from: Square, to: Square, piece: Piece, promotion: Piece, flags: u8) -> Self {
        Move {
            from,
            to,
            piece,
            promotion: Some(promotion),
            flags,
        }
    }

    #[inline(always)]
    pub fn is_capture(&self) -> bool {
        self.flags & CAPTURE != 0
    }

    #[inline(always)]
    pub fn is_double_push(&self) -> bool {
        self.flags & DOUBLE_PUSH != 0
    }

    #[inline(always)]
    pub fn is_en_passant(&self) -> bool {
        self.flags & EN_PASSANT != 0
    }

    #[inline(always)]
    pub fn is_castle(&self) -> bool {
        self.flags & CASTLE != 0
    }

    #[inline(always)]
    pub fn is_promotion(&self) -> bool {
        self.promotion.is_some()
    }

    pub fn to_uci(&self) -> String {
        let mut s = format!("{}{}", square_name(self.from), square_name(self.to));
        if let Some(promo) = self.promotion {
            s.push(promo.kind().to_char());
        }
        s
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_uci())
    }
}

pub struct MoveGenerator;

impl MoveGenerator {
    /// Pseudo-legal moves in piece order: pawns, knights, bishops, rooks,
    /// queens, king (castling last). Legality is settled by `BoardState::apply`.
    pub fn generate(board: &BoardState, kind: MoveKind) -> MoveList {
        let mut moves = Vec::with_capacity(64);
        let color = board.side_to_move;

        Self::generate_pawn_moves(board, color, kind, &mut moves);
        for piece_kind in [PieceKind::Knight, PieceKind::Bishop, PieceKind::Rook, PieceKind::Queen, PieceKind::King] {
            Self::generate_piece_moves(board, color, piece_kind, kind, &mut moves);
        }
        if kind == MoveKind::All {
            Self::generate_castling_moves(board, color, &mut moves);
        }

        moves
    }

    /// Fully legal moves, filtered by applying each one on a scratch copy.
    pub fn generate_legal(board: &BoardState) -> MoveList {
        let mut scratch = *board;
        Self::generate(board, MoveKind::All)
            .into_iter()
            .filter(|&mv| scratch.apply(mv).is_some())
            .collect()
    }

    fn generate_pawn_moves(board: &BoardState, color: Color, kind: MoveKind, moves: &mut MoveList) {
        let piece = Piece::new(PieceKind::Pawn, color);
        let tables = &ATTACK_TABLES;
        let enemy = board.occupancy[color.flip().index()];
        let empty = !board.occupancy[BOTH];
        let (start_rank, promo_from_rank) = match color {
            Color::White => (1, 6),
            Color::Black => (6, 1),
        };

        let mut pawns = board.pieces[piece.index()];
        while pawns != 0 {
            let from = pop_lsb(&mut pawns);
            let promotes = rank_of(from) == promo_from_rank;

            // Pushes
            if kind == MoveKind::All {
                let to = match color {
                    Color::White => from + 8,
                    Color::Black => from - 8,
                };
                if get_bit(empty, to) {
                    if promotes {
                        Self::push_promotions(from, to, color, QUIET, moves);
                    } else {
                        moves.push(Move::new(from, to, piece, QUIET));

                        if rank_of(from) == start_rank {
                            let to2 = match color {
                                Color::White => from + 16,
                                Color::Black => from - 16,
                            };
                            if get_bit(empty, to2) {
                                moves.push(Move::new(from, to2, piece, DOUBLE_PUSH));
                            }
                        }
                    }
                }
            }

            // Captures
            let attacks = tables.pawn_attacks[color.index()][from as usize];
            let mut targets = attacks & enemy;
            while targets != 0 {
                let to = pop_lsb(&mut targets);
                if promotes {
                    Self::push_promotions(from, to, color, CAPTURE, moves);
                } else {
                    moves.push(Move::new(from, to, piece, CAPTURE));
                }
            }

            if let Some(ep_sq) = board.ep_square {
                if get_bit(attacks, ep_sq) {
                    moves.push(Move::new(from, ep_sq, piece, CAPTURE | EN_PASSANT));
                }
            }
        }
    }

    fn push_promotions(from: Square, to: Square, color: Color, flags: u8, moves: &mut MoveList) {
        let pawn = Piece::new(PieceKind::Pawn, color);
        for promo in PROMOTION_ORDER {
            moves.push(Move::promoting(from, to, pawn, Piece::new(promo, color), flags));
        }
    }

    fn generate_piece_moves(
        board: &BoardState,
        color: Color,
        piece_kind: PieceKind,
        kind: MoveKind,
        moves: &mut MoveList,
    ) {
        let piece = Piece::new(piece_kind, color);
        let tables = &ATTACK_TABLES;
        let occ = board.occupancy[BOTH];
        let enemy = board.occupancy[color.flip().index()];
        let allowed = match kind {
            MoveKind::All => !board.occupancy[color.index()],
            MoveKind::Captures => enemy,
        };

        let mut pieces = board.pieces[piece.index()];
        while pieces != 0 {
            let from = pop_lsb(&mut pieces);
            let attacks = match piece_kind {
                PieceKind::Knight => tables.knight_attacks[from as usize],
                PieceKind::Bishop => tables.get_bishop_attacks(from, occ),
                PieceKind::Rook => tables.get_rook_attacks(from, occ),
                PieceKind::Queen => tables.get_queen_attacks(from, occ),
                PieceKind::King => tables.king_attacks[from as usize],
                PieceKind::Pawn => EMPTY,
            };

            let mut targets = attacks & allowed;
            while targets != 0 {
                let to = pop_lsb(&mut targets);
                let flag = if get_bit(enemy, to) { CAPTURE } else { QUIET };
                moves.push(Move::new(from, to, piece, flag));
            }
        }
    }

    fn generate_castling_moves(board: &BoardState, color: Color, moves: &mut MoveList) {
        let king = Piece::new(PieceKind::King, color);
        let them = color.flip();
        let occ = board.occupancy[BOTH];

        for rule in &CASTLING_RULES[color.index()] {
            if board.castling_rights & rule.right == 0 {
                continue;
            }
            if rule.between.iter().any(|&sq| get_bit(occ, sq)) {
                continue;
            }
            if rule.king_path.iter().any(|&sq| board.is_square_attacked(sq, them)) {
                continue;
            }
            moves.push(Move::new(rule.king_path[0], rule.king_path[2], king, CASTLE));
        }
    }
}

struct CastlingRule {
    right: u8,
    /// Squares between king and rook
    between: &'static [Square],
    /// King start, pass-through and destination
    king_path: [Square; 3],
}

const CASTLING_RULES: [[CastlingRule; 2]; 2] = [
    [
        CastlingRule { right: WHITE_KINGSIDE, between: &[5, 6], king_path: [4, 5, 6] },
        CastlingRule { right: WHITE_QUEENSIDE, between: &[3, 2, 1], king_path: [4, 3, 2] },
    ],
    [
        CastlingRule { right: BLACK_KINGSIDE, between: &[61, 62], king_path: [60, 61, 62] },
        CastlingRule { right: BLACK_QUEENSIDE, between: &[59, 58, 57], king_path: [60, 59, 58] },
    ],
];

/// Resolves a coordinate move string ("e2e4", "e7e8q") against the moves
/// generated for `board`. Returns `None` for malformed or unavailable moves.
pub fn parse_move(board: &BoardState, s: &str) -> Option<Move> {
    if !s.is_ascii() || !(4..=5).contains(&s.len()) {
        return None;
    }

    let from = parse_square(&s[0..2]).ok()?;
    let to = parse_square(&s[2..4]).ok()?;
    let promotion = match s.as_bytes().get(4) {
        None => None,
        Some(&ch) => match PieceKind::from_char(ch as char)? {
            PieceKind::Pawn | PieceKind::King => return None,
            kind => Some(kind),
        },
    };

    MoveGenerator::generate(board, MoveKind::All)
        .into_iter()
        .find(|mv| mv.from == from && mv.to == to && mv.promotion.map(Piece::kind) == promotion)
}

/// Parses `s` and plays it on `board` for good.
pub fn play_move(board: &mut BoardState, s: &str) -> EngineResult<Move> {
    let illegal = || EngineError::InvalidMove(s.to_string());
    let mv = parse_move(board, s).ok_or_else(illegal)?;
    if !board.apply_unguarded(mv) {
        return Err(illegal());
    }
    Ok(mv)
}

#[cfg(test)]
mod tests {
    use super::*;

    const KIWIPETE: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1";

    #[test]
    fn test_startpos_moves() {
        let board = BoardState::startpos();
        let moves = MoveGenerator::generate(&board, MoveKind::All);
        assert_eq!(moves.len(), 20);
        assert!(MoveGenerator::generate(&board, MoveKind::Captures).is_empty());
        // Pawns come first
        assert_eq!(moves[0].piece, Piece::WhitePawn);
        assert_eq!(moves.last().unwrap().piece, Piece::WhiteKnight);
    }

    #[test]
    fn test_kiwipete_captures_and_castles() {
        let board = BoardState::from_fen(KIWIPETE).unwrap();
        let legal = MoveGenerator::generate_legal(&board);
        assert_eq!(legal.len(), 48);
        assert_eq!(legal.iter().filter(|m| m.is_capture()).count(), 8);
        assert_eq!(legal.iter().filter(|m| m.is_castle()).count(), 2);

        let captures = MoveGenerator::generate(&board, MoveKind::Captures);
        assert!(captures.iter().all(|m| m.is_capture()));
        assert_eq!(captures.len(), 8);
    }

    #[test]
    fn test_castling_blocked_by_attack() {
        // Black rook on f8 covers f1, so only queenside castling is possible.
        let board = BoardState::from_fen("5r1k/8/8/8/8/8/8/R3K2R w KQ - 0 1").unwrap();
        let castles: Vec<String> = MoveGenerator::generate(&board, MoveKind::All)
            .into_iter()
            .filter(|m| m.is_castle())
            .map(|m| m.to_uci())
            .collect();
        assert_eq!(castles, vec!["e1c1"]);
    }

    #[test]
    fn test_queenside_needs_b_file_empty() {
        let board = BoardState::from_fen("4k3/8/8/8/8/8/8/RN2K3 w Q - 0 1").unwrap();
        assert!(!MoveGenerator::generate(&board, MoveKind::All).iter().any(|m| m.is_castle()));
    }

    #[test]
    fn test_promotions_in_order() {
        let board = BoardState::from_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();
        let promos: Vec<String> = MoveGenerator::generate(&board, MoveKind::All)
            .into_iter()
            .filter(|m| m.is_promotion())
            .map(|m| m.to_uci())
            .collect();
        assert_eq!(promos, vec!["a7a8q", "a7a8r", "a7a8b", "a7a8n"]);
        // Quiet promotions are not captures.
        let board = BoardState::from_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();
        assert!(MoveGenerator::generate(&board, MoveKind::Captures).is_empty());
    }

    #[test]
    fn test_promotion_position_count() {
        let board = BoardState::from_fen("n1n5/PPPk4/8/8/8/8/4Kppp/5N1N b - - 0 1").unwrap();
        assert_eq!(MoveGenerator::generate_legal(&board).len(), 24);
    }

    #[test]
    fn test_en_passant_generated() {
        let board =
            BoardState::from_fen("rnbqkbnr/ppp1p1pp/8/3pPp2/8/8/PPPP1PPP/RNBQKBNR w KQkq f6 0 3").unwrap();
        let ep: Vec<Move> = MoveGenerator::generate(&board, MoveKind::Captures)
            .into_iter()
            .filter(|m| m.is_en_passant())
            .collect();
        assert_eq!(ep.len(), 1);
        assert_eq!(ep[0].to_uci(), "e5f6");
    }

    #[test]
    fn test_parse_move() {
        let board = BoardState::startpos();
        let mv = parse_move(&board, "e2e4").unwrap();
        assert_eq!((mv.from, mv.to), (12, 28));
        assert!(mv.is_double_push());

        assert!(parse_move(&board, "e2e5").is_none());
        assert!(parse_move(&board, "e2").is_none());
        assert!(parse_move(&board, "z2e4").is_none());
        assert!(parse_move(&board, "e2e4x").is_none());
        assert!(parse_move(&board, "é2e4").is_none());

        let board = BoardState::from_fen("8/P6k/8/8/8/8/8/K7 w - - 0 1").unwrap();
        assert_eq!(parse_move(&board, "a7a8n").unwrap().promotion, Some(Piece::WhiteKnight));
        assert!(parse_move(&board, "a7a8").is_none());
        assert!(parse_move(&board, "a7a8k").is_none());
    }

    #[test]
    fn test_play_move() {
        let mut board = BoardState::startpos();
        let mv = play_move(&mut board, "g1f3").unwrap();
        assert_eq!(mv.piece, Piece::WhiteKnight);
        assert_eq!(board.side_to_move, Color::Black);

        let before = board;
        assert!(matches!(play_move(&mut board, "g1f3"), Err(EngineError::InvalidMove(_))));
        assert_eq!(board, before);

        // Pseudo-legal but exposes the king.
        let mut pinned = BoardState::from_fen("4r1k1/8/8/8/8/8/4N3/4K3 w - - 0 1").unwrap();
        assert!(matches!(play_move(&mut pinned, "e2c3"), Err(EngineError::InvalidMove(m)) if m == "e2c3"));
    }

    #[test]
    fn test_move_display() {
        let mv = Move::promoting(52, 60, Piece::WhitePawn, Piece::WhiteQueen, QUIET);
        assert_eq!(mv.to_string(), "e7e8q");
        assert_eq!(Move::new(12, 28, Piece::WhitePawn, DOUBLE_PUSH).to_string(), "e2e4");
    }
}
