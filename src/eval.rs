use crate::bitboard::*;
use crate::board::{BoardState, Color, PieceKind, BOTH, PIECE_VALUES};

/// Static evaluation seen from the side to move. The search treats it as opaque.
pub trait Evaluate {
    fn evaluate(&self, board: &BoardState) -> i32;
}

impl<F> Evaluate for F
where
    F: Fn(&BoardState) -> i32,
{
    fn evaluate(&self, board: &BoardState) -> i32 {
        self(board)
    }
}

// Evaluation weights
const BISHOP_PAIR_BONUS: i32 = 40;
const ROOK_OPEN_FILE_BONUS: i32 = 25;
const ROOK_SEMI_OPEN_FILE_BONUS: i32 = 10;
const DOUBLED_PAWN_PENALTY: i32 = 15;
const ISOLATED_PAWN_PENALTY: i32 = 20;
const BISHOP_MOBILITY: i32 = 3;
const ROOK_MOBILITY: i32 = 2;
const QUEEN_MOBILITY: i32 = 1;
const SHIELD_NEAR_BONUS: i32 = 15;
const SHIELD_FAR_BONUS: i32 = 10;

const PASSED_PAWN_BONUS: [i32; 8] = [0, 10, 20, 35, 60, 100, 170, 0];

const MAX_PHASE: i32 = 24;
const PHASE_WEIGHTS: [i32; 6] = [0, 1, 1, 2, 4, 0];

// Piece-square tables from white's point of view, a1 first.
#[rustfmt::skip]
const PAWN_PST_MG: [i32; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
     5, 10, 10,-20,-20, 10, 10,  5,
     5, -5,-10,  0,  0,-10, -5,  5,
     0,  0,  0, 20, 20,  0,  0,  0,
     5,  5, 10, 25, 25, 10,  5,  5,
    10, 10, 20, 30, 30, 20, 10, 10,
    50, 50, 50, 50, 50, 50, 50, 50,
     0,  0,  0,  0,  0,  0,  0,  0,
];

#[rustfmt::skip]
const PAWN_PST_EG: [i32; 64] = [
     0,  0,  0,  0,  0,  0,  0,  0,
    10, 10, 10, 10, 10, 10, 10, 10,
    15, 15, 15, 15, 15, 15, 15, 15,
    25, 25, 25, 25, 25, 25, 25, 25,
    40, 40, 40, 40, 40, 40, 40, 40,
    65, 65, 65, 65, 65, 65, 65, 65,
   100,100,100,100,100,100,100,100,
     0,  0,  0,  0,  0,  0,  0,  0,
];

#[rustfmt::skip]
const KNIGHT_PST: [i32; 64] = [
   -50,-40,-30,-30,-30,-30,-40,-50,
   -40,-20,  0,  5,  5,  0,-20,-40,
   -30,  5, 10, 15, 15, 10,  5,-30,
   -30,  0, 15, 20, 20, 15,  0,-30,
   -30,  5, 15, 20, 20, 15,  5,-30,
   -30,  0, 10, 15, 15, 10,  0,-30,
   -40,-20,  0,  0,  0,  0,-20,-40,
   -50,-40,-30,-30,-30,-30,-40,-50,
];

#[rustfmt::skip]
const BISHOP_PST: [i32; 64] = [
   -20,-10,-10,-10,-10,-10,-10,-20,
   -10,  5,  0,  0,  0,  0,  5,-10,
   -10, 10, 10, 10, 10, 10, 10,-10,
   -10,  0, 10, 10, 10, 10,  0,-10,
   -10,  5,  5, 10, 10,  5,  5,-10,
   -10,  0,  5, 10, 10,  5,  0,-10,
   -10,  0,  0,  0,  0,  0,  0,-10,
   -20,-10,-10,-10,-10,-10,-10,-20,
];

#[rustfmt::skip]
const ROOK_PST: [i32; 64] = [
     0,  0,  0,  5,  5,  0,  0,  0,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
    -5,  0,  0,  0,  0,  0,  0, -5,
     5, 10, 10, 10, 10, 10, 10,  5,
     0,  0,  0,  0,  0,  0,  0,  0,
];

#[rustfmt::skip]
const QUEEN_PST: [i32; 64] = [
   -20,-10,-10, -5, -5,-10,-10,-20,
   -10,  0,  5,  0,  0,  0,  0,-10,
   -10,  5,  5,  5,  5,  5,  0,-10,
     0,  0,  5,  5,  5,  5,  0, -5,
    -5,  0,  5,  5,  5,  5,  0, -5,
   -10,  0,  5,  5,  5,  5,  0,-10,
   -10,  0,  0,  0,  0,  0,  0,-10,
   -20,-10,-10, -5, -5,-10,-10,-20,
];

#[rustfmt::skip]
const KING_PST_MG: [i32; 64] = [
    20, 30, 10,  0,  0, 10, 30, 20,
    20, 20,  0,  0,  0,  0, 20, 20,
   -10,-20,-20,-20,-20,-20,-20,-10,
   -20,-30,-30,-40,-40,-30,-30,-20,
   -30,-40,-40,-50,-50,-40,-40,-30,
   -30,-40,-40,-50,-50,-40,-40,-30,
   -30,-40,-40,-50,-50,-40,-40,-30,
   -30,-40,-40,-50,-50,-40,-40,-30,
];

#[rustfmt::skip]
const KING_PST_EG: [i32; 64] = [
   -40,-30,-20,-10,-10,-20,-30,-40,
   -30,-20,-10,  0,  0,-10,-20,-30,
   -20,-10, 10, 20, 20, 10,-10,-20,
   -10,  0, 20, 30, 30, 20,  0,-10,
   -10,  0, 20, 30, 30, 20,  0,-10,
   -20,-10, 10, 20, 20, 10,-10,-20,
   -30,-20,-10,  0,  0,-10,-20,-30,
   -40,-30,-20,-10,-10,-20,-30,-40,
];

fn pst(kind: PieceKind) -> (&'static [i32; 64], &'static [i32; 64]) {
    match kind {
        PieceKind::Pawn => (&PAWN_PST_MG, &PAWN_PST_EG),
        PieceKind::Knight => (&KNIGHT_PST, &KNIGHT_PST),
        PieceKind::Bishop => (&BISHOP_PST, &BISHOP_PST),
        PieceKind::Rook => (&ROOK_PST, &ROOK_PST),
        PieceKind::Queen => (&QUEEN_PST, &QUEEN_PST),
        PieceKind::King => (&KING_PST_MG, &KING_PST_EG),
    }
}

/// Mirrors black squares onto white's tables.
#[inline(always)]
fn relative_square(color: Color, sq: Square) -> usize {
    match color {
        Color::White => sq as usize,
        Color::Black => (sq ^ 56) as usize,
    }
}

#[inline(always)]
fn relative_rank(color: Color, sq: Square) -> u8 {
    match color {
        Color::White => rank_of(sq),
        Color::Black => 7 - rank_of(sq),
    }
}

#[inline(always)]
fn file_mask(file: u8) -> Bitboard {
    FILE_A << file
}

fn adjacent_files(file: u8) -> Bitboard {
    let mut mask = EMPTY;
    if file > 0 {
        mask |= file_mask(file - 1);
    }
    if file < 7 {
        mask |= file_mask(file + 1);
    }
    mask
}

/// Squares strictly in front of `sq` from `color`'s side, on its file and both neighbours.
fn front_span(color: Color, sq: Square) -> Bitboard {
    let rank = rank_of(sq) as u32;
    let ahead = match color {
        Color::White if rank < 7 => FULL << (8 * (rank + 1)),
        Color::Black if rank > 0 => FULL >> (8 * (8 - rank)),
        _ => EMPTY,
    };
    ahead & (file_mask(file_of(sq)) | adjacent_files(file_of(sq)))
}

/// Hand-tuned default evaluator: material, tapered piece-square tables,
/// pawn structure, rook files, bishop pair, slider mobility and king shelter.
#[derive(Clone, Copy, Debug, Default)]
pub struct Evaluator;

impl Evaluate for Evaluator {
    fn evaluate(&self, board: &BoardState) -> i32 {
        let phase = Self::game_phase(board);

        let mut mg = 0;
        let mut eg = 0;
        let mut score = 0;
        for (color, sign) in [(Color::White, 1), (Color::Black, -1)] {
            let (side_mg, side_eg) = Self::material_and_pst(board, color);
            mg += sign * side_mg;
            eg += sign * side_eg;

            score += sign * Self::pawn_structure(board, color);
            score += sign * Self::rook_files(board, color);
            score += sign * Self::bishop_pair(board, color);
            score += sign * Self::mobility(board, color);
            score += sign * Self::king_shield(board, color) * phase / MAX_PHASE;
        }

        score += (mg * phase + eg * (MAX_PHASE - phase)) / MAX_PHASE;

        match board.side_to_move {
            Color::White => score,
            Color::Black => -score,
        }
    }
}

impl Evaluator {
    /// 24 with all minor and major pieces on the board, 0 with bare kings and pawns.
    pub fn game_phase(board: &BoardState) -> i32 {
        let phase: i32 = PieceKind::ALL
            .iter()
            .map(|&kind| {
                let count = count_bits(board.bitboard(kind, Color::White))
                    + count_bits(board.bitboard(kind, Color::Black));
                count as i32 * PHASE_WEIGHTS[kind.index()]
            })
            .sum();
        phase.min(MAX_PHASE)
    }

    fn material_and_pst(board: &BoardState, color: Color) -> (i32, i32) {
        let mut mg = 0;
        let mut eg = 0;

        for kind in PieceKind::ALL {
            let (mg_table, eg_table) = pst(kind);
            let mut pieces = board.bitboard(kind, color);
            while pieces != 0 {
                let sq = relative_square(color, pop_lsb(&mut pieces));
                mg += PIECE_VALUES[kind.index()] + mg_table[sq];
                eg += PIECE_VALUES[kind.index()] + eg_table[sq];
            }
        }

        (mg, eg)
    }

    fn pawn_structure(board: &BoardState, color: Color) -> i32 {
        let mut score = 0;
        let own_pawns = board.bitboard(PieceKind::Pawn, color);
        let enemy_pawns = board.bitboard(PieceKind::Pawn, color.flip());

        for file in 0..8 {
            let on_file = count_bits(own_pawns & file_mask(file)) as i32;
            if on_file > 1 {
                score -= DOUBLED_PAWN_PENALTY * (on_file - 1);
            }
            if on_file > 0 && own_pawns & adjacent_files(file) == 0 {
                score -= ISOLATED_PAWN_PENALTY * on_file;
            }
        }

        let mut pawns = own_pawns;
        while pawns != 0 {
            let sq = pop_lsb(&mut pawns);
            if enemy_pawns & front_span(color, sq) == 0 {
                score += PASSED_PAWN_BONUS[relative_rank(color, sq) as usize];
            }
        }

        score
    }

    fn rook_files(board: &BoardState, color: Color) -> i32 {
        let mut score = 0;
        let own_pawns = board.bitboard(PieceKind::Pawn, color);
        let all_pawns = own_pawns | board.bitboard(PieceKind::Pawn, color.flip());

        let mut rooks = board.bitboard(PieceKind::Rook, color);
        while rooks != 0 {
            let file = file_mask(file_of(pop_lsb(&mut rooks)));
            if all_pawns & file == 0 {
                score += ROOK_OPEN_FILE_BONUS;
            } else if own_pawns & file == 0 {
                score += ROOK_SEMI_OPEN_FILE_BONUS;
            }
        }

        score
    }

    fn bishop_pair(board: &BoardState, color: Color) -> i32 {
        if count_bits(board.bitboard(PieceKind::Bishop, color)) >= 2 {
            BISHOP_PAIR_BONUS
        } else {
            0
        }
    }

    fn mobility(board: &BoardState, color: Color) -> i32 {
        let tables = &ATTACK_TABLES;
        let occ = board.occupancy[BOTH];
        let not_own = !board.occupancy[color.index()];
        let mut score = 0;

        let sliders = [
            (PieceKind::Bishop, BISHOP_MOBILITY),
            (PieceKind::Rook, ROOK_MOBILITY),
            (PieceKind::Queen, QUEEN_MOBILITY),
        ];
        for (kind, weight) in sliders {
            let mut pieces = board.bitboard(kind, color);
            while pieces != 0 {
                let sq = pop_lsb(&mut pieces);
                let attacks = match kind {
                    PieceKind::Bishop => tables.get_bishop_attacks(sq, occ),
                    PieceKind::Rook => tables.get_rook_attacks(sq, occ),
                    _ => tables.get_queen_attacks(sq, occ),
                };
                score += count_bits(attacks & not_own) as i32 * weight;
            }
        }

        score
    }

    /// Own pawns on the two ranks in front of the king; scaled by phase by the caller.
    fn king_shield(board: &BoardState, color: Color) -> i32 {
        let Some(king_sq) = board.king_square(color) else {
            return 0;
        };
        let pawns = board.bitboard(PieceKind::Pawn, color);
        let span = front_span(color, king_sq);
        let rank = rank_of(king_sq) as i32;
        let (near, far) = match color {
            Color::White => (rank + 1, rank + 2),
            Color::Black => (rank - 1, rank - 2),
        };

        let mut score = 0;
        let mut shield = pawns & span;
        while shield != 0 {
            let pawn_rank = rank_of(pop_lsb(&mut shield)) as i32;
            if pawn_rank == near {
                score += SHIELD_NEAR_BONUS;
            } else if pawn_rank == far {
                score += SHIELD_FAR_BONUS;
            }
        }

        score
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Flips ranks and swaps colors of a FEN placement + side field.
    fn mirror_fen(fen: &str) -> String {
        let mut fields = fen.split_whitespace();
        let placement: Vec<String> = fields
            .next()
            .unwrap()
            .split('/')
            .rev()
            .map(|rank| {
                rank.chars()
                    .map(|c| if c.is_ascii_uppercase() { c.to_ascii_lowercase() } else { c.to_ascii_uppercase() })
                    .collect()
            })
            .collect();
        let side = if fields.next() == Some("w") { "b" } else { "w" };
        format!("{} {} - - 0 1", placement.join("/"), side)
    }

    #[test]
    fn test_startpos_is_balanced() {
        let board = BoardState::startpos();
        assert_eq!(Evaluator.evaluate(&board), 0);
        assert_eq!(Evaluator::game_phase(&board), 24);
    }

    #[test]
    fn test_color_symmetry() {
        for fen in [
            "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w - - 0 1",
            "8/2p5/3p4/KP5r/1R3p1k/8/4P1P1/8 w - - 0 1",
            "2kr3r/ppq2ppp/2n1bn2/2bp4/8/2NB1N2/PPPQ1PPP/R1B2RK1 b - - 0 1",
        ] {
            let board = BoardState::from_fen(fen).unwrap();
            let mirrored = BoardState::from_fen(&mirror_fen(fen)).unwrap();
            assert_eq!(Evaluator.evaluate(&board), Evaluator.evaluate(&mirrored), "{}", fen);
        }
    }

    #[test]
    fn test_side_to_move_perspective() {
        let white = BoardState::from_fen("4k3/8/8/8/8/8/8/3QK3 w - - 0 1").unwrap();
        let black = BoardState::from_fen("4k3/8/8/8/8/8/8/3QK3 b - - 0 1").unwrap();
        assert!(Evaluator.evaluate(&white) > 800);
        assert_eq!(Evaluator.evaluate(&white), -Evaluator.evaluate(&black));
    }

    #[test]
    fn test_passed_pawn_detection() {
        // White d5 pawn is passed, the h4 pawn faces black's h-pawn.
        let board = BoardState::from_fen("4k3/7p/8/3P4/7P/8/8/4K3 w - - 0 1").unwrap();
        assert_eq!(front_span(Color::White, 35) & board.bitboard(PieceKind::Pawn, Color::Black), 0);
        assert_ne!(front_span(Color::White, 31) & board.bitboard(PieceKind::Pawn, Color::Black), 0);
        assert_eq!(front_span(Color::Black, 8), square_bb(0) | square_bb(1));
        assert_eq!(front_span(Color::White, 63), EMPTY);
    }

    #[test]
    fn test_closure_evaluator() {
        let material_only = |board: &BoardState| count_bits(board.occupancy[board.side_to_move.index()]) as i32;
        assert_eq!(material_only.evaluate(&BoardState::startpos()), 16);
    }
}
