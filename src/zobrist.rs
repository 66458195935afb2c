use crate::bitboard::{file_of, pop_lsb};
use crate::board::{BoardState, Color, Piece};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub const DEFAULT_SEED: u64 = 42;

pub struct Zobrist {
    pub piece_keys: [[u64; 64]; 12], // [piece][square]
    pub castle_keys: [u64; 16],      // one per castling-rights value
    pub ep_keys: [u64; 8],           // en passant file
    pub side_key: u64,               // xored in when black is to move
}

impl Zobrist {
    pub fn new() -> Self {
        Self::with_seed(DEFAULT_SEED)
    }

    pub fn with_seed(seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);

        let mut piece_keys = [[0u64; 64]; 12];
        for piece in piece_keys.iter_mut() {
            for key in piece.iter_mut() {
                *key = rng.gen();
            }
        }

        let mut castle_keys = [0u64; 16];
        for key in castle_keys.iter_mut() {
            *key = rng.gen();
        }

        let mut ep_keys = [0u64; 8];
        for key in ep_keys.iter_mut() {
            *key = rng.gen();
        }

        let side_key = rng.gen();

        Zobrist {
            piece_keys,
            castle_keys,
            ep_keys,
            side_key,
        }
    }

    #[inline(always)]
    pub fn piece(&self, piece: Piece, square: u8) -> u64 {
        self.piece_keys[piece.index()][square as usize]
    }

    #[inline(always)]
    pub fn castling(&self, rights: u8) -> u64 {
        self.castle_keys[rights as usize]
    }

    #[inline(always)]
    pub fn en_passant(&self, square: u8) -> u64 {
        self.ep_keys[file_of(square) as usize]
    }

    #[inline(always)]
    pub fn side(&self) -> u64 {
        self.side_key
    }

    /// Full recomputation of the fingerprint for `board`.
    pub fn hash(&self, board: &BoardState) -> u64 {
        let mut hash = 0u64;

        for piece in Piece::ALL {
            let mut bb = board.pieces[piece.index()];
            while bb != 0 {
                let sq = pop_lsb(&mut bb);
                hash ^= self.piece(piece, sq);
            }
        }

        if let Some(ep_sq) = board.ep_square {
            hash ^= self.en_passant(ep_sq);
        }

        hash ^= self.castling(board.castling_rights);

        if board.side_to_move == Color::Black {
            hash ^= self.side_key;
        }

        hash
    }
}

impl Default for Zobrist {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static::lazy_static! {
    pub static ref ZOBRIST: Zobrist = Zobrist::new();
}
