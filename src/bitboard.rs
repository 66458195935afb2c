pub type Bitboard = u64;
pub type Square = u8;

pub const EMPTY: Bitboard = 0;
pub const FULL: Bitboard = 0xFFFFFFFFFFFFFFFF;

// Files
pub const FILE_A: Bitboard = 0x0101010101010101;
pub const FILE_B: Bitboard = 0x0202020202020202;
pub const FILE_G: Bitboard = 0x4040404040404040;
pub const FILE_H: Bitboard = 0x8080808080808080;

// Ranks
pub const RANK_1: Bitboard = 0x00000000000000FF;
pub const RANK_2: Bitboard = 0x000000000000FF00;
pub const RANK_7: Bitboard = 0x00FF000000000000;
pub const RANK_8: Bitboard = 0xFF00000000000000;

// Wrap-around guards for shifted leaper attacks
pub const NOT_A_FILE: Bitboard = !FILE_A;
pub const NOT_H_FILE: Bitboard = !FILE_H;
pub const NOT_AB_FILE: Bitboard = !(FILE_A | FILE_B);
pub const NOT_GH_FILE: Bitboard = !(FILE_G | FILE_H);

#[inline(always)]
pub fn square_bb(sq: Square) -> Bitboard {
    1u64 << sq
}

#[inline(always)]
pub fn set_bit(bb: Bitboard, sq: Square) -> Bitboard {
    bb | (1u64 << sq)
}

#[inline(always)]
pub fn clear_bit(bb: Bitboard, sq: Square) -> Bitboard {
    bb & !(1u64 << sq)
}

#[inline(always)]
pub fn get_bit(bb: Bitboard, sq: Square) -> bool {
    (bb & (1u64 << sq)) != 0
}

#[inline(always)]
pub fn toggle_bit(bb: Bitboard, sq: Square) -> Bitboard {
    bb ^ (1u64 << sq)
}

#[inline(always)]
pub fn count_bits(bb: Bitboard) -> u32 {
    bb.count_ones()
}

#[inline(always)]
pub fn lsb(bb: Bitboard) -> Option<Square> {
    if bb == 0 {
        None
    } else {
        Some(bb.trailing_zeros() as Square)
    }
}

/// Removes the least significant set bit from `bb` and returns its square.
///
/// Callers loop with `while bb != 0`, so `bb` is never empty here.
#[inline(always)]
pub fn pop_lsb(bb: &mut Bitboard) -> Square {
    debug_assert!(*bb != 0, "pop_lsb on an empty bitboard");
    let sq = bb.trailing_zeros() as Square;
    *bb &= *bb - 1;
    sq
}

#[inline(always)]
pub fn rank_of(sq: Square) -> u8 {
    sq / 8
}

#[inline(always)]
pub fn file_of(sq: Square) -> u8 {
    sq % 8
}

pub fn square_name(sq: Square) -> String {
    let file = (b'a' + file_of(sq)) as char;
    let rank = (b'1' + rank_of(sq)) as char;
    format!("{}{}", file, rank)
}

// Verified collision-free for the relevant-occupancy masks built below.
#[rustfmt::skip]
const ROOK_MAGICS: [u64; 64] = [
    0x8A80104000800020, 0x0140002000100040, 0x02801880A0017001, 0x0100081001000420,
    0x0200020010080420, 0x03001C0002010008, 0x8480008002000100, 0x2080088004402900,
    0x0000800098204000, 0x2024401000200040, 0x0100802000801000, 0x0120800800801000,
    0x0208808088000400, 0x0002802200800400, 0x2200800100020080, 0x0801000060821100,
    0x0080044006422000, 0x0100808020004000, 0x12108A0010204200, 0x0140848010000802,
    0x0481828014002800, 0x8094004002004100, 0x4010040010010802, 0x0000020008806104,
    0x0100400080208000, 0x2040002120081000, 0x0021200680100081, 0x0020100080080080,
    0x0002000A00200410, 0x0000020080800400, 0x0080088400100102, 0x0080004600042881,
    0x4040008040800020, 0x0440003000200801, 0x0004200011004500, 0x0188020010100100,
    0x0014800401802800, 0x2080040080800200, 0x0124080204001001, 0x0200046502000484,
    0x0480400080088020, 0x1000422010034000, 0x0030200100110040, 0x0000100021010009,
    0x2002080100110004, 0x0202008004008002, 0x0020020004010100, 0x2048440040820001,
    0x0101002200408200, 0x0040802000401080, 0x4008142004410100, 0x02060820C0120200,
    0x0001001004080100, 0x020C020080040080, 0x2935610830022400, 0x0044440041009200,
    0x0280001040802101, 0x2100190040002085, 0x80C0084100102001, 0x4024081001000421,
    0x00020030A0244872, 0x0012001008414402, 0x02006104900A0804, 0x0001004081002402,
];

#[rustfmt::skip]
const BISHOP_MAGICS: [u64; 64] = [
    0x0040040844404084, 0x002004208A004208, 0x0010190041080202, 0x0108060845042010,
    0x0581104180800210, 0x2112080446200010, 0x1080820820060210, 0x03C0808410220200,
    0x0004050404440404, 0x0000021001420088, 0x24D0080801082102, 0x0001020A0A020400,
    0x0000040308200402, 0x0004011002100800, 0x0401484104104005, 0x0801010402020200,
    0x00400210C3880100, 0x0404022024108200, 0x0810018200204102, 0x0004002801A02003,
    0x0085040820080400, 0x810102C808880400, 0x000E900410884800, 0x8002020480840102,
    0x0220200865090201, 0x2010100A02021202, 0x0152048408022401, 0x0020080002081110,
    0x4001001021004000, 0x800040400A011002, 0x00E4004081011002, 0x001C004001012080,
    0x8004200962A00220, 0x8422100208500202, 0x2000402200300C08, 0x8646020080080080,
    0x80020A0200100808, 0x2010004880111000, 0x623000A080011400, 0x42008C0340209202,
    0x0209188240001000, 0x400408A884001800, 0x00110400A6080400, 0x1840060A44020800,
    0x0090080104000041, 0x0201011000808101, 0x1A2208080504F080, 0x8012020600211212,
    0x0500861011240000, 0x0180806108200800, 0x4000020E01040044, 0x300000261044000A,
    0x0802241102020002, 0x0020906061210001, 0x5A84841004010310, 0x0004010801011C04,
    0x000A010109502200, 0x0000004A02012000, 0x500201010098B028, 0x8040002811040900,
    0x0028000010020204, 0x06000020202D0240, 0x8918844842082200, 0x4010011029020020,
];

const ROOK_DIRECTIONS: [(i8, i8); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];
const BISHOP_DIRECTIONS: [(i8, i8); 4] = [(1, 1), (-1, 1), (1, -1), (-1, -1)];

/// Perfect-hash parameters for one slider on one square.
#[derive(Clone, Copy, Debug, Default)]
pub struct MagicEntry {
    pub mask: Bitboard,
    pub magic: u64,
    pub shift: u8,
    pub offset: usize,
}

impl MagicEntry {
    #[inline(always)]
    pub fn index(&self, occ: Bitboard) -> usize {
        self.offset + ((occ & self.mask).wrapping_mul(self.magic) >> self.shift) as usize
    }

    pub fn relevant_bits(&self) -> u32 {
        count_bits(self.mask)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slider {
    Bishop,
    Rook,
}

impl Slider {
    fn directions(self) -> &'static [(i8, i8); 4] {
        match self {
            Slider::Bishop => &BISHOP_DIRECTIONS,
            Slider::Rook => &ROOK_DIRECTIONS,
        }
    }

    fn magic(self, sq: Square) -> u64 {
        match self {
            Slider::Bishop => BISHOP_MAGICS[sq as usize],
            Slider::Rook => ROOK_MAGICS[sq as usize],
        }
    }
}

pub struct AttackTables {
    pub pawn_attacks: [[Bitboard; 64]; 2],
    pub knight_attacks: [Bitboard; 64],
    pub king_attacks: [Bitboard; 64],
    pub rook_magics: [MagicEntry; 64],
    pub bishop_magics: [MagicEntry; 64],
    rook_table: Vec<Bitboard>,
    bishop_table: Vec<Bitboard>,
}

impl AttackTables {
    pub fn new() -> Self {
        let mut tables = AttackTables {
            pawn_attacks: [[0; 64]; 2],
            knight_attacks: [0; 64],
            king_attacks: [0; 64],
            rook_magics: [MagicEntry::default(); 64],
            bishop_magics: [MagicEntry::default(); 64],
            rook_table: Vec::new(),
            bishop_table: Vec::new(),
        };

        tables.init_leapers();
        tables.init_sliders(Slider::Bishop);
        tables.init_sliders(Slider::Rook);

        tables
    }

    fn init_leapers(&mut self) {
        for sq in 0..64u8 {
            self.pawn_attacks[0][sq as usize] = mask_pawn_attacks(0, sq);
            self.pawn_attacks[1][sq as usize] = mask_pawn_attacks(1, sq);
            self.knight_attacks[sq as usize] = mask_knight_attacks(sq);
            self.king_attacks[sq as usize] = mask_king_attacks(sq);
        }
    }

    fn init_sliders(&mut self, slider: Slider) {
        let mut table = Vec::new();
        let mut magics = [MagicEntry::default(); 64];

        for sq in 0..64u8 {
            let mask = relevant_occupancy_mask(slider, sq);
            let bits = count_bits(mask);
            let entry = MagicEntry {
                mask,
                magic: slider.magic(sq),
                shift: (64 - bits) as u8,
                offset: table.len(),
            };
            table.resize(entry.offset + (1usize << bits), EMPTY);

            for index in 0..(1usize << bits) {
                let occupancy = occupancy_subset(index, mask);
                let attacks = slider_attacks_slow(slider, sq, occupancy);
                let slot = &mut table[entry.index(occupancy)];
                // Slider attack sets are never empty, so zero marks a free slot.
                debug_assert!(
                    *slot == EMPTY || *slot == attacks,
                    "magic collision for {:?} on {}",
                    slider,
                    square_name(sq)
                );
                *slot = attacks;
            }

            magics[sq as usize] = entry;
        }

        match slider {
            Slider::Bishop => {
                self.bishop_magics = magics;
                self.bishop_table = table;
            }
            Slider::Rook => {
                self.rook_magics = magics;
                self.rook_table = table;
            }
        }
    }

    #[inline(always)]
    pub fn get_bishop_attacks(&self, sq: Square, occ: Bitboard) -> Bitboard {
        self.bishop_table[self.bishop_magics[sq as usize].index(occ)]
    }

    #[inline(always)]
    pub fn get_rook_attacks(&self, sq: Square, occ: Bitboard) -> Bitboard {
        self.rook_table[self.rook_magics[sq as usize].index(occ)]
    }

    #[inline(always)]
    pub fn get_queen_attacks(&self, sq: Square, occ: Bitboard) -> Bitboard {
        self.get_rook_attacks(sq, occ) | self.get_bishop_attacks(sq, occ)
    }

    pub fn table_len(&self, slider: Slider) -> usize {
        match slider {
            Slider::Bishop => self.bishop_table.len(),
            Slider::Rook => self.rook_table.len(),
        }
    }
}

impl Default for AttackTables {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static::lazy_static! {
    pub static ref ATTACK_TABLES: AttackTables = AttackTables::new();
}

fn mask_pawn_attacks(side: usize, sq: Square) -> Bitboard {
    let bb = square_bb(sq);
    if side == 0 {
        ((bb << 7) & NOT_H_FILE) | ((bb << 9) & NOT_A_FILE)
    } else {
        ((bb >> 7) & NOT_A_FILE) | ((bb >> 9) & NOT_H_FILE)
    }
}

fn mask_knight_attacks(sq: Square) -> Bitboard {
    let bb = square_bb(sq);
    ((bb << 17) & NOT_A_FILE)
        | ((bb << 15) & NOT_H_FILE)
        | ((bb << 10) & NOT_AB_FILE)
        | ((bb << 6) & NOT_GH_FILE)
        | ((bb >> 17) & NOT_H_FILE)
        | ((bb >> 15) & NOT_A_FILE)
        | ((bb >> 10) & NOT_GH_FILE)
        | ((bb >> 6) & NOT_AB_FILE)
}

fn mask_king_attacks(sq: Square) -> Bitboard {
    let bb = square_bb(sq);
    (bb << 8)
        | (bb >> 8)
        | ((bb << 1) & NOT_A_FILE)
        | ((bb >> 1) & NOT_H_FILE)
        | ((bb << 9) & NOT_A_FILE)
        | ((bb << 7) & NOT_H_FILE)
        | ((bb >> 7) & NOT_A_FILE)
        | ((bb >> 9) & NOT_H_FILE)
}

/// Squares on the slider's rays whose occupancy can change the attack set.
/// The last square of each ray is excluded since it is attacked either way.
pub fn relevant_occupancy_mask(slider: Slider, sq: Square) -> Bitboard {
    let rank = rank_of(sq) as i8;
    let file = file_of(sq) as i8;
    let mut mask = EMPTY;

    for &(dr, df) in slider.directions() {
        let mut r = rank + dr;
        let mut f = file + df;
        loop {
            // Stop one square short of the edge in the direction of travel.
            let next_r = r + dr;
            let next_f = f + df;
            if !(0..8).contains(&r)
                || !(0..8).contains(&f)
                || !(0..8).contains(&next_r)
                || !(0..8).contains(&next_f)
            {
                break;
            }
            mask = set_bit(mask, (r * 8 + f) as Square);
            r = next_r;
            f = next_f;
        }
    }

    mask
}

/// Maps `index` onto a subset of `mask`: bit `i` of `index` selects the
/// `i`-th lowest set bit of the mask.
pub fn occupancy_subset(index: usize, mask: Bitboard) -> Bitboard {
    let mut occupancy = EMPTY;
    let mut remaining = mask;
    let mut count = 0;

    while remaining != 0 {
        let sq = pop_lsb(&mut remaining);
        if index & (1 << count) != 0 {
            occupancy = set_bit(occupancy, sq);
        }
        count += 1;
    }

    occupancy
}

/// Ray-walking reference implementation, used to fill and verify the tables.
pub fn slider_attacks_slow(slider: Slider, sq: Square, occ: Bitboard) -> Bitboard {
    let rank = rank_of(sq) as i8;
    let file = file_of(sq) as i8;
    let mut attacks = EMPTY;

    for &(dr, df) in slider.directions() {
        let mut r = rank + dr;
        let mut f = file + df;

        while (0..8).contains(&r) && (0..8).contains(&f) {
            let target = (r * 8 + f) as Square;
            attacks = set_bit(attacks, target);
            if get_bit(occ, target) {
                break;
            }
            r += dr;
            f += df;
        }
    }

    attacks
}

pub fn bishop_attacks_slow(sq: Square, occ: Bitboard) -> Bitboard {
    slider_attacks_slow(Slider::Bishop, sq, occ)
}

pub fn rook_attacks_slow(sq: Square, occ: Bitboard) -> Bitboard {
    slider_attacks_slow(Slider::Rook, sq, occ)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_magic_lookup_matches_ray_walk() {
        let tables = &ATTACK_TABLES;

        for slider in [Slider::Bishop, Slider::Rook] {
            for sq in 0..64u8 {
                let mask = relevant_occupancy_mask(slider, sq);
                for index in 0..(1usize << count_bits(mask)) {
                    let occ = occupancy_subset(index, mask);
                    let (fast, slow) = match slider {
                        Slider::Bishop => (tables.get_bishop_attacks(sq, occ), bishop_attacks_slow(sq, occ)),
                        Slider::Rook => (tables.get_rook_attacks(sq, occ), rook_attacks_slow(sq, occ)),
                    };
                    assert_eq!(fast, slow, "{:?} on {} with occupancy {:#x}", slider, square_name(sq), occ);
                }
            }
        }
    }

    #[test]
    fn test_lookup_ignores_irrelevant_occupancy() {
        let tables = &ATTACK_TABLES;
        // Edge squares and the slider's own square never change the result.
        let sq = 27; // d4
        let noise = RANK_1 | RANK_8 | FILE_A | FILE_H | square_bb(sq);
        assert_eq!(tables.get_rook_attacks(sq, noise), rook_attacks_slow(sq, noise));
        assert_eq!(tables.get_bishop_attacks(sq, noise), bishop_attacks_slow(sq, noise));
        assert_eq!(
            tables.get_queen_attacks(sq, noise),
            rook_attacks_slow(sq, noise) | bishop_attacks_slow(sq, noise)
        );
    }

    #[test]
    fn test_relevant_bits() {
        // Corner and center counts as documented by the magic-bitboard literature.
        assert_eq!(count_bits(relevant_occupancy_mask(Slider::Rook, 0)), 12);
        assert_eq!(count_bits(relevant_occupancy_mask(Slider::Rook, 27)), 10);
        assert_eq!(count_bits(relevant_occupancy_mask(Slider::Bishop, 0)), 6);
        assert_eq!(count_bits(relevant_occupancy_mask(Slider::Bishop, 27)), 9);
        assert_eq!(ATTACK_TABLES.table_len(Slider::Rook), 102_400);
        assert_eq!(ATTACK_TABLES.table_len(Slider::Bishop), 5_248);
    }

    #[test]
    fn test_leaper_attacks() {
        let tables = &ATTACK_TABLES;
        // Knight on a1 reaches b3 and c2 only.
        assert_eq!(tables.knight_attacks[0], square_bb(17) | square_bb(10));
        // King in the corner has three neighbours.
        assert_eq!(count_bits(tables.king_attacks[63]), 3);
        assert_eq!(count_bits(tables.king_attacks[27]), 8);
        // White pawn on a2 attacks b3, black pawn on h7 attacks g6.
        assert_eq!(tables.pawn_attacks[0][8], square_bb(17));
        assert_eq!(tables.pawn_attacks[1][55], square_bb(46));
        // No pawn attacks off the board.
        assert_eq!(tables.pawn_attacks[0][60], 0);
    }

    #[test]
    fn test_bit_helpers() {
        let mut bb = set_bit(EMPTY, 3) | square_bb(40);
        assert!(get_bit(bb, 3));
        assert_eq!(count_bits(bb), 2);
        assert_eq!(lsb(bb), Some(3));
        assert_eq!(pop_lsb(&mut bb), 3);
        assert_eq!(pop_lsb(&mut bb), 40);
        assert_eq!(bb, EMPTY);
        assert_eq!(lsb(bb), None);
        assert_eq!(toggle_bit(clear_bit(FULL, 0), 0), FULL);
        assert_eq!(square_name(0), "a1");
        assert_eq!(square_name(63), "h8");
    }
}
