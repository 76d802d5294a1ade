use once_cell::sync::Lazy;
use rand::{SeedableRng, rngs::StdRng};

use crate::moves::magic::attacks::{
    bishop_attacks_slow, bishop_mask, blocker_subsets, rook_attacks_slow, rook_mask,
};
use crate::moves::magic::search::find_magic;
use crate::square::Square;

/// Per-rank RNG seeds for the magic search. Fixed so that every build finds
/// the same magics and the tables are identical across runs and platforms.
const MAGIC_SEEDS: [u64; 8] = [4022, 11901, 26748, 33297, 40156, 52506, 61363, 7029];

/// One square's perfect-hash entry: `table[(occ & mask) * magic >> shift]`.
pub struct MagicEntry {
    pub magic: u64,
    pub shift: u32,
    pub mask: u64,
    pub table: Box<[u64]>,
}

impl MagicEntry {
    #[inline(always)]
    pub fn attacks(&self, occupancy: u64) -> u64 {
        let index = ((occupancy & self.mask).wrapping_mul(self.magic) >> self.shift) as usize;
        self.table[index]
    }
}

pub struct MagicTables {
    rook: Vec<MagicEntry>,
    bishop: Vec<MagicEntry>,
}

impl MagicTables {
    #[inline(always)]
    pub fn rook_attacks(&self, sq: Square, occupancy: u64) -> u64 {
        self.rook[sq.index() as usize].attacks(occupancy)
    }

    #[inline(always)]
    pub fn bishop_attacks(&self, sq: Square, occupancy: u64) -> u64 {
        self.bishop[sq.index() as usize].attacks(occupancy)
    }

    #[inline(always)]
    pub fn queen_attacks(&self, sq: Square, occupancy: u64) -> u64 {
        self.rook_attacks(sq, occupancy) | self.bishop_attacks(sq, occupancy)
    }
}

fn build_entries(mask_of: fn(usize) -> u64, attacks_of: fn(usize, u64) -> u64) -> Vec<MagicEntry> {
    let mut entries = Vec::with_capacity(64);
    for rank in 0..8 {
        let mut rng = StdRng::seed_from_u64(MAGIC_SEEDS[rank]);
        for file in 0..8 {
            let square = rank * 8 + file;
            let mask = mask_of(square);
            let blockers = blocker_subsets(mask);
            let attacks: Vec<u64> = blockers.iter().map(|&b| attacks_of(square, b)).collect();
            let shift = 64 - mask.count_ones();
            let (magic, table) = find_magic(&blockers, &attacks, shift, &mut rng);
            entries.push(MagicEntry {
                magic,
                shift,
                mask,
                table,
            });
        }
    }
    entries
}

/// Global slider tables, built once on first use.
pub fn magics() -> &'static MagicTables {
    static TABLES: Lazy<MagicTables> = Lazy::new(|| MagicTables {
        rook: build_entries(rook_mask, rook_attacks_slow),
        bishop: build_entries(bishop_mask, bishop_attacks_slow),
    });
    &TABLES
}
