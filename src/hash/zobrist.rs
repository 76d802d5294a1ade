use once_cell::sync::OnceCell;
use rand::{RngCore, SeedableRng, rngs::StdRng};

/// Fixed seed so every build produces identical keys on every platform.
const ZOBRIST_SEED: u64 = 0xB5AD_4ECE_DA1C_E2A9;

pub struct ZobristKeys {
    /// `[color][piece][square]` with {White=0, Black=1} and {P..K}={0..5}.
    pub piece: [[[u64; 64]; 6]; 2],
    /// One key per castling-rights mask value.
    pub castling: [u64; 16],
    /// a..h => 0..7; XORed in only while an en-passant capture is possible.
    pub ep_file: [u64; 8],
    /// XORed in when Black is to move.
    pub side_to_move: u64,
}

/// Global keys, generated once on first use.
pub fn keys() -> &'static ZobristKeys {
    static KEYS: OnceCell<ZobristKeys> = OnceCell::new();
    KEYS.get_or_init(generate_keys)
}

fn generate_keys() -> ZobristKeys {
    let mut rng = StdRng::seed_from_u64(ZOBRIST_SEED);

    // zero keys would make distinct features cancel silently
    let mut non_zero = move || loop {
        let v = rng.next_u64();
        if v != 0 {
            return v;
        }
    };

    let mut keys = ZobristKeys {
        piece: [[[0u64; 64]; 6]; 2],
        castling: [0u64; 16],
        ep_file: [0u64; 8],
        side_to_move: 0,
    };

    for color in 0..2 {
        for piece in 0..6 {
            for sq in 0..64 {
                keys.piece[color][piece][sq] = non_zero();
            }
        }
    }
    // rights mask 0 must not perturb the hash
    for rights in 1..16 {
        keys.castling[rights] = non_zero();
    }
    for file in 0..8 {
        keys.ep_file[file] = non_zero();
    }
    keys.side_to_move = non_zero();

    keys
}
