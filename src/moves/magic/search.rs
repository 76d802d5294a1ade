use rand::RngCore;

/// Sparse 64-bit candidate: AND of three draws keeps the popcount low, which
/// is what makes the multiply-shift hash spread blocker bits apart.
#[inline(always)]
pub fn random_sparse_u64<R: RngCore>(rng: &mut R) -> u64 {
    rng.next_u64() & rng.next_u64() & rng.next_u64()
}

/// Try to build the attack table for one magic candidate. Returns `None` as
/// soon as two blocker subsets with different attack sets collide on an index.
pub fn try_build_table(
    blockers: &[u64],
    attacks: &[u64],
    magic: u64,
    shift: u32,
) -> Option<Box<[u64]>> {
    const UNSET: u64 = u64::MAX;
    let mut table = vec![UNSET; 1 << (64 - shift)].into_boxed_slice();

    for (&blocker, &attack) in blockers.iter().zip(attacks) {
        let index = (blocker.wrapping_mul(magic) >> shift) as usize;
        if table[index] == UNSET {
            table[index] = attack;
        } else if table[index] != attack {
            return None;
        }
    }
    // unreachable slots exist for non-tight magics; map them to the empty set
    for slot in table.iter_mut() {
        if *slot == UNSET {
            *slot = 0;
        }
    }
    Some(table)
}

/// Search for a magic number whose multiply-shift perfectly hashes every
/// blocker subset of one square. Deterministic given the caller's seeded RNG.
pub fn find_magic<R: RngCore>(
    blockers: &[u64],
    attacks: &[u64],
    shift: u32,
    rng: &mut R,
) -> (u64, Box<[u64]>) {
    for _ in 0..100_000_000u64 {
        let magic = random_sparse_u64(rng);
        // weed out candidates that cannot spread the high bits
        if (blockers.last().copied().unwrap_or(0).wrapping_mul(magic) & 0xFF00_0000_0000_0000)
            .count_ones()
            < 6
        {
            continue;
        }
        if let Some(table) = try_build_table(blockers, attacks, magic, shift) {
            return (magic, table);
        }
    }
    // with a sane seed table the search succeeds within a few thousand tries
    unreachable!("magic search exhausted its attempt budget")
}
