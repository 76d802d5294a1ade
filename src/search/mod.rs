pub mod eval;
pub mod ordering;
pub mod pesto;
#[allow(clippy::module_inception)]
pub mod search;
pub mod time;
pub mod tt;

pub const INF: i32 = 32_000;
/// Mate scores are `MATE - ply`; the band above `MATE_BOUND` is reserved for
/// them so the search can recognize and shorten mates.
pub const MATE: i32 = 31_000;
pub const MAX_PLY: usize = 128;
pub const MATE_BOUND: i32 = MATE - MAX_PLY as i32;
pub const DRAW: i32 = 0;
