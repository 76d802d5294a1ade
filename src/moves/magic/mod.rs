pub mod attacks;
mod search;
mod structs;

pub use structs::{MagicEntry, MagicTables, magics};
