//! Built-in elemental operations.

mod filter;
mod insert;
mod map;
mod sort;

pub use filter::Filter;
pub use insert::Insert;
pub use map::Map;
pub use sort::Sort;
