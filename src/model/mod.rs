//! Cache data model: store rows, in-memory metadata, lookup keys and filters.

mod filter;
mod group;
mod release;

pub use filter::*;
pub use group::*;
pub use release::*;
