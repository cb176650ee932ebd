//! Incremental in-process mirror of a configuration center's releases and
//! groups, as consumed by protocol adapters and watch delivery.

mod cache;
mod config;
mod constants;
mod errors;
mod manager;
mod metrics;
mod model;
mod storage;
mod store;
pub mod utils;

pub use cache::*;
pub use config::*;
pub use constants::GROUP_CACHE_NAME;
pub use constants::RELEASE_CACHE_NAME;
pub use errors::*;
pub use manager::*;
pub use metrics::*;
pub use model::*;
pub use storage::*;
pub use store::*;

//-----------------------------------------------------------
// Test utils

#[cfg(test)]
pub mod test_utils;
