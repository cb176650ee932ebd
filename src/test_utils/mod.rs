//! Shared helpers for unit tests and the integration tests under `tests/`.
mod common;
mod fake_store;
mod row_builder;

pub use common::*;
pub use fake_store::*;
pub use row_builder::*;
