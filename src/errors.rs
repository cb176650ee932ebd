//! Config Cache Error Hierarchy
//!
//! Errors are grouped by the layer that produced them: the external store
//! feeding deltas, the local content store, and configuration loading.
//! "Not found" is never an error in this crate; lookups return `Option`.

use std::path::PathBuf;

use config::ConfigError;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The backing store could not deliver a delta batch
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Local content store failures
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Configuration source parsing failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration validation failures
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    /// A refresh this caller joined failed in another caller's hands
    #[error("Shared refresh failed: {0}")]
    SharedRefresh(String),
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Store answered with an error
    #[error("Store error: {0}")]
    Store(String),

    /// Store could not be reached
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Error occurred at path: {path}")]
    PathError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Serialization failures for persisted content records
    #[error(transparent)]
    BincodeError(#[from] bincode::Error),

    /// Embedded database errors
    #[error(transparent)]
    SledError(#[from] sled::Error),

    /// Content persistence failure for one active slot
    #[error("Content operation `{op}` failed for {owner}#{slot}")]
    Content {
        op: &'static str,
        owner: String,
        slot: String,
        #[source]
        source: Box<StorageError>,
    },
}

impl StorageError {
    pub(crate) fn content(
        op: &'static str,
        owner: &str,
        slot: &str,
        source: StorageError,
    ) -> Self {
        StorageError::Content {
            op,
            owner: owner.to_string(),
            slot: slot.to_string(),
            source: Box::new(source),
        }
    }
}

impl From<sled::Error> for Error {
    fn from(e: sled::Error) -> Self {
        Error::Storage(StorageError::SledError(e))
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Storage(StorageError::BincodeError(e))
    }
}
