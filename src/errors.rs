//! Error types shared by the storefront, catalog, store, and pipeline layers.

use thiserror::Error;

/// Failure of a remote storefront or catalog call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Catalog unavailable: {0}")]
    CatalogUnavailable(String),

    #[error("Gave up after {attempts} attempts: {last_error}")]
    FetchExhausted { attempts: u32, last_error: String },

    #[error("Run deadline exceeded")]
    DeadlineExceeded,
}

/// Failure of the local game store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Game store unavailable: {0}")]
    Unavailable(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Unavailable(format!("record encoding failed: {err}"))
    }
}

/// Startup configuration failure.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required config key: {0}")]
    MissingKey(&'static str),

    #[error("Config file could not be read: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config file could not be parsed: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Default config written to {0}; fill in the credentials and restart")]
    CreatedDefault(String),
}

/// Errors that abort a whole reconciliation run.
#[derive(Error, Debug)]
pub enum ReconciliationError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Fetching owned games failed: {0}")]
    OwnedItems(FetchError),
}
