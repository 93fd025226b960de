use thiserror::Error;

use crate::storage::StoreError;

#[derive(Error, Debug)]
pub enum Error {
    /// The document store failed, timed out, or returned a document that
    /// cannot be turned into an [`Article`](crate::Article).
    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Setting up a backend failed (connecting, migrating, seeding).
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// The underlying message without the kind prefix, suitable for the
    /// `details` field of an HTTP error body.
    pub fn details(&self) -> String {
        match self {
            Error::QueryFailed(msg)
            | Error::InvalidLimit(msg)
            | Error::Config(msg)
            | Error::Storage(msg) => msg.clone(),
            Error::Io(e) => e.to_string(),
            Error::Serialization(e) => e.to_string(),
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        Error::QueryFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
