use async_trait::async_trait;
use hn_core::{DocumentStore, Error, Result};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, warn};

pub mod backends;

pub use backends::*;

pub const DEFAULT_DATABASE: &str = "news_rewrite";
pub const DEFAULT_COLLECTION: &str = "HetNieuws.RW";

#[async_trait]
pub trait StorageBackend: DocumentStore {
    /// Hint logged when the backend cannot be set up
    fn get_error_message() -> &'static str;

    async fn connect(config: &StoreConfig) -> Result<Self>
    where
        Self: Sized;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    #[default]
    Memory,
    Sqlite,
    MongoDb,
    Firestore,
}

impl FromStr for StoreKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite),
            "mongodb" | "mongo" => Ok(Self::MongoDb),
            "firestore" | "firebase" => Ok(Self::Firestore),
            other => Err(Error::Config(format!(
                "unknown storage backend {:?} (expected memory, sqlite, mongodb or firestore)",
                other
            ))),
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Memory => "memory",
            Self::Sqlite => "sqlite",
            Self::MongoDb => "mongodb",
            Self::Firestore => "firestore",
        };
        f.write_str(name)
    }
}

/// Where the articles live. Connection strings and project ids are always
/// supplied from outside.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// MongoDB connection string, or SQLite file path / `sqlite:` url
    pub url: Option<String>,
    pub database: String,
    pub collection: String,
    /// Firestore project
    pub project_id: Option<String>,
    /// JSON array used to seed the memory backend
    pub fixtures: Option<PathBuf>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::default(),
            url: None,
            database: DEFAULT_DATABASE.to_string(),
            collection: DEFAULT_COLLECTION.to_string(),
            project_id: None,
            fixtures: None,
        }
    }
}

impl StoreConfig {
    pub fn new(kind: StoreKind) -> Self {
        Self { kind, ..Self::default() }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    pub fn with_fixtures(mut self, path: impl Into<PathBuf>) -> Self {
        self.fixtures = Some(path.into());
        self
    }
}

/// Build the configured backend, connected and ready for queries.
pub async fn create_store(config: &StoreConfig) -> Result<Arc<dyn DocumentStore>> {
    match config.kind {
        StoreKind::Memory => connect::<MemoryStore>(config).await,
        #[cfg(feature = "sqlite")]
        StoreKind::Sqlite => connect::<SqliteStore>(config).await,
        #[cfg(feature = "mongodb")]
        StoreKind::MongoDb => connect::<MongoStore>(config).await,
        #[cfg(feature = "firestore")]
        StoreKind::Firestore => connect::<FirestoreStore>(config).await,
        #[allow(unreachable_patterns)]
        other => Err(Error::Config(format!(
            "storage backend {} is not compiled in (enable the `{}` feature)",
            other, other
        ))),
    }
}

async fn connect<T: StorageBackend + 'static>(config: &StoreConfig) -> Result<Arc<dyn DocumentStore>> {
    let store = T::connect(config).await.map_err(|e| {
        warn!("⚠️ {}", T::get_error_message());
        e
    })?;
    info!("🏦 Storage backend initialized successfully (using {})", store.name());
    Ok(Arc::new(store))
}

pub mod prelude {
    pub use super::backends::*;
    pub use super::{create_store, StorageBackend, StoreConfig, StoreKind};
}
