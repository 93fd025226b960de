pub mod memory;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "mongodb")]
pub mod mongo;

#[cfg(feature = "firestore")]
pub mod firebase;

pub use memory::MemoryStore;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

#[cfg(feature = "mongodb")]
pub use mongo::MongoStore;

#[cfg(feature = "firestore")]
pub use firebase::FirestoreStore;
