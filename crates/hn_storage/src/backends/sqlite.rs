use async_trait::async_trait;
use hn_core::{Direction, Document, DocumentStore, Filter, OrderBy, Result, StoreError, StoreResult};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::{StorageBackend, StoreConfig};

const BACKEND: &str = "SQLite";
const DEFAULT_DB_PATH: &str = "articles.db";

const MIGRATIONS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS documents (
        collection TEXT NOT NULL,
        id TEXT NOT NULL,
        body TEXT NOT NULL,
        PRIMARY KEY (collection, id)
    )
    "#,
    // Add future migrations here
];

/// Documents stored as JSON text, one table shared by all collections.
pub struct SqliteStore {
    pool: Arc<SqlitePool>,
    collection: String,
}

impl SqliteStore {
    pub async fn new_with_path(db_path: &Path, collection: &str) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| hn_core::Error::Storage(format!("Failed to create database directory: {}", e)))?;
            }
        }
        let options = SqliteConnectOptions::new().filename(db_path).create_if_missing(true);
        Self::new_with_options(options, collection).await
    }

    pub async fn new_with_url(url: &str, collection: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| hn_core::Error::Config(format!("Invalid SQLite url {}: {}", url, e)))?
            .create_if_missing(true);
        Self::new_with_options(options, collection).await
    }

    async fn new_with_options(options: SqliteConnectOptions, collection: &str) -> Result<Self> {
        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| hn_core::Error::Storage(format!("Failed to connect to database: {}", e)))?;

        for (i, migration) in MIGRATIONS.iter().enumerate() {
            sqlx::query(migration)
                .execute(&pool)
                .await
                .map_err(|e| hn_core::Error::Storage(format!("Failed to run migration {}: {}", i, e)))?;
        }

        Ok(Self {
            pool: Arc::new(pool),
            collection: collection.to_string(),
        })
    }

    /// Insert or replace a document. Only used to seed databases; the query
    /// service itself never writes.
    pub async fn insert(&self, document: &Document) -> Result<()> {
        let body = serde_json::to_string(&document.fields)?;
        sqlx::query("INSERT OR REPLACE INTO documents (collection, id, body) VALUES (?, ?, ?)")
            .bind(&self.collection)
            .bind(&document.id)
            .bind(body)
            .execute(&*self.pool)
            .await
            .map_err(|e| hn_core::Error::Storage(format!("Failed to store document {}: {}", document.id, e)))?;
        Ok(())
    }

    fn select(&self, filter: &Filter) -> QueryBuilder<'static, Sqlite> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id, body FROM documents WHERE collection = ");
        qb.push_bind(self.collection.clone());

        for (field, value) in filter.clauses() {
            qb.push(" AND json_extract(body, ").push_bind(json_path(field)).push(")");
            match value {
                Value::Null => {
                    qb.push(" IS NULL");
                }
                Value::String(s) => {
                    qb.push(" = ").push_bind(s.clone());
                }
                Value::Bool(b) => {
                    qb.push(" = ").push_bind(i64::from(*b));
                }
                Value::Number(n) => match n.as_i64() {
                    Some(i) => {
                        qb.push(" = ").push_bind(i);
                    }
                    None => {
                        qb.push(" = ").push_bind(n.as_f64().unwrap_or_default());
                    }
                },
                other => {
                    qb.push(" = json(").push_bind(other.to_string()).push(")");
                }
            }
        }
        qb
    }
}

/// JSON path of a top level key, quoted so dots in field names stay literal.
fn json_path(field: &str) -> String {
    format!("$.\"{}\"", field.replace('"', "\\\""))
}

fn to_document(row: &SqliteRow) -> StoreResult<Document> {
    let id: String = row.try_get("id").map_err(|e| StoreError::new(BACKEND, e))?;
    let body: String = row.try_get("body").map_err(|e| StoreError::new(BACKEND, e))?;
    match serde_json::from_str::<Value>(&body) {
        Ok(Value::Object(fields)) => Ok(Document::new(id, fields)),
        Ok(_) => Err(StoreError::new(BACKEND, format!("document {} is not a JSON object", id))),
        Err(e) => Err(StoreError::new(BACKEND, format!("document {} has invalid JSON: {}", id, e))),
    }
}

#[async_trait]
impl StorageBackend for SqliteStore {
    fn get_error_message() -> &'static str {
        "SQLite database should be available at ./articles.db"
    }

    async fn connect(config: &StoreConfig) -> Result<Self> {
        match config.url.as_deref() {
            Some(url) if url.starts_with("sqlite:") => Self::new_with_url(url, &config.collection).await,
            Some(path) => Self::new_with_path(&PathBuf::from(path), &config.collection).await,
            None => Self::new_with_path(Path::new(DEFAULT_DB_PATH), &config.collection).await,
        }
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn find_ordered(&self, filter: &Filter, order: &OrderBy, limit: usize) -> StoreResult<Vec<Document>> {
        let path = json_path(&order.field);
        let direction = match order.direction {
            Direction::Ascending => "ASC",
            Direction::Descending => "DESC",
        };

        let mut qb = self.select(filter);
        qb.push(" ORDER BY json_extract(body, ")
            .push_bind(path.clone())
            .push(") IS NULL, json_extract(body, ")
            .push_bind(path)
            .push(") ")
            .push(direction)
            .push(", id ASC LIMIT ")
            .push_bind(i64::try_from(limit).unwrap_or(i64::MAX));

        let rows = qb
            .build()
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| StoreError::new(BACKEND, e))?;

        rows.iter().map(to_document).collect()
    }

    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<Document>> {
        let mut qb = self.select(filter);
        qb.push(" ORDER BY id ASC LIMIT 1");

        let row = qb
            .build()
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| StoreError::new(BACKEND, e))?;

        row.as_ref().map(to_document).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn document(id: &str, fields: Value) -> Document {
        Document::new(id, fields.as_object().cloned().unwrap_or_default())
    }

    async fn seeded(db_path: &Path) -> SqliteStore {
        let store = SqliteStore::new_with_path(db_path, "HetNieuws.RW").await.unwrap();
        for doc in [
            document("1", json!({"category": "sport", "slug": "derby", "timestamp": "2024-05-01T08:00:00Z"})),
            document("2", json!({"category": "tech", "slug": "chip", "timestamp": "2024-05-03T08:00:00Z"})),
            document("3", json!({"category": "sport", "slug": "derby", "timestamp": "2024-05-02T08:00:00Z"})),
            document("4", json!({"category": "sport", "slug": "oud"})),
        ] {
            store.insert(&doc).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_sqlite_find_ordered() {
        let temp_dir = tempdir().unwrap();
        let store = seeded(&temp_dir.path().join("test.db")).await;

        let recent = store.find_ordered(&Filter::all(), &OrderBy::desc("timestamp"), 2).await.unwrap();
        let ids: Vec<_> = recent.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3"]);

        let sport = store
            .find_ordered(&Filter::all().eq("category", "sport"), &OrderBy::desc("timestamp"), 10)
            .await
            .unwrap();
        let ids: Vec<_> = sport.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["3", "1", "4"]);
        assert_eq!(sport[0].get("slug"), Some(&json!("derby")));
    }

    #[tokio::test]
    async fn test_sqlite_find_one_lowest_id() {
        let temp_dir = tempdir().unwrap();
        let store = seeded(&temp_dir.path().join("test.db")).await;

        let filter = Filter::all().eq("category", "sport").eq("slug", "derby");
        let found = store.find_one(&filter).await.unwrap().unwrap();
        assert_eq!(found.id, "1");

        let missing = Filter::all().eq("category", "sport").eq("slug", "match-uitslag");
        assert!(store.find_one(&missing).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sqlite_collections_are_isolated() {
        let temp_dir = tempdir().unwrap();
        let db_path = temp_dir.path().join("test.db");
        let _seeded = seeded(&db_path).await;

        let other = SqliteStore::new_with_path(&db_path, "saved_rewritten").await.unwrap();
        let docs = other.find_ordered(&Filter::all(), &OrderBy::desc("timestamp"), 10).await.unwrap();
        assert!(docs.is_empty());
    }
}
