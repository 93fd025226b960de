use async_trait::async_trait;
use futures_util::TryStreamExt;
use hn_core::{Direction, Document, DocumentStore, Filter, OrderBy, Result, StoreError, StoreResult};
use mongodb::bson::{self, doc, Bson, Document as BsonDocument};
use mongodb::options::{FindOneOptions, FindOptions};
use mongodb::{Client, Collection};
use serde_json::Value;
use tracing::info;

use crate::{StorageBackend, StoreConfig};

const BACKEND: &str = "MongoDB";

pub struct MongoStore {
    collection: Collection<BsonDocument>,
}

impl MongoStore {
    pub async fn new_with_uri(uri: &str, database: &str, collection: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .map_err(|e| hn_core::Error::Storage(format!("Failed to create MongoDB client: {}", e)))?;

        let db = client.database(database);
        db.run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| hn_core::Error::Storage(format!("Failed to reach MongoDB: {}", e)))?;
        info!("🍃 Connected to MongoDB database {}", database);

        Ok(Self {
            collection: db.collection::<BsonDocument>(collection),
        })
    }
}

fn to_bson_filter(filter: &Filter) -> StoreResult<BsonDocument> {
    let mut query = BsonDocument::new();
    for (field, value) in filter.clauses() {
        let value = bson::to_bson(value).map_err(|e| StoreError::new(BACKEND, e))?;
        query.insert(field.clone(), value);
    }
    Ok(query)
}

fn to_document(mut raw: BsonDocument) -> StoreResult<Document> {
    let id = match raw.remove("_id") {
        Some(Bson::ObjectId(oid)) => oid.to_hex(),
        Some(Bson::String(s)) => s,
        Some(other) => other.to_string(),
        None => return Err(StoreError::new(BACKEND, "document without _id")),
    };

    match Bson::Document(raw).into_relaxed_extjson() {
        Value::Object(fields) => Ok(Document::new(id, fields)),
        other => Err(StoreError::new(BACKEND, format!("document {} converted to {}", id, other))),
    }
}

#[async_trait]
impl StorageBackend for MongoStore {
    fn get_error_message() -> &'static str {
        "MongoDB should be reachable through --backend-url (mongodb:// or mongodb+srv:// connection string)"
    }

    async fn connect(config: &StoreConfig) -> Result<Self> {
        let uri = config
            .url
            .as_deref()
            .ok_or_else(|| hn_core::Error::Config("MongoDB requires a connection string".to_string()))?;
        Self::new_with_uri(uri, &config.database, &config.collection).await
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    fn name(&self) -> &str {
        BACKEND
    }

    async fn find_ordered(&self, filter: &Filter, order: &OrderBy, limit: usize) -> StoreResult<Vec<Document>> {
        let direction = match order.direction {
            Direction::Ascending => 1,
            Direction::Descending => -1,
        };
        let mut sort = BsonDocument::new();
        sort.insert(order.field.clone(), direction);
        sort.insert("_id", 1);

        let options = FindOptions::builder()
            .sort(sort)
            .limit(i64::try_from(limit).unwrap_or(i64::MAX))
            .build();

        let cursor = self
            .collection
            .find(to_bson_filter(filter)?, options)
            .await
            .map_err(|e| StoreError::new(BACKEND, e))?;
        let raw: Vec<BsonDocument> = cursor.try_collect().await.map_err(|e| StoreError::new(BACKEND, e))?;

        raw.into_iter().map(to_document).collect()
    }

    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<Document>> {
        let options = FindOneOptions::builder().sort(doc! { "_id": 1 }).build();
        let raw = self
            .collection
            .find_one(to_bson_filter(filter)?, options)
            .await
            .map_err(|e| StoreError::new(BACKEND, e))?;

        raw.map(to_document).transpose()
    }
}
