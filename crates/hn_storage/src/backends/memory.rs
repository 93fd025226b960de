use async_trait::async_trait;
use hn_core::{Document, DocumentStore, Filter, OrderBy, Result, StoreResult};
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::{StorageBackend, StoreConfig};

#[derive(Debug, Default)]
pub struct MemoryCollection {
    documents: Vec<Document>,
}

impl MemoryCollection {
    pub fn insert(&mut self, document: Document) {
        if let Some(existing) = self.documents.iter_mut().find(|d| d.id == document.id) {
            *existing = document;
        } else {
            self.documents.push(document);
        }
    }

    pub fn find_ordered(&self, filter: &Filter, order: &OrderBy, limit: usize) -> Vec<Document> {
        let mut matching = self
            .documents
            .iter()
            .filter(|d| filter.matches(d))
            .collect::<Vec<_>>();
        // Stable sort keeps insertion order between equal keys.
        matching.sort_by(|a, b| order.compare(a, b));
        matching.into_iter().take(limit).cloned().collect()
    }

    pub fn find_one(&self, filter: &Filter) -> Option<Document> {
        self.documents
            .iter()
            .filter(|d| filter.matches(d))
            .min_by(|a, b| a.id.cmp(&b.id))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Process local store. Used for fixtures, demos and tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collection: Arc<RwLock<MemoryCollection>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_documents(documents: impl IntoIterator<Item = Document>) -> Self {
        let mut collection = MemoryCollection::default();
        for document in documents {
            collection.insert(document);
        }
        Self { collection: Arc::new(RwLock::new(collection)) }
    }

    /// Load a JSON array of article objects. An entry's `id` (or `_id`)
    /// becomes the document id; entries without one get a random id.
    pub async fn from_json_file(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await?;
        let entries: Vec<Value> = serde_json::from_str(&raw)?;

        let mut documents = Vec::with_capacity(entries.len());
        for (i, entry) in entries.into_iter().enumerate() {
            match entry {
                Value::Object(fields) => documents.push(fixture_document(fields)),
                other => {
                    return Err(hn_core::Error::Config(format!(
                        "fixture entry {} in {} is not an object: {}",
                        i,
                        path.display(),
                        other
                    )))
                }
            }
        }

        info!("📄 Loaded {} fixture documents from {}", documents.len(), path.display());
        Ok(Self::with_documents(documents))
    }

    pub async fn insert(&self, document: Document) {
        self.collection.write().await.insert(document);
    }

    pub async fn len(&self) -> usize {
        self.collection.read().await.len()
    }
}

fn fixture_document(mut fields: Map<String, Value>) -> Document {
    let id = ["id", "_id"]
        .iter()
        .find_map(|key| match fields.get(*key) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Object(oid)) => oid.get("$oid").and_then(Value::as_str).map(str::to_string),
            _ => None,
        })
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    fields.remove("id");
    fields.remove("_id");
    Document::new(id, fields)
}

#[async_trait]
impl StorageBackend for MemoryStore {
    fn get_error_message() -> &'static str {
        "Memory storage should be available"
    }

    async fn connect(config: &StoreConfig) -> Result<Self> {
        match &config.fixtures {
            Some(path) => Self::from_json_file(path).await,
            None => Ok(Self::default()),
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn name(&self) -> &str {
        "Memory"
    }

    async fn find_ordered(&self, filter: &Filter, order: &OrderBy, limit: usize) -> StoreResult<Vec<Document>> {
        let collection = self.collection.read().await;
        Ok(collection.find_ordered(filter, order, limit))
    }

    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<Document>> {
        let collection = self.collection.read().await;
        Ok(collection.find_one(filter))
    }
}
