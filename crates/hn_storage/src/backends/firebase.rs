use async_trait::async_trait;
use firestore::{FirestoreDb, FirestoreQueryDirection, FirestoreQueryFilter};
use hn_core::{Direction, Document, DocumentStore, Filter, OrderBy, Result, StoreError, StoreResult};
use serde_json::{Map, Value};
use tracing::info;

use crate::{StorageBackend, StoreConfig};

const BACKEND: &str = "Firestore";
const DOCUMENT_NAME_FIELD: &str = "__name__";

/// Credentials come from `GOOGLE_APPLICATION_CREDENTIALS` or Application
/// Default Credentials; nothing is embedded.
pub struct FirestoreStore {
    db: FirestoreDb,
    collection: String,
}

impl FirestoreStore {
    pub async fn new_with_project(project_id: &str, collection: &str) -> Result<Self> {
        let db = FirestoreDb::new(project_id)
            .await
            .map_err(|e| hn_core::Error::Storage(format!("Failed to initialize Firestore: {}", e)))?;
        info!("🔥 Firestore client initialized for project {}", project_id);

        Ok(Self {
            db,
            collection: collection.to_string(),
        })
    }

    async fn query(&self, filter: &Filter, order: &OrderBy, limit: u32) -> StoreResult<Vec<Document>> {
        // Only string equality is needed by the article queries.
        let mut clauses = Vec::with_capacity(filter.clauses().len());
        for (field, value) in filter.clauses() {
            match value {
                Value::String(s) => clauses.push((field.clone(), s.clone())),
                other => {
                    return Err(StoreError::new(
                        BACKEND,
                        format!("unsupported filter value for {}: {}", field, other),
                    ))
                }
            }
        }

        let direction = match order.direction {
            Direction::Ascending => FirestoreQueryDirection::Ascending,
            Direction::Descending => FirestoreQueryDirection::Descending,
        };

        let docs = self
            .db
            .fluent()
            .select()
            .from(self.collection.as_str())
            .filter(|q| {
                let conditions: Vec<Option<FirestoreQueryFilter>> = clauses
                    .iter()
                    .map(|(field, value)| q.field(field.as_str()).eq(value.clone()))
                    .collect();
                q.for_all(conditions)
            })
            .order_by([(order.field.as_str(), direction)])
            .limit(limit)
            .query()
            .await
            .map_err(|e| StoreError::new(BACKEND, e))?;

        docs.iter()
            .map(|doc| {
                let id = doc.name.rsplit('/').next().unwrap_or_default().to_string();
                let fields = FirestoreDb::deserialize_doc_to::<Map<String, Value>>(doc)
                    .map_err(|e| StoreError::new(BACKEND, format!("document {}: {}", id, e)))?;
                Ok(Document::new(id, fields))
            })
            .collect()
    }
}

#[async_trait]
impl StorageBackend for FirestoreStore {
    fn get_error_message() -> &'static str {
        "Firestore requires --project-id and Google credentials (GOOGLE_APPLICATION_CREDENTIALS or `gcloud auth application-default login`)"
    }

    async fn connect(config: &StoreConfig) -> Result<Self> {
        let project_id = config
            .project_id
            .as_deref()
            .ok_or_else(|| hn_core::Error::Config("Firestore requires a project id".to_string()))?;
        Self::new_with_project(project_id, &config.collection).await
    }
}

#[async_trait]
impl DocumentStore for FirestoreStore {
    fn name(&self) -> &str {
        BACKEND
    }

    /// Firestore leaves out documents that lack the order field.
    async fn find_ordered(&self, filter: &Filter, order: &OrderBy, limit: usize) -> StoreResult<Vec<Document>> {
        self.query(filter, order, u32::try_from(limit).unwrap_or(u32::MAX)).await
    }

    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<Document>> {
        let docs = self.query(filter, &OrderBy::asc(DOCUMENT_NAME_FIELD), 1).await?;
        Ok(docs.into_iter().next())
    }
}
