use std::cmp::Ordering;
use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::timestamp;

/// A raw record as the store holds it: its identifier plus the untyped data.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self { id: id.into(), fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }
}

/// Conjunction of field equality clauses. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<(String, Value)>,
}

impl Filter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.clauses.push((field.into(), value.into()));
        self
    }

    pub fn clauses(&self) -> &[(String, Value)] {
        &self.clauses
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.clauses
            .iter()
            .all(|(field, value)| document.get(field) == Some(value))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: Direction::Ascending }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self { field: field.into(), direction: Direction::Descending }
    }

    /// Ordering of two documents under this key. Documents missing the field,
    /// or holding `null` in it, always sort last, whatever the direction.
    pub fn compare(&self, a: &Document, b: &Document) -> Ordering {
        match (self.key(a), self.key(b)) {
            (Some(x), Some(y)) => {
                let ord = compare_values(x, y);
                match self.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    fn key<'a>(&self, document: &'a Document) -> Option<&'a Value> {
        document.get(&self.field).filter(|v| !v.is_null())
    }
}

/// Total order over field values: timestamps chronologically, numbers
/// numerically, everything else by its string form.
pub fn compare_values(a: &Value, b: &Value) -> Ordering {
    if let (Some(x), Some(y)) = (timestamp::parse(a), timestamp::parse(b)) {
        return x.cmp(&y);
    }
    if let (Some(x), Some(y)) = (a.as_f64(), b.as_f64()) {
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    match (a, b) {
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Failure reported by a backend. The message is the backend's own error text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub backend: &'static str,
    pub message: String,
}

impl StoreError {
    pub fn new(backend: &'static str, message: impl fmt::Display) -> Self {
        Self { backend, message: message.to_string() }
    }
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.backend, self.message)
    }
}

impl std::error::Error for StoreError {}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Read-only access to a collection of article documents.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Human readable backend name, reported by the health endpoint
    fn name(&self) -> &str;

    /// Documents matching `filter`, sorted by `order`, at most `limit` of them
    async fn find_ordered(&self, filter: &Filter, order: &OrderBy, limit: usize) -> StoreResult<Vec<Document>>;

    /// The matching document with the lowest id, if any
    async fn find_one(&self, filter: &Filter) -> StoreResult<Option<Document>>;
}
