use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::article::{Article, CATEGORY_FIELD, SLUG_FIELD, TIMESTAMP_FIELD};
use crate::storage::{DocumentStore, Filter, OrderBy, StoreResult};
use crate::{Error, Result};

pub const DEFAULT_RECENT_LIMIT: u32 = 20;
pub const DEFAULT_CATEGORY_LIMIT: u32 = 10;

/// A validated, strictly positive page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit(u32);

impl Limit {
    pub fn new(value: i64) -> Result<Self> {
        if value <= 0 {
            return Err(Error::InvalidLimit(format!("limit must be a positive integer, got {}", value)));
        }
        u32::try_from(value)
            .map(Self)
            .map_err(|_| Error::InvalidLimit(format!("limit {} is too large", value)))
    }

    pub fn get(self) -> usize {
        self.0 as usize
    }
}

impl From<Limit> for i64 {
    fn from(limit: Limit) -> Self {
        i64::from(limit.0)
    }
}

impl FromStr for Limit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value = s
            .trim()
            .parse::<i64>()
            .map_err(|_| Error::InvalidLimit(format!("limit must be a positive integer, got {:?}", s)))?;
        Self::new(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryConfig {
    pub recent_limit: u32,
    pub category_limit: u32,
    pub query_timeout: Option<Duration>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            recent_limit: DEFAULT_RECENT_LIMIT,
            category_limit: DEFAULT_CATEGORY_LIMIT,
            query_timeout: None,
        }
    }
}

impl QueryConfig {
    pub fn validate(&self) -> Result<()> {
        if self.recent_limit == 0 || self.category_limit == 0 {
            return Err(Error::Config("default page sizes must be positive".to_string()));
        }
        if self.query_timeout == Some(Duration::ZERO) {
            return Err(Error::Config("query timeout must be positive".to_string()));
        }
        Ok(())
    }
}

/// Answers the article queries of the site on top of any [`DocumentStore`].
///
/// Cheap to clone; every clone shares the same store handle. Each call is one
/// independent read, and dropping the returned future drops the store call.
#[derive(Clone)]
pub struct ArticleQueryService {
    store: Arc<dyn DocumentStore>,
    config: QueryConfig,
}

impl ArticleQueryService {
    pub fn new(store: Arc<dyn DocumentStore>, config: QueryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { store, config })
    }

    pub fn store_name(&self) -> &str {
        self.store.name()
    }

    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Most recent articles across all categories, newest first.
    pub async fn list_recent(&self, limit: Option<i64>) -> Result<Vec<Article>> {
        let limit = resolve_limit(limit, self.config.recent_limit)?;
        self.list(Filter::all(), limit).await
    }

    /// Most recent articles of one category, newest first. An unknown
    /// category is simply an empty list.
    pub async fn list_by_category(&self, category: &str, limit: Option<i64>) -> Result<Vec<Article>> {
        let limit = resolve_limit(limit, self.config.category_limit)?;
        self.list(Filter::all().eq(CATEGORY_FIELD, category), limit).await
    }

    /// The article with this category and slug. `Ok(None)` when nothing
    /// matches; when several documents match, the one with the lowest id.
    pub async fn get_by_slug(&self, category: &str, slug: &str) -> Result<Option<Article>> {
        let filter = Filter::all().eq(CATEGORY_FIELD, category).eq(SLUG_FIELD, slug);
        let found = self.run(self.store.find_one(&filter)).await?;
        debug!("Lookup {}/{} found: {}", category, slug, found.is_some());
        found.map(Article::try_from).transpose()
    }

    async fn list(&self, filter: Filter, limit: Limit) -> Result<Vec<Article>> {
        let order = OrderBy::desc(TIMESTAMP_FIELD);
        let documents = self
            .run(self.store.find_ordered(&filter, &order, limit.get()))
            .await?;
        debug!("Found {} documents in {} (limit {})", documents.len(), self.store.name(), limit.get());

        documents
            .into_iter()
            .take(limit.get())
            .map(Article::try_from)
            .collect()
    }

    async fn run<T>(&self, query: impl Future<Output = StoreResult<T>>) -> Result<T> {
        match self.config.query_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, query).await {
                Ok(result) => result.map_err(Error::from),
                Err(_) => Err(Error::QueryFailed(format!(
                    "{}: query timed out after {:?}",
                    self.store.name(),
                    timeout
                ))),
            },
            None => query.await.map_err(Error::from),
        }
    }
}

fn resolve_limit(requested: Option<i64>, default: u32) -> Result<Limit> {
    Limit::new(requested.unwrap_or(i64::from(default)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Document, StoreError};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers from a fixed document list, recording how often it was asked.
    struct FixtureStore {
        documents: Vec<Document>,
        calls: AtomicUsize,
    }

    impl FixtureStore {
        fn new(docs: Vec<(&str, Value)>) -> Self {
            let documents = docs
                .into_iter()
                .map(|(id, fields)| Document::new(id, fields.as_object().cloned().unwrap_or_default()))
                .collect();
            Self { documents, calls: AtomicUsize::new(0) }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl DocumentStore for FixtureStore {
        fn name(&self) -> &str {
            "Fixture"
        }

        async fn find_ordered(&self, filter: &Filter, order: &OrderBy, limit: usize) -> StoreResult<Vec<Document>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let mut docs: Vec<Document> = self.documents.iter().filter(|d| filter.matches(d)).cloned().collect();
            docs.sort_by(|a, b| order.compare(a, b));
            docs.truncate(limit);
            Ok(docs)
        }

        async fn find_one(&self, filter: &Filter) -> StoreResult<Option<Document>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self
                .documents
                .iter()
                .filter(|d| filter.matches(d))
                .min_by(|a, b| a.id.cmp(&b.id))
                .cloned())
        }
    }

    struct UnreachableStore;

    #[async_trait]
    impl DocumentStore for UnreachableStore {
        fn name(&self) -> &str {
            "Unreachable"
        }

        async fn find_ordered(&self, _: &Filter, _: &OrderBy, _: usize) -> StoreResult<Vec<Document>> {
            Err(StoreError::new("Unreachable", "connection refused (os error 111)"))
        }

        async fn find_one(&self, _: &Filter) -> StoreResult<Option<Document>> {
            Err(StoreError::new("Unreachable", "connection refused (os error 111)"))
        }
    }

    struct SlowStore;

    #[async_trait]
    impl DocumentStore for SlowStore {
        fn name(&self) -> &str {
            "Slow"
        }

        async fn find_ordered(&self, _: &Filter, _: &OrderBy, _: usize) -> StoreResult<Vec<Document>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(vec![])
        }

        async fn find_one(&self, _: &Filter) -> StoreResult<Option<Document>> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(None)
        }
    }

    fn seeded() -> Arc<FixtureStore> {
        Arc::new(FixtureStore::new(vec![
            ("a", json!({"category": "sport", "slug": "derby", "timestamp": "2024-05-01T08:00:00Z", "title": "Derby"})),
            ("b", json!({"category": "tech", "slug": "chip", "timestamp": "2024-05-03T08:00:00Z", "title": "Chip"})),
            ("c", json!({"category": "sport", "slug": "match-uitslag", "timestamp": "2024-05-02T08:00:00Z", "title": "Uitslag"})),
        ]))
    }

    fn service(store: Arc<dyn DocumentStore>) -> ArticleQueryService {
        ArticleQueryService::new(store, QueryConfig::default()).unwrap()
    }

    fn ids(articles: &[Article]) -> Vec<&str> {
        articles.iter().map(|a| a.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_list_recent_newest_first_across_categories() {
        let svc = service(seeded());

        let recent = svc.list_recent(Some(2)).await.unwrap();
        assert_eq!(ids(&recent), vec!["b", "c"]);

        let all = svc.list_recent(None).await.unwrap();
        assert_eq!(ids(&all), vec!["b", "c", "a"]);
        assert!(all.windows(2).all(|w| w[0].published >= w[1].published));
    }

    #[tokio::test]
    async fn test_list_recent_puts_null_timestamps_last() {
        let svc = service(Arc::new(FixtureStore::new(vec![
            ("new", json!({"category": "tech", "timestamp": "2024-05-03T08:00:00Z"})),
            ("nul", json!({"category": "tech", "timestamp": null})),
            ("old", json!({"category": "sport", "timestamp": "2024-05-01T08:00:00Z"})),
        ])));

        let page = svc.list_recent(Some(2)).await.unwrap();
        assert_eq!(ids(&page), vec!["new", "old"]);

        let all = svc.list_recent(None).await.unwrap();
        assert_eq!(ids(&all), vec!["new", "old", "nul"]);
        assert_eq!(all[2].timestamp, None);
    }

    #[tokio::test]
    async fn test_list_by_category_filters_and_orders() {
        let svc = service(seeded());

        let sport = svc.list_by_category("sport", Some(10)).await.unwrap();
        assert_eq!(ids(&sport), vec!["c", "a"]);
        assert!(sport.iter().all(|a| a.category == "sport"));

        assert!(svc.list_by_category("cultuur", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_store_yields_empty_list() {
        let svc = service(Arc::new(FixtureStore::new(vec![])));
        assert!(svc.list_recent(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_limits_never_reach_the_store() {
        let store = seeded();
        let svc = service(store.clone());

        for bad in [0, -1, i64::MIN] {
            assert!(matches!(svc.list_recent(Some(bad)).await, Err(Error::InvalidLimit(_))));
            assert!(matches!(svc.list_by_category("sport", Some(bad)).await, Err(Error::InvalidLimit(_))));
        }
        assert_eq!(store.calls(), 0);
    }

    #[test]
    fn test_limit_from_str() {
        assert_eq!("5".parse::<Limit>().unwrap().get(), 5);
        assert!(matches!("2.5".parse::<Limit>(), Err(Error::InvalidLimit(_))));
        assert!(matches!("abc".parse::<Limit>(), Err(Error::InvalidLimit(_))));
        assert!(matches!("0".parse::<Limit>(), Err(Error::InvalidLimit(_))));
        assert!(matches!("99999999999".parse::<Limit>(), Err(Error::InvalidLimit(_))));
    }

    #[tokio::test]
    async fn test_get_by_slug() {
        let svc = service(seeded());

        let found = svc.get_by_slug("sport", "derby").await.unwrap().unwrap();
        assert_eq!(found.id, "a");
        assert_eq!(found.title(), Some("Derby"));

        assert!(svc.get_by_slug("tech", "derby").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_by_slug_not_found_is_not_an_error() {
        let svc = service(Arc::new(FixtureStore::new(vec![])));
        assert!(svc.get_by_slug("sport", "match-uitslag").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_slug_resolves_to_lowest_id() {
        let svc = service(Arc::new(FixtureStore::new(vec![
            ("z9", json!({"category": "sport", "slug": "dubbel", "timestamp": "2024-05-09T00:00:00Z"})),
            ("a1", json!({"category": "sport", "slug": "dubbel", "timestamp": "2024-05-01T00:00:00Z"})),
        ])));
        let found = svc.get_by_slug("sport", "dubbel").await.unwrap().unwrap();
        assert_eq!(found.id, "a1");
    }

    #[tokio::test]
    async fn test_store_failure_becomes_query_failed() {
        let svc = service(Arc::new(UnreachableStore));

        let err = svc.get_by_slug("sport", "derby").await.unwrap_err();
        match err {
            Error::QueryFailed(details) => assert!(details.contains("connection refused")),
            other => panic!("expected QueryFailed, got {other:?}"),
        }
        assert!(matches!(svc.list_recent(None).await, Err(Error::QueryFailed(_))));
    }

    #[tokio::test]
    async fn test_malformed_document_fails_whole_query() {
        let svc = service(Arc::new(FixtureStore::new(vec![
            ("ok", json!({"category": "sport", "timestamp": "2024-05-01T00:00:00Z"})),
            ("bad", json!({"category": ["sport"], "timestamp": "2024-05-02T00:00:00Z"})),
        ])));
        assert!(matches!(svc.list_recent(None).await, Err(Error::QueryFailed(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_surfaces_as_query_failed() {
        let config = QueryConfig { query_timeout: Some(Duration::from_secs(2)), ..QueryConfig::default() };
        let svc = ArticleQueryService::new(Arc::new(SlowStore), config).unwrap();

        match svc.list_recent(None).await {
            Err(Error::QueryFailed(details)) => assert!(details.contains("timed out")),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_repeated_queries_are_stable() {
        let svc = service(seeded());
        let first = svc.list_by_category("sport", None).await.unwrap();
        let second = svc.list_by_category("sport", None).await.unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_config_rejects_zero_defaults() {
        let config = QueryConfig { recent_limit: 0, ..QueryConfig::default() };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
