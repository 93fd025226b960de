pub mod article;
pub mod error;
pub mod service;
pub mod storage;
pub mod timestamp;

pub use article::Article;
pub use error::{Error, Result};
pub use service::{ArticleQueryService, Limit, QueryConfig};
pub use storage::{Direction, Document, DocumentStore, Filter, OrderBy, StoreError, StoreResult};

pub mod prelude {
    pub use crate::{Article, ArticleQueryService, DocumentStore, Error, QueryConfig, Result};
}
