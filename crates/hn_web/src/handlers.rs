use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{SecondsFormat, Utc};
use hn_core::{Article, Error, Limit};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::error::ApiError;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<String>,
}

impl ListParams {
    /// Raw `?limit=` value checked for being a positive integer.
    fn limit(&self) -> Result<Option<i64>, Error> {
        self.limit
            .as_deref()
            .map(|raw| raw.parse::<Limit>().map(i64::from))
            .transpose()
    }
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub service: String,
    pub database: String,
    pub timestamp: String,
}

pub async fn list_recent(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Article>>, ApiError> {
    const CONTEXT: &str = "Error fetching blogs";

    info!("Fetching blogs from {}...", state.service.store_name());
    let limit = params.limit().map_err(|e| ApiError::query(CONTEXT, e))?;
    let blogs = state
        .service
        .list_recent(limit)
        .await
        .map_err(|e| ApiError::query(CONTEXT, e))?;

    info!("Found {} blogs in {}", blogs.len(), state.service.store_name());
    Ok(Json(blogs))
}

pub async fn list_by_category(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Article>>, ApiError> {
    const CONTEXT: &str = "Error fetching blogs by category";

    info!("Fetching blogs for category: {}", category);
    let limit = params.limit().map_err(|e| ApiError::query(CONTEXT, e))?;
    let blogs = state
        .service
        .list_by_category(&category, limit)
        .await
        .map_err(|e| ApiError::query(CONTEXT, e))?;

    info!("Found {} blogs for category {}", blogs.len(), category);
    Ok(Json(blogs))
}

pub async fn get_by_slug(
    State(state): State<Arc<AppState>>,
    Path((category, slug)): Path<(String, String)>,
) -> Result<Json<Article>, ApiError> {
    info!("Fetching blog: {}/{}", category, slug);
    match state.service.get_by_slug(&category, &slug).await {
        Ok(Some(blog)) => Ok(Json(blog)),
        Ok(None) => {
            info!("Blog not found: {}/{}", category, slug);
            Err(ApiError::not_found("Blog not found"))
        }
        Err(e) => Err(ApiError::query("Error fetching blog", e)),
    }
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "OK",
        service: state.config.service_name.clone(),
        database: state.service.store_name().to_string(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

pub async fn fallback() -> ApiError {
    ApiError::not_found("Not found")
}
