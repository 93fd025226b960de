use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::any::Any;
use std::future::Future;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::{AppState, ServerConfig};

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/get-blogs", get(handlers::list_recent))
        .route("/blogs/category/:category", get(handlers::list_by_category))
        .route("/blog/:category/:slug", get(handlers::get_by_slug))
        .route("/health", get(handlers::health))
        .fallback(handlers::fallback)
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let details = if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    };
    error!("Unhandled error: {}", details);

    let body = error::ErrorBody {
        error: "Internal server error".to_string(),
        details: Some(details),
    };
    (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
}

/// Bind and serve until `shutdown` resolves.
pub async fn serve(state: AppState, shutdown: impl Future<Output = ()> + Send + 'static) -> std::io::Result<()> {
    let host = state.config.host.clone();
    let port = state.config.port;
    let database = state.service.store_name().to_string();

    let listener = tokio::net::TcpListener::bind((host.as_str(), port)).await?;
    let local = listener.local_addr()?;
    info!("🚀 Server is running on port {}", local.port());
    info!("Health check available at: http://{}/health", local);
    info!("Database: {}", database);

    axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown)
        .await
}

pub mod prelude {
    pub use crate::{create_app, serve, AppState, ServerConfig};
    pub use hn_core::{Article, Error, Result};
}
