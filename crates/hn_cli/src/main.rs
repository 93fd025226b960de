use anyhow::{bail, Context};
use clap::Parser;
use hn_core::{ArticleQueryService, QueryConfig};
use hn_storage::{StoreConfig, StoreKind, DEFAULT_COLLECTION, DEFAULT_DATABASE};
use hn_web::state::{DEFAULT_HOST, DEFAULT_PORT, DEFAULT_SERVICE_NAME};
use hn_web::{AppState, ServerConfig};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hn_core::service::{DEFAULT_CATEGORY_LIMIT, DEFAULT_RECENT_LIMIT};

#[derive(Parser, Debug)]
#[command(author, version, about = "HetNieuws article API", long_about = None)]
pub struct Cli {
    #[arg(long, env = "HN_STORAGE", default_value = "memory", help = "Storage backend: memory, sqlite, mongodb or firestore")]
    storage: StoreKind,
    #[arg(long, env = "HN_BACKEND_URL", help = "MongoDB connection string or SQLite database path")]
    backend_url: Option<String>,
    #[arg(long, env = "HN_DATABASE", default_value = DEFAULT_DATABASE)]
    database: String,
    #[arg(long, env = "HN_COLLECTION", default_value = DEFAULT_COLLECTION)]
    collection: String,
    #[arg(long, env = "HN_PROJECT_ID", help = "Firestore project id")]
    project_id: Option<String>,
    #[arg(long, env = "HN_FIXTURES", help = "JSON array of articles loaded into the memory backend")]
    fixtures: Option<PathBuf>,
    #[arg(long, env = "HN_RECENT_LIMIT", default_value_t = DEFAULT_RECENT_LIMIT)]
    recent_limit: u32,
    #[arg(long, env = "HN_CATEGORY_LIMIT", default_value_t = DEFAULT_CATEGORY_LIMIT)]
    category_limit: u32,
    #[arg(long, env = "HN_QUERY_TIMEOUT_SECS")]
    query_timeout_secs: Option<u64>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Serve the HTTP API
    Serve {
        #[arg(long, env = "HN_HOST", default_value = DEFAULT_HOST)]
        host: String,
        #[arg(long, env = "PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
        #[arg(long, env = "HN_SERVICE_NAME", default_value = DEFAULT_SERVICE_NAME)]
        service_name: String,
    },
    /// Check that the store answers a query
    Check,
    /// Run a single query and print the result as JSON
    Query {
        #[command(subcommand)]
        query: QueryCommands,
    },
}

#[derive(clap::Subcommand, Debug)]
enum QueryCommands {
    Recent {
        #[arg(long, allow_negative_numbers = true)]
        limit: Option<i64>,
    },
    Category {
        category: String,
        #[arg(long, allow_negative_numbers = true)]
        limit: Option<i64>,
    },
    Get {
        category: String,
        slug: String,
    },
}

impl Cli {
    fn store_config(&self) -> StoreConfig {
        StoreConfig {
            kind: self.storage,
            url: self.backend_url.clone(),
            database: self.database.clone(),
            collection: self.collection.clone(),
            project_id: self.project_id.clone(),
            fixtures: self.fixtures.clone(),
        }
    }

    fn query_config(&self) -> QueryConfig {
        QueryConfig {
            recent_limit: self.recent_limit,
            category_limit: self.category_limit,
            query_timeout: self.query_timeout_secs.map(Duration::from_secs),
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn check_store(service: &ArticleQueryService) -> anyhow::Result<()> {
    info!("📡 Testing {} connection...", service.store_name());
    let articles = service
        .list_recent(Some(1))
        .await
        .with_context(|| format!("{} did not answer", service.store_name()))?;
    info!("✅ Successfully read from {} ({} article(s) returned)", service.store_name(), articles.len());
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_logging();
    let cli = Cli::parse();

    info!("💾 Connecting to {} storage...", cli.storage);
    let store = hn_storage::create_store(&cli.store_config()).await?;
    let service = ArticleQueryService::new(store, cli.query_config())?;

    match cli.command {
        Commands::Serve { host, port, service_name } => {
            let config = ServerConfig { host, port, service_name };
            hn_web::serve(AppState::new(service, config), shutdown_signal()).await?;
        }
        Commands::Check => check_store(&service).await?,
        Commands::Query { query } => match query {
            QueryCommands::Recent { limit } => print_json(&service.list_recent(limit).await?)?,
            QueryCommands::Category { category, limit } => {
                print_json(&service.list_by_category(&category, limit).await?)?
            }
            QueryCommands::Get { category, slug } => match service.get_by_slug(&category, &slug).await? {
                Some(article) => print_json(&article)?,
                None => bail!("Blog not found: {}/{}", category, slug),
            },
        },
    }

    Ok(())
}
