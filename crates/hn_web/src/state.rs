use hn_core::ArticleQueryService;

pub const DEFAULT_SERVICE_NAME: &str = "HetNieuws.app API";
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Reported as `service` by the health endpoint
    pub service_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }
}

pub struct AppState {
    pub service: ArticleQueryService,
    pub config: ServerConfig,
}

impl AppState {
    pub fn new(service: ArticleQueryService, config: ServerConfig) -> Self {
        Self { service, config }
    }
}
