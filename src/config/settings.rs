use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub broadcast: BroadcastConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Registry backend: "memory" or "redis"
    #[serde(default = "default_registry_backend")]
    pub backend: String,
    /// Redis connection URL (redis backend only)
    #[serde(default = "default_registry_url")]
    pub url: String,
    /// Key-space name for connection records, analogous to a table name
    #[serde(default = "default_table_name")]
    pub table_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Base URL of the push gateway management endpoint
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,
    /// Per-request timeout in seconds for gateway deliveries
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BroadcastConfig {
    /// Fixed response string delivered to every recipient
    #[serde(default = "default_response_message")]
    pub response_message: String,
    /// Number of records requested per registry scan page
    #[serde(default = "default_scan_page_size")]
    pub scan_page_size: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8081
}

fn default_registry_backend() -> String {
    "memory".to_string()
}

fn default_registry_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_table_name() -> String {
    "connections".to_string()
}

fn default_endpoint_url() -> String {
    "http://localhost:8081".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_response_message() -> String {
    "response from relay backend ...".to_string()
}

fn default_scan_page_size() -> usize {
    100
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        // Load .env file if exists
        let _ = dotenvy::dotenv();

        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8081)?
            .set_default("registry.backend", "memory")?
            .set_default("registry.url", "redis://localhost:6379")?
            .set_default("registry.table_name", "connections")?
            .set_default("gateway.endpoint_url", "http://localhost:8081")?
            .set_default("gateway.request_timeout_secs", 10)?
            .set_default("broadcast.response_message", "response from relay backend ...")?
            .set_default("broadcast.scan_page_size", 100)?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables
            // SERVER_HOST, SERVER_PORT, REGISTRY_BACKEND, REGISTRY_URL, etc.
            .add_source(
                Environment::default()
                    .separator("_")
                    .try_parsing(true)
                    .list_separator(","),
            );

        let mut settings: Settings = builder.build()?.try_deserialize()?;

        // Flat environment names recognized for deployment compatibility
        if let Ok(table_name) = env::var("TABLE_NAME") {
            settings.registry.table_name = table_name;
        }
        if let Ok(endpoint_url) = env::var("ENDPOINT_URL") {
            settings.gateway.endpoint_url = endpoint_url;
        }

        Ok(settings)
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: vec![],
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            backend: default_registry_backend(),
            url: default_registry_url(),
            table_name: default_table_name(),
        }
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            endpoint_url: default_endpoint_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            response_message: default_response_message(),
            scan_page_size: default_scan_page_size(),
        }
    }
}
