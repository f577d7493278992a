use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::geo::FALLBACK_IP;

/// Main configuration structure loaded from wellness_gateway.toml and environment variables
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub data: DataConfig,
    pub geo: GeoConfig,
    pub generation: GenerationConfig,
    /// Runtime configuration loaded from environment variables
    #[serde(skip)]
    pub runtime: RuntimeConfig,
}

/// Inbound HTTP listener and static files
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_host: String,
    pub port: u16,
    pub static_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: 8080,
            static_dir: PathBuf::from("static"),
        }
    }
}

/// Location of the per-topic World Bank datasets
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DataConfig {
    pub dir: PathBuf,
    /// Number of parsed datasets kept in memory; 0 re-reads on every request
    pub cache_max: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("world_bank_data"),
            cache_max: 8,
        }
    }
}

/// IP geolocation lookup
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GeoConfig {
    pub endpoint: String,
    pub fallback_ip: String,
    pub timeout_ms: u64,
}

impl Default for GeoConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://ipinfo.io".to_string(),
            fallback_ip: FALLBACK_IP.to_string(),
            timeout_ms: 3_000,
        }
    }
}

/// Generative model endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub endpoint: String,
    pub model: String,
    pub timeout_ms: u64,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-1.5-flash".to_string(),
            timeout_ms: 60_000,
        }
    }
}

/// Log filter used when RUST_LOG is unset
pub const DEFAULT_LOG_FILTER: &str = "wellness_gateway=info,tower_http=info";

/// Runtime configuration loaded from environment variables
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    pub api_key: Option<String>,
}

/// Tracing filter from RUST_LOG, else [`DEFAULT_LOG_FILTER`].
///
/// Needed before [`Config::load`] so its warnings reach the subscriber.
pub fn log_filter<F>(lookup: F) -> String
where
    F: Fn(&str) -> Option<String>,
{
    lookup("RUST_LOG")
        .map(|level| level.trim().to_string())
        .filter(|level| !level.is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

fn parse_env<T: std::str::FromStr>(value: Option<String>, key: &str) -> Option<T> {
    let raw = value?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring unparsable value for {}: {:?}", key, raw);
            None
        }
    }
}

impl Config {
    /// Load configuration from TOML file and environment variables.
    /// Uses `path`, else WELLNESS_GATEWAY_CONFIG, else "wellness_gateway.toml".
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        Self::load_env_files();

        let config_path = path.map(Path::to_path_buf).unwrap_or_else(|| {
            PathBuf::from(
                std::env::var("WELLNESS_GATEWAY_CONFIG")
                    .unwrap_or_else(|_| "wellness_gateway.toml".to_string()),
            )
        });

        let mut config: Config = if let Ok(content) = std::fs::read_to_string(&config_path) {
            toml::from_str(&content)?
        } else {
            tracing::warn!(
                "Config file {} not found, using defaults",
                config_path.display()
            );
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load environment variables with fallbacks:
    /// 1) WG_ENV_FILE if set
    /// 2) ./.env
    /// 3) ../.env when the key is still missing
    ///
    /// Variables already set in the process are never overwritten.
    pub fn load_env_files() {
        if let Ok(env_path) = std::env::var("WG_ENV_FILE") {
            let _ = dotenvy::from_path(env_path);
        } else {
            let _ = dotenvy::from_path(".env");
            if std::env::var("GEMINI_API_KEY").is_err() {
                let _ = dotenvy::from_path("../.env");
            }
        }
    }

    /// Apply environment overrides (env-first). `lookup` returns the raw value of a variable.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        self.runtime.api_key = lookup("GEMINI_API_KEY")
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());

        if let Some(port) = parse_env::<u16>(lookup("REST_PORT"), "REST_PORT") {
            self.server.port = port;
        }
        if let Some(host) = lookup("WG_BIND_HOST") {
            self.server.bind_host = host;
        }
        if let Some(dir) = lookup("WG_STATIC_DIR") {
            self.server.static_dir = PathBuf::from(dir);
        }

        if let Some(dir) = lookup("WG_DATA_DIR") {
            self.data.dir = PathBuf::from(dir);
        }
        if let Some(max) = parse_env::<usize>(lookup("WG_DATASET_CACHE_MAX"), "WG_DATASET_CACHE_MAX")
        {
            self.data.cache_max = max;
        }

        if let Some(endpoint) = lookup("WG_GEO_ENDPOINT") {
            self.geo.endpoint = endpoint;
        }
        if let Some(ip) = lookup("WG_GEO_FALLBACK_IP") {
            self.geo.fallback_ip = ip;
        }
        if let Some(ms) = parse_env::<u64>(lookup("WG_GEO_TIMEOUT_MS"), "WG_GEO_TIMEOUT_MS") {
            self.geo.timeout_ms = ms;
        }

        if let Some(model) = lookup("GEMINI_MODEL") {
            self.generation.model = model;
        }
        if let Some(endpoint) = lookup("WG_GEMINI_ENDPOINT") {
            self.generation.endpoint = endpoint;
        }
        if let Some(ms) = parse_env::<u64>(lookup("GEMINI_TIMEOUT_MS"), "GEMINI_TIMEOUT_MS") {
            self.generation.timeout_ms = ms;
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.runtime.api_key.is_none() {
            anyhow::bail!("GEMINI_API_KEY not set");
        }
        if self.generation.model.trim().is_empty() {
            anyhow::bail!("generation.model must not be empty");
        }
        if self.generation.timeout_ms == 0 {
            anyhow::bail!("GEMINI_TIMEOUT_MS must be > 0");
        }
        if self.geo.timeout_ms == 0 {
            anyhow::bail!("WG_GEO_TIMEOUT_MS must be > 0");
        }
        if self.geo.fallback_ip.parse::<IpAddr>().is_err() {
            anyhow::bail!(
                "WG_GEO_FALLBACK_IP must be an IP address, got {:?}",
                self.geo.fallback_ip
            );
        }
        self.bind_addr()?;
        Ok(())
    }

    pub fn api_key(&self) -> Option<&str> {
        self.runtime.api_key.as_deref()
    }

    pub fn bind_addr(&self) -> anyhow::Result<SocketAddr> {
        let ip: IpAddr = self
            .server
            .bind_host
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind host {:?}: {}", self.server.bind_host, e))?;
        Ok(SocketAddr::new(ip, self.server.port))
    }
}
