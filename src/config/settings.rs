//! Configuration sections, defaults and validation.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Public Buildkite REST API endpoint.
pub const DEFAULT_API_URL: &str = "https://api.buildkite.com/v2";

/// Largest page size the Buildkite API accepts.
const MAX_PER_PAGE: u32 = 100;

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("buildkite API token is required (--buildkite.token or BUILDKITE_TOKEN)")]
    MissingToken,
    #[error("buildkite organization is required (--buildkite.orgname or BUILDKITE_ORGNAME)")]
    MissingOrganization,
    #[error("request timeout must be greater than zero")]
    InvalidTimeout,
    #[error("page size must be between 1 and 100, got {0}")]
    InvalidPageSize(u32),
    #[error("invalid API url {url:?}: {reason}")]
    InvalidApiUrl { url: String, reason: String },
    #[error("metrics path must be a literal path starting with '/' other than '/' and '/health', got {0:?}")]
    InvalidMetricsPath(String),
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Buildkite API settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildkiteSettings {
    /// API access token.
    pub token: String,
    /// Organization slug to scrape.
    pub orgname: String,
    /// Per-request timeout.
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Base URL of the REST API.
    pub api_url: String,
    /// Page size requested from list endpoints.
    pub per_page: u32,
}

impl Default for BuildkiteSettings {
    fn default() -> Self {
        Self {
            token: String::new(),
            orgname: String::new(),
            timeout: Duration::from_secs(5),
            api_url: DEFAULT_API_URL.to_string(),
            per_page: MAX_PER_PAGE,
        }
    }
}

impl std::fmt::Debug for BuildkiteSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildkiteSettings")
            .field("token", &redact(&self.token))
            .field("orgname", &self.orgname)
            .field("timeout", &self.timeout)
            .field("api_url", &self.api_url)
            .field("per_page", &self.per_page)
            .finish()
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSettings {
    /// Address on which to expose metrics and the landing page.
    pub listen_address: SocketAddr,
    /// Path under which to expose metrics.
    pub telemetry_path: String,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            listen_address: ([0, 0, 0, 0], 9209).into(),
            telemetry_path: "/metrics".to_string(),
        }
    }
}

/// Full configuration file format.
///
/// ```toml
/// [buildkite]
/// orgname = "my-org"
/// timeout = "10s"
///
/// [web]
/// listen_address = "127.0.0.1:9209"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub buildkite: BuildkiteSettings,
    #[serde(default)]
    pub web: WebSettings,
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    ///
    /// The result is not validated: command-line flags may still fill in
    /// missing values before [`ExporterConfig::new`] runs.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

/// Validated exporter configuration.
///
/// Built once in `main` and passed by reference to every component that
/// needs it.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub buildkite: BuildkiteSettings,
    pub web: WebSettings,
}

impl ExporterConfig {
    /// Validates `file` and turns it into a usable configuration.
    pub fn new(file: FileConfig) -> Result<Self, ConfigError> {
        let config = Self {
            buildkite: file.buildkite,
            web: file.web,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let bk = &self.buildkite;
        if bk.token.trim().is_empty() {
            return Err(ConfigError::MissingToken);
        }
        if bk.orgname.trim().is_empty() {
            return Err(ConfigError::MissingOrganization);
        }
        if bk.timeout.is_zero() {
            return Err(ConfigError::InvalidTimeout);
        }
        if bk.per_page == 0 || bk.per_page > MAX_PER_PAGE {
            return Err(ConfigError::InvalidPageSize(bk.per_page));
        }
        match reqwest::Url::parse(&bk.api_url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(url) => {
                return Err(ConfigError::InvalidApiUrl {
                    url: bk.api_url.clone(),
                    reason: format!("unsupported scheme {}", url.scheme()),
                })
            }
            Err(e) => {
                return Err(ConfigError::InvalidApiUrl {
                    url: bk.api_url.clone(),
                    reason: e.to_string(),
                })
            }
        }

        let path = &self.web.telemetry_path;
        if !is_valid_metrics_path(path) {
            return Err(ConfigError::InvalidMetricsPath(path.clone()));
        }
        Ok(())
    }
}

/// Paths served by the exporter itself besides the metrics path.
const RESERVED_PATHS: [&str; 2] = ["/", "/health"];

/// The metrics path must be a literal route that does not collide with the
/// landing page or health check. Segments that the router would read as
/// captures or wildcards are rejected.
fn is_valid_metrics_path(path: &str) -> bool {
    if !path.starts_with('/') || RESERVED_PATHS.contains(&path) {
        return false;
    }
    path.split('/').all(|segment| {
        !segment.starts_with(':')
            && !segment.starts_with('*')
            && !segment.contains(['{', '}'])
    })
}

fn redact(secret: &str) -> &'static str {
    if secret.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}
