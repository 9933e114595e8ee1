//! Command-line interface.
//!
//! Flags use the dotted `buildkite.*` / `web.*` naming common to Prometheus
//! exporters. Every flag is optional; unset flags fall back to the config
//! file and then to defaults.

use crate::config::{ConfigError, ExporterConfig, FileConfig};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Prometheus exporter for Buildkite builds and agents.
#[derive(Debug, Parser)]
#[command(name = "buildkite-exporter", version, about)]
pub struct Cli {
    /// TOML configuration file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Buildkite API token.
    #[arg(long = "buildkite.token", env = "BUILDKITE_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Buildkite organization name.
    #[arg(long = "buildkite.orgname", env = "BUILDKITE_ORGNAME")]
    pub orgname: Option<String>,

    /// Timeout on HTTP requests to the Buildkite API (e.g. "5s", "750ms").
    #[arg(long = "buildkite.timeout", value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Base URL of the Buildkite REST API.
    #[arg(long = "buildkite.api-url")]
    pub api_url: Option<String>,

    /// Page size requested from list endpoints.
    #[arg(long = "buildkite.per-page")]
    pub per_page: Option<u32>,

    /// Address on which to expose metrics and web interface.
    #[arg(long = "web.listen-address")]
    pub listen_address: Option<SocketAddr>,

    /// Path under which to expose metrics.
    #[arg(long = "web.telemetry-path")]
    pub telemetry_path: Option<String>,
}

impl Cli {
    /// Merges flags over the config file (if any) and validates the result.
    pub fn into_config(self) -> Result<ExporterConfig, ConfigError> {
        let file = match &self.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };
        ExporterConfig::new(self.apply(file))
    }

    fn apply(self, mut file: FileConfig) -> FileConfig {
        let bk = &mut file.buildkite;
        if let Some(token) = self.token {
            bk.token = token;
        }
        if let Some(orgname) = self.orgname {
            bk.orgname = orgname;
        }
        if let Some(timeout) = self.timeout {
            bk.timeout = timeout;
        }
        if let Some(api_url) = self.api_url {
            bk.api_url = api_url;
        }
        if let Some(per_page) = self.per_page {
            bk.per_page = per_page;
        }

        let web = &mut file.web;
        if let Some(addr) = self.listen_address {
            web.listen_address = addr;
        }
        if let Some(path) = self.telemetry_path {
            web.telemetry_path = path;
        }
        file
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("buildkite-exporter").chain(args.iter().copied()))
            .unwrap()
    }

    #[test]
    fn test_flags_override_file() {
        let cli = parse(&[
            "--buildkite.orgname",
            "cli-org",
            "--buildkite.timeout",
            "750ms",
            "--web.telemetry-path",
            "/bk",
        ]);

        let mut file = FileConfig::default();
        file.buildkite.orgname = "file-org".to_string();
        file.buildkite.token = "file-token".to_string();

        let merged = cli.apply(file);
        assert_eq!(merged.buildkite.orgname, "cli-org");
        assert_eq!(merged.buildkite.api_url, crate::config::DEFAULT_API_URL);
        assert_eq!(merged.buildkite.timeout, Duration::from_millis(750));
        assert_eq!(merged.web.telemetry_path, "/bk");
        assert_eq!(merged.web.listen_address.port(), 9209);
    }

    #[test]
    fn test_listen_address_flag() {
        let cli = parse(&["--web.listen-address", "127.0.0.1:9300"]);
        let merged = cli.apply(FileConfig::default());
        assert_eq!(merged.web.listen_address, "127.0.0.1:9300".parse().unwrap());
    }

    #[test]
    fn test_bad_timeout_rejected() {
        let result = Cli::try_parse_from(["buildkite-exporter", "--buildkite.timeout", "soon"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_all_flags_validate() {
        let cli = parse(&[
            "--buildkite.token",
            "abc",
            "--buildkite.orgname",
            "acme",
            "--buildkite.per-page",
            "50",
        ]);
        let config = cli.into_config().unwrap();
        assert_eq!(config.buildkite.per_page, 50);
    }
}
