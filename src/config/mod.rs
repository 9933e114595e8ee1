//! Exporter configuration.
//!
//! Configuration is assembled once at startup from defaults, an optional
//! TOML file and command-line flags, validated, and then handed to the
//! API client, the collector and the HTTP server by reference. Nothing
//! is reconfigured at runtime.

mod settings;

pub use settings::{
    BuildkiteSettings, ConfigError, ExporterConfig, FileConfig, WebSettings, DEFAULT_API_URL,
};
