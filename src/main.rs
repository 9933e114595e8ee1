//! Buildkite exporter binary.
//!
//! Parses flags, builds the API client and collector, then serves the
//! metrics endpoint until interrupted.

use buildkite_exporter::{
    cli::Cli, client::HttpClient, metrics::Exporter, Error, MetricsRegistry, MetricsServer,
};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{error, info};

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    if let Err(e) = run(Cli::parse()) {
        error!(error = %e, "Exporter failed");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Error> {
    let config = cli.into_config()?;

    info!("Starting buildkite_exporter v{}", buildkite_exporter::VERSION);
    info!(
        org = %config.buildkite.orgname,
        api_url = %config.buildkite.api_url,
        timeout = ?config.buildkite.timeout,
        "Configured Buildkite client"
    );

    // The blocking client must be created outside the async runtime.
    let client = HttpClient::new(&config.buildkite)?;
    let exporter = Exporter::new(Arc::new(client), config.buildkite.orgname.clone())?;
    let registry = Arc::new(MetricsRegistry::new(exporter)?);

    let shutdown = Arc::new(Notify::new());
    let notify = Arc::clone(&shutdown);
    ctrlc::set_handler(move || {
        info!("Shutdown requested");
        notify.notify_one();
    })?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(Error::Runtime)?;

    let server = MetricsServer::new(config.web.clone(), Arc::clone(&registry));
    runtime.block_on(server.run(async move { shutdown.notified().await }))?;
    drop(runtime);

    info!("Done");
    Ok(())
}
