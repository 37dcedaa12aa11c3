use clap::Parser;
use sentinel_collector::{config::Cli, Collector};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.default_log_filter())))
        .init();

    let config = cli.load()?;
    let metrics_handle = sentinel_metrics::initialize();

    tracing::info!(bind_addr = %config.bind_addr, "starting sentinel-collector");
    let collector = Collector::start(&config, metrics_handle).await?;
    collector.run_until_shutdown().await;

    Ok(())
}
