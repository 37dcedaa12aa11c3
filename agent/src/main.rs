use clap::Parser;
use sentinel_agent::{config::Cli, Agent};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.default_log_filter())))
        .init();

    let config = cli.load()?;
    let _metrics_handle = sentinel_metrics::initialize();

    tracing::info!(agent_id = %config.agent_id, validator_id = %config.validator_id, "starting sentinel-agent");
    let agent = Agent::start(&config).await?;

    tokio::select! {
        _ = agent.run_until_shutdown() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received ctrl-c, shutting down");
        }
    }

    agent.shut_down();
    Ok(())
}
