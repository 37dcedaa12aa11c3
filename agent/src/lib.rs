//! Wiring for the `sentinel-agent` binary: one probe, one peer transport, one
//! consensus coordinator, and one reporter, all pinned to a single validator.

pub mod config;
pub mod consensus;
pub mod reporter;

use std::sync::Arc;

use sentinel_p2p::P2pTransport;
use sentinel_probe::{BeaconProbe, Probe, ProbeConfig, ProbeScheduler};
use tracing::info;

use crate::{config::Config, consensus::ConsensusCoordinator, reporter::Reporter};

pub struct Agent {
    probe_scheduler: Arc<ProbeScheduler>,
    transport: P2pTransport,
    reporter: Reporter,
}

impl Agent {
    pub async fn start(config: &Config) -> anyhow::Result<Self> {
        let probe: Arc<dyn Probe> = Arc::new(BeaconProbe::new(ProbeConfig {
            health_check_timeout: config.health_check_timeout(),
            health_check_retries: config.health_check_retries,
        }));

        let probe_scheduler = Arc::new(ProbeScheduler::start(
            probe.clone(),
            config.validator_id.clone(),
            config.beacon_node_url.clone(),
            config.health_check_interval(),
        ));

        let (transport, inbound) = P2pTransport::new(config.agent_id.clone(), config.validator_id.clone());
        if config.p2p_enabled {
            let bind_addr = format!("0.0.0.0:{}", config.p2p_port).parse()?;
            transport.listen(bind_addr).await?;

            let bootstrap_peers = config
                .p2p_bootstrap_peers
                .iter()
                .filter_map(|url| {
                    let host = url.host_str()?;
                    let port = url.port_or_known_default()?;
                    format!("{host}:{port}").parse().ok()
                })
                .collect::<Vec<_>>();
            info!(count = bootstrap_peers.len(), "dialing bootstrap peers");
            for addr in &bootstrap_peers {
                if let Err(error) = transport.dial(*addr).await {
                    tracing::warn!(%addr, %error, "initial bootstrap dial failed, will retry on the sweep");
                }
            }
            transport.start_reconnect_sweep(bootstrap_peers, config.p2p_discovery_interval());
        }

        let coordinator = Arc::new(ConsensusCoordinator::new(
            config.agent_id.clone(),
            config.validator_id.clone(),
            transport.clone(),
            probe.clone(),
            probe_scheduler.clone(),
            config.beacon_node_url.clone(),
        ));
        coordinator.spawn_dispatch_loop(inbound);

        let reporter = Reporter::new(
            config.backend_api_url.clone(),
            config.agent_id.clone(),
            config.agent_api_key.clone(),
            config.validator_id.clone(),
            config.max_retries,
            config.request_timeout(),
            config.consensus_timeout(),
            config.consensus_threshold,
            coordinator,
        );

        Ok(Self { probe_scheduler, transport, reporter })
    }

    /// Drives the reporter from every probe cycle until the process is asked to stop.
    pub async fn run_until_shutdown(&self) {
        let mut latest = self.probe_scheduler.subscribe();
        loop {
            if latest.changed().await.is_err() {
                break;
            }
            if let Some(result) = latest.borrow().clone() {
                self.reporter.on_probe_result(result).await;
            }
        }
    }

    pub fn shut_down(&self) {
        self.probe_scheduler.stop();
        self.transport.shut_down();
    }
}
