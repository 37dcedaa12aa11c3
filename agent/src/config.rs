use std::time::Duration;

use clap::Parser;
use serde::Deserialize;
use url::Url;

fn default_backend_api_url() -> String {
    "http://localhost:3001".to_string()
}
fn default_beacon_node_url() -> String {
    "http://localhost:5052".to_string()
}
fn default_health_check_interval_ms() -> u64 {
    30_000
}
fn default_health_check_timeout_ms() -> u64 {
    10_000
}
fn default_health_check_retries() -> u32 {
    3
}
fn default_p2p_enabled() -> bool {
    false
}
fn default_p2p_port() -> u16 {
    3003
}
fn default_p2p_discovery_interval_ms() -> u64 {
    60_000
}
fn default_consensus_threshold() -> usize {
    2
}
fn default_consensus_timeout_ms() -> u64 {
    120_000
}
fn default_request_timeout_ms() -> u64 {
    10_000
}
fn default_max_retries() -> u32 {
    3
}

/// The agent's full configuration. Deserialized
/// from a TOML file and overlaid with environment variables / CLI flags — the file
/// supplies the defaults a fresh deployment doesn't want to repeat per-process,
/// the environment and CLI cover the fields that vary per-process (`agentId`, the
/// bootstrap peer list).
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    pub agent_id: String,
    pub agent_api_key: String,
    pub validator_id: String,
    #[serde(default = "default_backend_api_url")]
    pub backend_api_url: String,
    #[serde(default = "default_beacon_node_url")]
    pub beacon_node_url: String,
    #[serde(default = "default_health_check_interval_ms")]
    pub health_check_interval_ms: u64,
    #[serde(default = "default_health_check_timeout_ms")]
    pub health_check_timeout_ms: u64,
    #[serde(default = "default_health_check_retries")]
    pub health_check_retries: u32,
    #[serde(default = "default_p2p_enabled")]
    pub p2p_enabled: bool,
    #[serde(default = "default_p2p_port")]
    pub p2p_port: u16,
    #[serde(default = "default_p2p_discovery_interval_ms")]
    pub p2p_discovery_interval_ms: u64,
    #[serde(default)]
    pub p2p_bootstrap_peers: Vec<Url>,
    #[serde(default = "default_consensus_threshold")]
    pub consensus_threshold: usize,
    #[serde(default = "default_consensus_timeout_ms")]
    pub consensus_timeout_ms: u64,
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Config {
    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }
    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_millis(self.health_check_timeout_ms)
    }
    pub fn p2p_discovery_interval(&self) -> Duration {
        Duration::from_millis(self.p2p_discovery_interval_ms)
    }
    pub fn consensus_timeout(&self) -> Duration {
        Duration::from_millis(self.consensus_timeout_ms)
    }
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Command-line entry point. A `--config` file supplies the bulk of the settings;
/// the handful of flags below let an operator override individual fields without
/// editing the file.
#[derive(Parser, Debug)]
#[command(name = "sentinel-agent", version, about = "Sentinel validator health agent")]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, env = "SENTINEL_AGENT_CONFIG")]
    pub config: Option<std::path::PathBuf>,

    #[arg(long, env = "AGENT_ID")]
    pub agent_id: Option<String>,

    #[arg(long, env = "AGENT_API_KEY")]
    pub agent_api_key: Option<String>,

    #[arg(long, env = "VALIDATOR_ID")]
    pub validator_id: Option<String>,

    #[arg(long, env = "BACKEND_API_URL")]
    pub backend_api_url: Option<String>,

    #[arg(long, env = "BEACON_NODE_URL")]
    pub beacon_node_url: Option<String>,

    /// Verbosity when `RUST_LOG` is unset: `-v` = debug, `-vv` = trace.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Loads the base config from `--config`/`SENTINEL_AGENT_CONFIG` if present,
    /// then applies any CLI/env overrides on top.
    pub fn load(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .map_err(|error| anyhow::anyhow!("failed to read {}: {error}", path.display()))?;
                toml::from_str(&contents)?
            }
            None => Config {
                agent_id: String::new(),
                agent_api_key: String::new(),
                validator_id: String::new(),
                backend_api_url: default_backend_api_url(),
                beacon_node_url: default_beacon_node_url(),
                health_check_interval_ms: default_health_check_interval_ms(),
                health_check_timeout_ms: default_health_check_timeout_ms(),
                health_check_retries: default_health_check_retries(),
                p2p_enabled: default_p2p_enabled(),
                p2p_port: default_p2p_port(),
                p2p_discovery_interval_ms: default_p2p_discovery_interval_ms(),
                p2p_bootstrap_peers: Vec::new(),
                consensus_threshold: default_consensus_threshold(),
                consensus_timeout_ms: default_consensus_timeout_ms(),
                request_timeout_ms: default_request_timeout_ms(),
                max_retries: default_max_retries(),
            },
        };

        if let Some(agent_id) = &self.agent_id {
            config.agent_id = agent_id.clone();
        }
        if let Some(agent_api_key) = &self.agent_api_key {
            config.agent_api_key = agent_api_key.clone();
        }
        if let Some(validator_id) = &self.validator_id {
            config.validator_id = validator_id.clone();
        }
        if let Some(backend_api_url) = &self.backend_api_url {
            config.backend_api_url = backend_api_url.clone();
        }
        if let Some(beacon_node_url) = &self.beacon_node_url {
            config.beacon_node_url = beacon_node_url.clone();
        }

        anyhow::ensure!(!config.agent_id.is_empty(), "agentId is required");
        anyhow::ensure!(!config.agent_api_key.is_empty(), "agentApiKey is required");
        anyhow::ensure!(!config.validator_id.is_empty(), "validatorId is required");

        Ok(config)
    }

    /// Maps `-v`/`-vv` to a default `tracing` filter, used only when `RUST_LOG` is unset.
    pub fn default_log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
