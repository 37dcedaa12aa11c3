//! Collector process configuration and CLI entry point.

use clap::Parser;
use serde::Deserialize;

fn default_bind_addr() -> String {
    "0.0.0.0:3001".to_string()
}

/// The collector's configuration. Unlike the agent, the collector has no named
/// option table of its own documented elsewhere — this mirrors the agent's
/// config shape (TOML file + env/CLI overlay) for the bind address and the seed
/// file that stands in for the external validator/agent CRUD system.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
    /// Path to a TOML file seeding the in-memory validator/agent registry
    /// (`[[validators]]` / `[[agents]]` tables). Optional: a collector can start
    /// with an empty registry and have entries added by the out-of-scope CRUD
    /// system through `Registry` trait implementers other than the in-memory one.
    #[serde(default)]
    pub seed_file: Option<std::path::PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self { bind_addr: default_bind_addr(), seed_file: None }
    }
}

#[derive(Parser, Debug)]
#[command(name = "sentinel-collector", version, about = "Sentinel consensus collector")]
pub struct Cli {
    /// Path to a TOML configuration file.
    #[arg(long, env = "SENTINEL_COLLECTOR_CONFIG")]
    pub config: Option<std::path::PathBuf>,

    #[arg(long, env = "BIND_ADDR")]
    pub bind_addr: Option<String>,

    #[arg(long, env = "SEED_FILE")]
    pub seed_file: Option<std::path::PathBuf>,

    /// Verbosity when `RUST_LOG` is unset: `-v` = debug, `-vv` = trace.
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn load(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .map_err(|error| anyhow::anyhow!("failed to read {}: {error}", path.display()))?;
                toml::from_str(&contents)?
            }
            None => Config::default(),
        };

        if let Some(bind_addr) = &self.bind_addr {
            config.bind_addr = bind_addr.clone();
        }
        if let Some(seed_file) = &self.seed_file {
            config.seed_file = Some(seed_file.clone());
        }

        Ok(config)
    }

    pub fn default_log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

/// The `[[validators]]` / `[[agents]]` seed file shape, loaded at startup to
/// populate [`crate::registry::InMemoryRegistry`].
#[derive(Clone, Debug, Deserialize, Default)]
pub struct SeedFile {
    #[serde(default)]
    pub validators: Vec<sentinel_types::Validator>,
    #[serde(default)]
    pub agents: Vec<SeedAgent>,
    #[serde(default)]
    pub webhooks: Vec<sentinel_types::WebhookConfig>,
}

/// An agent entry in the seed file. `last_seen` is not part of the file format —
/// every seeded agent starts with `last_seen = now`, same as a freshly-registered
/// agent would via the out-of-scope CRUD system.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedAgent {
    pub id: sentinel_types::AgentId,
    pub validator_id: sentinel_types::ValidatorId,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
}

fn default_is_active() -> bool {
    true
}

impl From<SeedAgent> for sentinel_types::Agent {
    fn from(seed: SeedAgent) -> Self {
        Self { id: seed.id, validator_id: seed.validator_id, is_active: seed.is_active, last_seen: time::OffsetDateTime::now_utc() }
    }
}
