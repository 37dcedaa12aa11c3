//! Wiring for the `sentinel-collector` binary: ingress, aggregator,
//! broadcaster, and webhook dispatcher behind one `axum::Router`.

pub mod aggregator;
pub mod broadcaster;
pub mod config;
pub mod ingress;
pub mod registry;
pub mod store;
pub mod webhook;
pub mod ws;

use std::sync::Arc;

use axum::{
    http::Method,
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    aggregator::Aggregator,
    broadcaster::Broadcaster,
    config::{Config, SeedFile},
    registry::{InMemoryRegistry, Registry},
    store::{AlertStore, ReportStore, WebhookConfigStore},
    webhook::{BoundWebhookDispatcher, WebhookDispatcher},
};

/// Shared state threaded through every axum handler — no process-wide
/// singletons; everything the handlers need is a field here.
pub struct AppState {
    pub registry: Arc<dyn Registry>,
    pub reports: Arc<ReportStore>,
    pub alerts: Arc<AlertStore>,
    pub aggregator: Arc<Aggregator>,
    pub broadcaster: Arc<Broadcaster>,
    pub webhook_configs: Arc<WebhookConfigStore>,
    pub webhooks: Arc<WebhookDispatcher>,
    pub metrics_handle: Option<sentinel_metrics::PrometheusHandle>,
}

/// Builds an [`AppState`] and spawns its aging sweep, without binding a socket.
/// Shared by [`Collector::start`] and by black-box tests that drive the router
/// with `tower::ServiceExt::oneshot` instead of a real TCP listener.
pub fn assemble(
    registry: Arc<dyn Registry>,
    webhook_configs: Arc<WebhookConfigStore>,
    metrics_handle: Option<sentinel_metrics::PrometheusHandle>,
) -> (Arc<AppState>, tokio::task::JoinHandle<()>) {
    let reports = Arc::new(ReportStore::default());
    let alerts = Arc::new(AlertStore::default());
    let broadcaster = Arc::new(Broadcaster::new());
    let webhooks = Arc::new(WebhookDispatcher::new());
    let bound_webhooks = Arc::new(BoundWebhookDispatcher::new(webhooks.clone(), webhook_configs.clone()));
    let aggregator = Arc::new(Aggregator::new(reports.clone(), alerts.clone(), broadcaster.clone(), bound_webhooks));

    let state = Arc::new(AppState {
        registry,
        reports,
        alerts,
        aggregator: aggregator.clone(),
        broadcaster,
        webhook_configs,
        webhooks,
        metrics_handle,
    });
    let aging_sweep = aggregator::spawn_aging_sweep(aggregator);

    (state, aging_sweep)
}

/// The `axum::Router` serving the collector's exposed endpoints, layered with a
/// `TraceLayer` and permissive CORS.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new().allow_origin(Any).allow_methods([Method::GET, Method::POST]);

    Router::new()
        .route("/api/report", post(ingress::submit_report))
        .route("/api/webhooks/:id/test", post(ingress::test_webhook))
        .route("/health", get(ingress::health))
        .route("/metrics", get(ingress::metrics_endpoint))
        .route("/ws", get(ws::upgrade))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

/// Everything [`Collector::start`] needs to hand a freshly-seeded registry and
/// webhook config store to the aggregator before the server accepts traffic.
pub struct Collector {
    pub state: Arc<AppState>,
    aging_sweep: tokio::task::JoinHandle<()>,
    server: tokio::task::JoinHandle<()>,
}

impl Collector {
    pub async fn start(config: &Config, metrics_handle: Option<sentinel_metrics::PrometheusHandle>) -> anyhow::Result<Self> {
        let registry = Arc::new(InMemoryRegistry::new());
        let webhook_configs = Arc::new(WebhookConfigStore::default());

        if let Some(seed_path) = &config.seed_file {
            let contents = std::fs::read_to_string(seed_path)
                .map_err(|error| anyhow::anyhow!("failed to read {}: {error}", seed_path.display()))?;
            let seed: SeedFile = toml::from_str(&contents)?;
            for validator in seed.validators {
                registry.insert_validator(validator);
            }
            for agent in seed.agents {
                registry.insert_agent(agent.into());
            }
            for webhook in seed.webhooks {
                webhook_configs.insert(webhook);
            }
        }

        let (state, aging_sweep) = assemble(registry, webhook_configs, metrics_handle);

        let router = router(state.clone());
        let bind_addr: std::net::SocketAddr = config.bind_addr.parse()?;
        let listener = tokio::net::TcpListener::bind(bind_addr).await?;
        tracing::info!(%bind_addr, "sentinel-collector listening");
        let server = tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, router).await {
                tracing::error!(%error, "collector server exited with an error");
            }
        });

        Ok(Self { state, aging_sweep, server })
    }

    /// Runs until the process receives ctrl-c or the server task exits on its own,
    /// then performs graceful shutdown: stop the aging sweep, abort the server
    /// task. In-flight webhook deliveries are not awaited past this point.
    pub async fn run_until_shutdown(self) {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("received ctrl-c, shutting down");
            }
            _ = self.server => {}
        }
        self.aging_sweep.abort();
    }
}
