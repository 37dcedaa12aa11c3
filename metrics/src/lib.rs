//! Metric name constants and Prometheus recorder setup for the Sentinel core.
//!
//! Consolidates what some workspaces split across two near-identical crates (a
//! top-level `metrics` crate and a `node-metrics` crate) into one: there is only
//! ever one metrics recorder per process here, so the split bought nothing.

pub mod names;

pub use metrics_exporter_prometheus::PrometheusHandle;
use metrics_exporter_prometheus::PrometheusBuilder;

/// Registers every known metric name and installs the global Prometheus recorder,
/// returning a [`PrometheusHandle`] a caller can render on demand (e.g. behind the
/// collector's `GET /metrics` route) rather than the recorder spawning its own
/// listener. Call this once, near the top of each binary's `main`. Returns `None`
/// if installation fails; callers should treat metrics as best-effort.
pub fn initialize() -> Option<PrometheusHandle> {
    let handle = match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => handle,
        Err(error) => {
            tracing::warn!(%error, "failed to install the Prometheus metrics recorder");
            return None;
        }
    };

    for name in names::GAUGE_NAMES {
        metrics::register_gauge!(name);
    }
    for name in names::COUNTER_NAMES {
        metrics::register_counter!(name);
    }
    for name in names::HISTOGRAM_NAMES {
        metrics::register_histogram!(name);
    }

    Some(handle)
}
