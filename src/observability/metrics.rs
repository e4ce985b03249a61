use std::net::SocketAddr;
use std::sync::Once;
use tracing::{info, warn};

static INIT: Once = Once::new();

pub const METRICS_ADDR_ENV: &str = "SEATTLE_EVENTS_METRICS_ADDR";

/// Installs a Prometheus exporter when `SEATTLE_EVENTS_METRICS_ADDR` is set.
/// Without it the `metrics` macros stay no-ops. Idempotent.
pub fn init_metrics() {
    INIT.call_once(|| {
        let Ok(addr_str) = std::env::var(METRICS_ADDR_ENV) else {
            return;
        };
        let addr: SocketAddr = match addr_str.parse() {
            Ok(addr) => addr,
            Err(e) => {
                warn!("Invalid {} '{}': {}", METRICS_ADDR_ENV, addr_str, e);
                return;
            }
        };
        match metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
        {
            Ok(()) => info!("Prometheus exporter listening at http://{}/metrics", addr),
            Err(e) => warn!("Failed to install Prometheus exporter: {}", e),
        }
    });
}
