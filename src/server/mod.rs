pub mod metrics_api;

pub use metrics_api::{get_metrics, router, serve, shutdown_signal};
