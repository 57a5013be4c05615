pub mod middleware;

use tracing_error::ErrorLayer;
use tracing_log::LogTracer;
use tracing_subscriber::{prelude::*, EnvFilter};

pub const DEFAULT_FILTER: &str = "hyper=info,info";

pub fn setup_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let layer = tracing_subscriber::fmt::Layer::new().with_filter(filter);
    let registry = tracing_subscriber::registry()
        .with(ErrorLayer::default())
        .with(layer);
    if tracing::subscriber::set_global_default(registry).is_err() {
        return;
    }
    if let Err(err) = LogTracer::init() {
        tracing::warn!("Failed to forward log records: {err}");
    }
}
