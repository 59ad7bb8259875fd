use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use brain_core::config::Config;
use brain_devices::registry::DeviceRegistry;
use brain_runtime::BrainCore;

/// Shared state handed to every Axum handler. The Scheduler and Summarizer
/// run as independent background tasks against the same `core`/`devices`
/// handles rather than living in this struct — neither is reachable from an
/// HTTP route.
pub struct AppState {
    pub config: Config,
    pub core: Arc<BrainCore>,
    pub devices: Arc<DeviceRegistry>,
}

/// Assemble the full Axum router — a single `/ws` device transport route,
/// since HTTP handlers and auth middleware are both out of scope here.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/ws", get(crate::ws::ws_handler))
        .with_state(state)
}
