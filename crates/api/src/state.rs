use std::sync::Arc;

use fundbridge_engine::FundingEngine;

use crate::config::ServerConfig;

/// Shared application state available to all handlers via `State<AppState<S>>`.
///
/// `S` is the store behind the engine: `PgStore` in production, `MemoryStore`
/// in the integration tests. Cheap to clone.
#[derive(Clone)]
pub struct AppState<S> {
    pub engine: FundingEngine<S>,
    pub config: Arc<ServerConfig>,
}
