use axum::Router;

use crate::{AccessoryState, RefreshEngine};

mod air_quality;
mod health;

// ---

/// Shared state handed to every handler.
pub type AppState = (RefreshEngine, AccessoryState);

pub fn router(engine: RefreshEngine, accessory: AccessoryState) -> Router {
    // ---
    Router::new()
        .merge(air_quality::router())
        .merge(health::router())
        .with_state((engine, accessory))
}
