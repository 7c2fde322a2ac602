//! Unified API router.
//!
//! Combines the endpoints from all feature modules under `/api`.

use axum::Router;
use std::sync::Arc;

use crate::shared::state::AppState;

pub fn configure_api_routes() -> Router<Arc<AppState>> {
    let api = Router::new()
        .merge(crate::tasks::configure())
        .merge(crate::project::configure())
        .merge(crate::directory::configure())
        .merge(crate::chat::configure())
        .merge(crate::session::configure());

    Router::new().nest("/api", api)
}
