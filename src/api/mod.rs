/// API routes and handlers
pub mod events;
pub mod health;
pub mod names;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(names::routes())
        .merge(events::routes())
}
