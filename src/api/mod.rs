/// API routes and handlers
pub mod celebrations;
pub mod digest;
pub mod events;
pub mod health;
pub mod middleware;
pub mod people;
pub mod users;

use crate::context::AppContext;
use axum::Router;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(users::routes())
        .merge(people::routes())
        .merge(celebrations::routes())
        .merge(events::routes())
        .merge(digest::routes())
}
