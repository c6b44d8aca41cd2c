//! HTTP routes (one file per resource).

use axum::{Router, routing::get};

pub mod orders;
pub mod products;
pub mod system;
pub mod variants;

/// Protected routes (require a bearer token).
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/products", products::router())
        .nest("/variants", variants::router())
        .nest("/orders", orders::router())
}
