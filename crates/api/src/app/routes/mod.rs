use axum::{Router, routing::get};

pub mod auth;
pub mod dashboard;
pub mod equipments;
pub mod locations;
pub mod stock;
pub mod system;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/dashboard", get(dashboard::dashboard))
        .nest("/stock", stock::router())
        .merge(locations::router())
        .merge(equipments::router())
}
