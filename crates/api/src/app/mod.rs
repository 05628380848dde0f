//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: policy client, authorizer, domain store
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (public entrypoint used by `main.rs` and tests).
pub fn build_app(services: Arc<AppServices>) -> Router {
    let context_state = middleware::ContextState {
        jwt: services.jwt.clone(),
        sessions: services.sessions.clone(),
    };

    // Every routed request gets a RequestContext (possibly anonymous).
    let routed = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            context_state,
            middleware::context_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(routed)
        .layer(ServiceBuilder::new())
}
