use axum::{routing::get, Router};

pub mod common;
pub mod issues;
pub mod roles;
pub mod session;
pub mod system;

/// Router for every endpoint that runs inside a request context.
pub fn router() -> Router {
    Router::new()
        .route(
            "/session",
            get(session::show).post(session::create).delete(session::destroy),
        )
        .route("/issues", get(issues::list_filtered))
        .nest("/repos", repos())
}

fn repos() -> Router {
    Router::new()
        .route("/:repo_id/issues", get(issues::list_in_repo))
        .route("/:repo_id/issues/:issue_id", get(issues::show))
        .route("/:repo_id/issues/:issue_id/actions", get(issues::actions))
        .route("/:repo_id/roles", get(roles::list).post(roles::assign))
}
