use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use gitclub_auth::{JwtValidator, RequestContext};
use gitclub_core::SessionFactory;

use crate::app::errors;
use crate::context::request_id_from;

/// Sign-in and sign-out accept requests carrying an unusable token.
const SESSION_PATH: &str = "/session";

#[derive(Clone)]
pub struct ContextState {
    pub jwt: Arc<dyn JwtValidator>,
    pub sessions: Arc<dyn SessionFactory>,
}

/// Build the request's [`RequestContext`] and insert it as an extension.
///
/// A missing bearer token yields an anonymous context; a present but invalid
/// one is rejected with 401, except on `/session`, where it is ignored so a
/// client holding a stale token can still sign in. One data session is opened
/// per request and shared by the handler and fact assembly.
pub async fn context_middleware(
    State(state): State<ContextState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let request_id = request_id_from(req.headers());
    let lenient = req.uri().path() == SESSION_PATH;

    let actor = match extract_bearer(req.headers()) {
        Ok(None) => None,
        Ok(Some(token)) => match state.jwt.validate(token, Utc::now()) {
            Ok(claims) => Some(claims.sub),
            Err(e) if lenient => {
                tracing::debug!(%request_id, error = %e, "ignoring session token");
                None
            }
            Err(e) => {
                tracing::debug!(%request_id, error = %e, "rejecting session token");
                return errors::json_error(
                    StatusCode::UNAUTHORIZED,
                    "unauthenticated",
                    "invalid session token",
                );
            }
        },
        Err(_) if lenient => None,
        Err(status) => {
            return errors::json_error(status, "unauthenticated", "malformed authorization header");
        }
    };

    let session = match state.sessions.begin().await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(%request_id, error = %e, "cannot open data session");
            return errors::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "store_error",
                e.to_string(),
            );
        }
    };

    let ctx = match actor {
        Some(user) => RequestContext::authenticated(user, request_id, session),
        None => RequestContext::anonymous(request_id, session),
    };
    req.extensions_mut().insert(ctx);

    let mut response = next.run(req).await;
    if let Ok(value) = request_id.to_string().parse() {
        response
            .headers_mut()
            .insert(crate::context::REQUEST_ID_HEADER, value);
    }
    response
}

fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>, StatusCode> {
    let Some(header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(Some(token))
}
