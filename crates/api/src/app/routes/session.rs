use std::sync::Arc;

use axum::{
    extract::Extension,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{Duration, Utc};

use gitclub_auth::{entity_value, mint_actor_token, RequestContext};
use gitclub_core::{DomainError, UserId};

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

const SESSION_TTL_HOURS: i64 = 8;

/// The signed-in user, or `null`.
pub async fn show(Extension(ctx): Extension<RequestContext>) -> Response {
    let Some(actor) = ctx.actor() else {
        return Json(None::<dto::UserResponse>).into_response();
    };
    match ctx.session().user(actor).await {
        Ok(user) => Json(user.map(dto::UserResponse::from)).into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

/// Sign in as an existing user.
pub async fn create(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<dto::CreateSessionRequest>,
) -> Response {
    let Some(id) = body.id else {
        return errors::domain_error_to_response(DomainError::validation("id is required"));
    };

    let user = match common::find_user(&ctx, UserId::new(id)).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let now = Utc::now();
    let token = match services
        .jwt
        .issue(user.id, now, Duration::hours(SESSION_TTL_HOURS))
    {
        Ok(token) => token,
        Err(e) => return errors::authz_error_to_response(e.into()),
    };

    let actor_token = match &services.actor_root_secret {
        Some(secret) => match mint_actor_token(secret.as_bytes(), &entity_value(&user), now) {
            Ok(token) => Some(token),
            Err(e) => return errors::authz_error_to_response(e.into()),
        },
        None => None,
    };

    tracing::info!(request_id = %ctx.request_id(), user_id = %user.id, "session created");

    (
        StatusCode::CREATED,
        Json(dto::SessionResponse {
            user: user.into(),
            token,
            actor_token,
        }),
    )
        .into_response()
}

/// Sign out. Session tokens are stateless; the client discards its copy.
pub async fn destroy() -> StatusCode {
    StatusCode::NO_CONTENT
}
