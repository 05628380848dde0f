use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use gitclub_auth::facts::HAS_ROLE;
use gitclub_auth::{BulkFact, RequestContext, Value};
use gitclub_core::{DomainError, Entity, RepositoryId, User, UserId};

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// Current role assignments on a repository.
pub async fn list(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(repo_id): Path<i64>,
) -> Response {
    let repo = match common::find_repository(&ctx, RepositoryId::new(repo_id)).await {
        Ok(repo) => repo,
        Err(resp) => return resp,
    };
    if let Err(resp) = common::require(&services, &ctx, "read", &repo).await {
        return resp;
    }

    let facts = match services
        .authz
        .get(HAS_ROLE, &[&Value::of_kind(User::KIND), &None::<String>, &repo])
        .await
    {
        Ok(facts) => facts,
        Err(e) => return errors::authz_error_to_response(e),
    };

    let assignments: Vec<dto::RoleAssignmentResponse> = facts
        .iter()
        .filter_map(|fact| match fact.args.as_slice() {
            [user, role, _] => Some(dto::RoleAssignmentResponse {
                user_id: user.id()?.to_string(),
                role: role.id()?.to_string(),
            }),
            _ => None,
        })
        .collect();
    Json(assignments).into_response()
}

/// Replace a user's role on a repository in one batch.
pub async fn assign(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(repo_id): Path<i64>,
    Json(body): Json<dto::RoleAssignmentRequest>,
) -> Response {
    let role = body.role.trim();
    if role.is_empty() {
        return errors::domain_error_to_response(DomainError::validation("role is required"));
    }

    let repo = match common::find_repository(&ctx, RepositoryId::new(repo_id)).await {
        Ok(repo) => repo,
        Err(resp) => return resp,
    };
    if let Err(resp) = common::require(&services, &ctx, "manage_members", &repo).await {
        return resp;
    }
    let user = match common::find_user(&ctx, UserId::new(body.user_id)).await {
        Ok(user) => user,
        Err(resp) => return resp,
    };

    let delete = [BulkFact::new(HAS_ROLE)
        .arg(&user)
        .arg(&None::<String>)
        .arg(&repo)];
    let insert = [BulkFact::new(HAS_ROLE).arg(&user).arg(role).arg(&repo)];

    if let Err(e) = services.authz.bulk_update(&delete, &insert).await {
        return errors::authz_error_to_response(e);
    }

    (
        StatusCode::CREATED,
        Json(dto::RoleAssignmentResponse {
            user_id: user.id.to_string(),
            role: role.to_string(),
        }),
    )
        .into_response()
}
