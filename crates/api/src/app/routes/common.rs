//! Lookups and checks shared by handlers. Each returns a ready-made error
//! response so handlers can bail early.

use axum::response::Response;

use gitclub_auth::{RequestContext, ToValue};
use gitclub_core::{
    one_or_forbidden, one_or_not_found, Issue, IssueFilter, IssueId, Repository, RepositoryId,
    User, UserId,
};

use crate::app::errors;
use crate::app::services::AppServices;

pub async fn find_repository(ctx: &RequestContext, id: RepositoryId) -> Result<Repository, Response> {
    let found = ctx
        .session()
        .repository(id)
        .await
        .map_err(errors::store_error_to_response)?;
    one_or_not_found(found).map_err(errors::domain_error_to_response)
}

pub async fn find_user(ctx: &RequestContext, id: UserId) -> Result<User, Response> {
    let found = ctx
        .session()
        .user(id)
        .await
        .map_err(errors::store_error_to_response)?;
    one_or_not_found(found).map_err(errors::domain_error_to_response)
}

/// The issue `issue_id`, provided it belongs to `repo_id`.
pub async fn find_issue(
    ctx: &RequestContext,
    repo_id: RepositoryId,
    issue_id: IssueId,
) -> Result<Issue, Response> {
    let found = ctx
        .session()
        .issues(&IssueFilter {
            repo_id: Some(repo_id),
            id: Some(issue_id),
        })
        .await
        .map_err(errors::store_error_to_response)?;
    one_or_not_found(found.into_iter().next()).map_err(errors::domain_error_to_response)
}

/// Authorize or produce the 401/403/400 response.
pub async fn require<T: ToValue + ?Sized>(
    services: &AppServices,
    ctx: &RequestContext,
    action: &str,
    resource: &T,
) -> Result<(), Response> {
    match services.authz.authorize(ctx, action, resource, None).await {
        Ok(allowed) => {
            one_or_forbidden(allowed.then_some(())).map_err(errors::domain_error_to_response)
        }
        Err(e) => Err(errors::authz_error_to_response(e)),
    }
}
