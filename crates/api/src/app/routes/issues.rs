use std::collections::HashSet;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    response::{IntoResponse, Response},
    Json,
};

use gitclub_auth::RequestContext;
use gitclub_core::{Entity, Issue, IssueFilter, IssueId, RepositoryId};

use crate::app::routes::common;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

/// Issues of one repository the caller may read. Anonymous callers get `[]`.
pub async fn list_in_repo(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(repo_id): Path<i64>,
) -> Response {
    let repo_id = RepositoryId::new(repo_id);

    let ids = match services
        .authz
        .list_resources(&ctx, "read", Issue::KIND, Some(repo_id))
        .await
    {
        Ok(ids) => ids,
        Err(e) => return errors::authz_error_to_response(e),
    };
    let permitted: HashSet<IssueId> = ids
        .iter()
        .filter_map(|raw| match raw.parse::<IssueId>() {
            Ok(id) => Some(id),
            Err(e) => {
                tracing::warn!(request_id = %ctx.request_id(), raw = %raw, error = %e, "ignoring malformed issue id from policy service");
                None
            }
        })
        .collect();
    if permitted.is_empty() {
        return Json(Vec::<dto::IssueResponse>::new()).into_response();
    }

    let issues = match ctx.session().issues(&IssueFilter::in_repo(repo_id)).await {
        Ok(issues) => issues,
        Err(e) => return errors::store_error_to_response(e),
    };

    Json(
        issues
            .into_iter()
            .filter(|i| permitted.contains(&i.id))
            .map(dto::IssueResponse::from)
            .collect::<Vec<_>>(),
    )
    .into_response()
}

/// Every issue the caller may read, filtered in the database.
pub async fn list_filtered(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> Response {
    let filter = match services.authz.list_query(&ctx, "read", Issue::KIND).await {
        Ok(filter) => filter,
        Err(e) => return errors::authz_error_to_response(e),
    };

    match ctx.session().issues_where(filter.sql()).await {
        Ok(issues) => Json(
            issues
                .into_iter()
                .map(dto::IssueResponse::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn show(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path((repo_id, issue_id)): Path<(i64, i64)>,
) -> Response {
    let issue = match common::find_issue(&ctx, RepositoryId::new(repo_id), IssueId::new(issue_id)).await {
        Ok(issue) => issue,
        Err(resp) => return resp,
    };

    if let Err(resp) = common::require(&services, &ctx, "read", &issue).await {
        return resp;
    }

    Json(dto::IssueResponse::from(issue)).into_response()
}

pub async fn actions(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path((repo_id, issue_id)): Path<(i64, i64)>,
) -> Response {
    let issue = match common::find_issue(&ctx, RepositoryId::new(repo_id), IssueId::new(issue_id)).await {
        Ok(issue) => issue,
        Err(resp) => return resp,
    };

    match services.authz.actions(&ctx, &issue, None).await {
        Ok(actions) => Json(dto::ActionsResponse { actions }).into_response(),
        Err(e) => errors::authz_error_to_response(e),
    }
}
