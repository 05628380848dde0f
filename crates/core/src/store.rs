//! Data-access session ports.
//!
//! A `DataSession` is the request-scoped handle over the domain store. The
//! handler and the fact assembler read through the same session so context
//! facts are derived from the same snapshot the caller sees.

use std::sync::Arc;

use thiserror::Error;

use crate::error::{DomainError, DomainResult};
use crate::id::{IssueId, RepositoryId, UserId};
use crate::model::{Issue, Repository, User};

/// Filter for issue lookups. Unset fields do not constrain the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IssueFilter {
    pub repo_id: Option<RepositoryId>,
    pub id: Option<IssueId>,
}

impl IssueFilter {
    pub fn in_repo(repo_id: RepositoryId) -> Self {
        Self {
            repo_id: Some(repo_id),
            id: None,
        }
    }

    pub fn by_id(id: IssueId) -> Self {
        Self {
            repo_id: None,
            id: Some(id),
        }
    }

    pub fn matches(&self, issue: &Issue) -> bool {
        self.repo_id.is_none_or(|r| issue.repo_id == r) && self.id.is_none_or(|i| issue.id == i)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(String),

    #[error("malformed row: {0}")]
    Decode(String),

    #[error("unsupported by this store: {0}")]
    Unsupported(String),
}

/// Request-scoped read access to the domain store.
#[async_trait::async_trait]
pub trait DataSession: Send + Sync {
    /// Fetch issues matching `filter`, ordered by id.
    async fn issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>, StoreError>;

    /// Fetch issues matching a trusted SQL predicate (e.g. one produced by
    /// the policy service's local filter endpoint).
    async fn issues_where(&self, predicate_sql: &str) -> Result<Vec<Issue>, StoreError>;

    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn repository(&self, id: RepositoryId) -> Result<Option<Repository>, StoreError>;
}

/// Opens one `DataSession` per inbound request.
#[async_trait::async_trait]
pub trait SessionFactory: Send + Sync {
    async fn begin(&self) -> Result<Arc<dyn DataSession>, StoreError>;
}

/// Turn an optional lookup into a result, failing with `error` when absent.
pub fn one_or<T>(found: Option<T>, error: DomainError) -> DomainResult<T> {
    found.ok_or(error)
}

pub fn one_or_not_found<T>(found: Option<T>) -> DomainResult<T> {
    one_or(found, DomainError::NotFound)
}

pub fn one_or_forbidden<T>(found: Option<T>) -> DomainResult<T> {
    one_or(found, DomainError::Forbidden)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn issue(id: i64, repo: i64) -> Issue {
        Issue {
            id: IssueId::new(id),
            title: format!("issue {id}"),
            repo_id: RepositoryId::new(repo),
            creator_id: UserId::new(1),
            closed: false,
        }
    }

    #[test]
    fn filter_constrains_only_set_fields() {
        let i = issue(7, 3);
        assert!(IssueFilter::default().matches(&i));
        assert!(IssueFilter::in_repo(RepositoryId::new(3)).matches(&i));
        assert!(!IssueFilter::in_repo(RepositoryId::new(4)).matches(&i));
        assert!(IssueFilter::by_id(IssueId::new(7)).matches(&i));
        assert!(!IssueFilter::by_id(IssueId::new(8)).matches(&i));
    }

    #[test]
    fn one_or_maps_absence_to_the_given_error() {
        assert_eq!(one_or_not_found(Some(1)), Ok(1));
        assert_eq!(one_or_not_found::<i32>(None), Err(DomainError::NotFound));
        assert_eq!(one_or_forbidden::<i32>(None), Err(DomainError::Forbidden));
        assert_eq!(
            one_or::<i32>(None, DomainError::validation("x")),
            Err(DomainError::Validation("x".into()))
        );
    }
}
