//! Context fact assembly.
//!
//! The policy service's durable store does not hold hierarchy data that
//! changes with the domain (issue containment, issue creators, closed flags),
//! so every decision about such a resource ships those facts alongside the
//! request. A [`FactRegistry`] maps a resource kind to the strategy that
//! derives them; unregistered kinds get no context facts.

use std::collections::HashMap;
use std::sync::Arc;

use gitclub_core::{DataSession, Entity, Issue, IssueFilter, IssueId, Repository, RepositoryId, User};

use crate::error::AuthzError;
use crate::fact::Fact;
use crate::value::Value;

pub const IN_REPO_CONTEXT: &str = "in_repo_context";
pub const HAS_RELATION: &str = "has_relation";
pub const HAS_ROLE: &str = "has_role";
pub const IS_CLOSED: &str = "is_closed";

/// Derives context facts for one resource kind.
#[async_trait::async_trait]
pub trait FactStrategy: Send + Sync {
    /// Listing instances of this kind is only meaningful inside a container.
    fn requires_parent(&self) -> bool {
        false
    }

    /// Derive facts. At least one of `parent` / `instance` is set.
    async fn derive(
        &self,
        session: &dyn DataSession,
        parent: Option<&str>,
        instance: Option<&str>,
    ) -> Result<Vec<Fact>, AuthzError>;
}

/// Issues: containment in a repository, creator role, closed flag.
#[derive(Debug, Default, Clone, Copy)]
pub struct IssueFacts;

impl IssueFacts {
    fn facts_for_issue(issue: &Issue) -> Vec<Fact> {
        let resource = Value::new(Issue::KIND, issue.id.to_string());
        let parent = Value::new(Repository::KIND, issue.repo_id.to_string());
        let creator = Value::new(User::KIND, issue.creator_id.to_string());

        let mut facts = vec![
            Fact::new(
                HAS_RELATION,
                vec![resource.clone(), Value::string("repository"), parent],
            ),
            Fact::new(
                HAS_ROLE,
                vec![creator, Value::string("creator"), resource.clone()],
            ),
        ];
        if issue.closed {
            facts.push(Fact::new(IS_CLOSED, vec![resource]));
        }
        facts
    }
}

#[async_trait::async_trait]
impl FactStrategy for IssueFacts {
    fn requires_parent(&self) -> bool {
        true
    }

    async fn derive(
        &self,
        session: &dyn DataSession,
        parent: Option<&str>,
        instance: Option<&str>,
    ) -> Result<Vec<Fact>, AuthzError> {
        let repo_id = parent.map(parse_id::<RepositoryId>).transpose()?;
        let issue_id = instance.map(parse_id::<IssueId>).transpose()?;

        // A known container means "evaluate as if listing within it".
        if let Some(repo_id) = repo_id {
            return Ok(vec![Fact::new(
                IN_REPO_CONTEXT,
                vec![Value::new(Repository::KIND, repo_id.to_string())],
            )]);
        }

        let issues = session
            .issues(&IssueFilter {
                repo_id: None,
                id: issue_id,
            })
            .await?;

        Ok(issues.iter().flat_map(Self::facts_for_issue).collect())
    }
}

fn parse_id<T: core::str::FromStr>(raw: &str) -> Result<T, AuthzError>
where
    T::Err: core::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| AuthzError::invalid_argument(e.to_string()))
}

/// Resource kind → fact derivation strategy.
#[derive(Clone, Default)]
pub struct FactRegistry {
    strategies: HashMap<String, Arc<dyn FactStrategy>>,
}

impl FactRegistry {
    /// A registry with no strategies (every kind gets no context facts).
    pub fn empty() -> Self {
        Self::default()
    }

    /// The registry used by gitclub: issues only.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Issue::KIND, IssueFacts);
        registry
    }

    pub fn register(&mut self, kind: impl Into<String>, strategy: impl FactStrategy + 'static) {
        self.strategies.insert(kind.into(), Arc::new(strategy));
    }

    pub fn requires_parent(&self, kind: &str) -> bool {
        self.strategies
            .get(kind)
            .is_some_and(|s| s.requires_parent())
    }

    /// Derive the context facts for `kind`, reading through `session`.
    pub async fn facts_for(
        &self,
        session: &dyn DataSession,
        kind: &str,
        parent: Option<&str>,
        instance: Option<&str>,
    ) -> Result<Vec<Fact>, AuthzError> {
        let Some(strategy) = self.strategies.get(kind) else {
            return Ok(Vec::new());
        };

        if parent.is_none() && instance.is_none() {
            return Err(AuthzError::invalid_argument(format!(
                "need at least one of parent or instance id to derive {kind} facts"
            )));
        }

        strategy.derive(session, parent, instance).await
    }
}

impl core::fmt::Debug for FactRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut kinds: Vec<&str> = self.strategies.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        f.debug_struct("FactRegistry").field("kinds", &kinds).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{issue, FakeSession};

    #[tokio::test]
    async fn parent_only_yields_single_in_repo_context_fact() {
        let session = FakeSession::with_issues(vec![issue(1, 10, 5, false)]);
        let facts = FactRegistry::with_defaults()
            .facts_for(&session, "Issue", Some("10"), None)
            .await
            .unwrap();

        assert_eq!(
            facts,
            vec![Fact::new(IN_REPO_CONTEXT, vec![Value::new("Repository", "10")])]
        );
        assert_eq!(session.reads(), 0);
    }

    #[tokio::test]
    async fn closed_issue_yields_relation_role_and_closed_facts() {
        let session = FakeSession::with_issues(vec![issue(7, 3, 9, true), issue(8, 3, 9, false)]);
        let facts = FactRegistry::with_defaults()
            .facts_for(&session, "Issue", None, Some("7"))
            .await
            .unwrap();

        let issue = Value::new("Issue", "7");
        assert_eq!(
            facts,
            vec![
                Fact::new(
                    HAS_RELATION,
                    vec![issue.clone(), Value::string("repository"), Value::new("Repository", "3")]
                ),
                Fact::new(
                    HAS_ROLE,
                    vec![Value::new("User", "9"), Value::string("creator"), issue.clone()]
                ),
                Fact::new(IS_CLOSED, vec![issue]),
            ]
        );
        assert_eq!(session.reads(), 1);
    }

    #[tokio::test]
    async fn open_issue_has_no_closed_fact() {
        let session = FakeSession::with_issues(vec![issue(8, 3, 9, false)]);
        let facts = FactRegistry::with_defaults()
            .facts_for(&session, "Issue", None, Some("8"))
            .await
            .unwrap();

        assert_eq!(facts.len(), 2);
        assert!(facts.iter().all(|f| f.name != IS_CLOSED));
    }

    #[tokio::test]
    async fn unknown_issue_yields_no_facts() {
        let session = FakeSession::with_issues(vec![]);
        let facts = FactRegistry::with_defaults()
            .facts_for(&session, "Issue", None, Some("99"))
            .await
            .unwrap();
        assert!(facts.is_empty());
    }

    #[tokio::test]
    async fn issue_facts_without_parent_or_instance_is_invalid() {
        let session = FakeSession::with_issues(vec![]);
        let err = FactRegistry::with_defaults()
            .facts_for(&session, "Issue", None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn malformed_ids_are_invalid_arguments() {
        let session = FakeSession::with_issues(vec![]);
        let err = FactRegistry::with_defaults()
            .facts_for(&session, "Issue", None, Some("seven"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn unregistered_kinds_get_no_facts() {
        let session = FakeSession::with_issues(vec![]);
        let facts = FactRegistry::with_defaults()
            .facts_for(&session, "Repository", None, None)
            .await
            .unwrap();
        assert!(facts.is_empty());
        assert!(!FactRegistry::with_defaults().requires_parent("Repository"));
        assert!(FactRegistry::with_defaults().requires_parent("Issue"));
    }

    #[tokio::test]
    async fn store_failures_surface_as_store_errors() {
        let session = FakeSession::failing();
        let err = FactRegistry::with_defaults()
            .facts_for(&session, "Issue", None, Some("1"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::Store(_)));
    }
}
