//! The authorization client: the decision surface request handlers call.
//!
//! Every decision first resolves the actor from the request context, derives
//! context facts for the resource through the [`FactRegistry`], then delegates
//! to the remote [`PolicyClient`]. Failure handling is per call site:
//!
//! | operation        | no actor         | remote/store failure |
//! |------------------|------------------|----------------------|
//! | `authorize`      | `Unauthenticated`| deny (logged)        |
//! | `actions`        | empty            | propagated (logged)  |
//! | `list_resources` | empty            | propagated           |
//! | `list_query`     | `Unauthenticated`| propagated           |

use std::collections::BTreeSet;
use std::sync::Arc;

use gitclub_core::RepositoryId;

use crate::context::{actor_value, RequestContext};
use crate::error::AuthzError;
use crate::fact::{BulkFact, Fact};
use crate::facts::FactRegistry;
use crate::gateway::FactGateway;
use crate::policy::{FilterPredicate, PolicyClient};
use crate::value::{to_value, ToValue, Value};

const AUDIT: &str = "gitclub::audit";

/// Column the local filter is keyed on unless configured otherwise.
pub const DEFAULT_FILTER_COLUMN: &str = "id::TEXT";

/// Explicitly constructed handle over the policy service.
///
/// Built once at startup and shared (`Arc`) across requests; holds no
/// per-request state.
#[derive(Clone)]
pub struct Authorizer {
    policy: Arc<dyn PolicyClient>,
    facts: FactRegistry,
    gateway: FactGateway,
    filter_column: String,
}

impl Authorizer {
    pub fn new(policy: Arc<dyn PolicyClient>) -> Self {
        Self {
            gateway: FactGateway::new(policy.clone()),
            policy,
            facts: FactRegistry::with_defaults(),
            filter_column: DEFAULT_FILTER_COLUMN.to_string(),
        }
    }

    pub fn with_registry(mut self, facts: FactRegistry) -> Self {
        self.facts = facts;
        self
    }

    pub fn with_filter_column(mut self, column: impl Into<String>) -> Self {
        self.filter_column = column.into();
        self
    }

    pub fn gateway(&self) -> &FactGateway {
        &self.gateway
    }

    /// May the current actor perform `action` on `resource`?
    ///
    /// Fails closed: any policy-service or store failure is logged and
    /// reported as a denial. Only a missing actor or a malformed resource
    /// is an error.
    pub async fn authorize<T: ToValue + ?Sized>(
        &self,
        ctx: &RequestContext,
        action: &str,
        resource: &T,
        parent: Option<RepositoryId>,
    ) -> Result<bool, AuthzError> {
        let actor = ctx.actor_value()?;
        let resource = to_value(resource, false);
        let (kind, id) = bound_parts(&resource)?;
        let parent = parent.map(|p| p.to_string());

        let outcome = async {
            let context_facts = self
                .facts
                .facts_for(ctx.session(), kind, parent.as_deref(), Some(id))
                .await?;
            tracing::info!(
                target: AUDIT,
                request_id = %ctx.request_id(),
                %actor,
                action,
                %resource,
                context_facts = ?display_facts(&context_facts),
                "authorize"
            );
            let allowed = self
                .policy
                .authorize(&actor, action, &resource, &context_facts)
                .await?;
            Ok::<bool, AuthzError>(allowed)
        }
        .await;

        match outcome {
            Ok(allowed) => {
                let outcome = if allowed { "allowed" } else { "denied" };
                tracing::info!(
                    target: AUDIT,
                    request_id = %ctx.request_id(),
                    outcome,
                    "authorize result"
                );
                Ok(allowed)
            }
            Err(e @ (AuthzError::RemoteUnavailable(_) | AuthzError::Store(_))) => {
                tracing::warn!(
                    target: AUDIT,
                    request_id = %ctx.request_id(),
                    error = %e,
                    "policy error for allow({actor}, {action}, {resource}); denying"
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Actions the actor may take on `resource`, sorted and deduplicated.
    ///
    /// Unlike [`Authorizer::authorize`], failures propagate. An
    /// unauthenticated caller without an explicit `actor` gets an empty list.
    pub async fn actions<T: ToValue + ?Sized>(
        &self,
        ctx: &RequestContext,
        resource: &T,
        actor: Option<&Value>,
    ) -> Result<Vec<String>, AuthzError> {
        let actor = match (actor, ctx.actor()) {
            (Some(actor), _) => actor.clone(),
            (None, Some(user)) => actor_value(user),
            (None, None) => return Ok(Vec::new()),
        };
        let resource = to_value(resource, false);
        let (kind, id) = bound_parts(&resource)?;

        let outcome = async {
            let context_facts = self
                .facts
                .facts_for(ctx.session(), kind, None, Some(id))
                .await?;
            tracing::info!(
                target: AUDIT,
                request_id = %ctx.request_id(),
                %actor,
                %resource,
                context_facts = ?display_facts(&context_facts),
                "actions"
            );
            let actions = self
                .policy
                .actions(&actor, &resource, &context_facts)
                .await?;
            Ok::<Vec<String>, AuthzError>(actions)
        }
        .await;

        match outcome {
            Ok(actions) => Ok(actions
                .into_iter()
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect()),
            Err(e) => {
                tracing::warn!(
                    target: AUDIT,
                    request_id = %ctx.request_id(),
                    error = %e,
                    "policy error for allow({actor}, _, {resource})"
                );
                Err(e)
            }
        }
    }

    /// Identifiers of `resource_type` instances the actor may `action`.
    ///
    /// Kinds whose strategy requires a container (issues) must be given
    /// `parent`. Unauthenticated callers get an empty list, never an error,
    /// so listings do not leak existence.
    pub async fn list_resources(
        &self,
        ctx: &RequestContext,
        action: &str,
        resource_type: &str,
        parent: Option<RepositoryId>,
    ) -> Result<Vec<String>, AuthzError> {
        let Some(user) = ctx.actor() else {
            return Ok(Vec::new());
        };
        if parent.is_none() && self.facts.requires_parent(resource_type) {
            return Err(AuthzError::invalid_argument(format!(
                "cannot list {resource_type} without a parent repository"
            )));
        }

        let context_facts = match parent {
            Some(parent) => {
                self.facts
                    .facts_for(ctx.session(), resource_type, Some(&parent.to_string()), None)
                    .await?
            }
            None => Vec::new(),
        };

        let actor = actor_value(user);
        tracing::info!(
            target: AUDIT,
            request_id = %ctx.request_id(),
            %actor,
            action,
            resource_type,
            context_facts = ?display_facts(&context_facts),
            "list"
        );
        let ids = self
            .policy
            .list(&actor, action, resource_type, &context_facts)
            .await?;
        Ok(ids)
    }

    /// A filter predicate restricting a local query to permitted instances.
    ///
    /// No per-instance facts: only actor, action and type are known before
    /// enumeration.
    pub async fn list_query(
        &self,
        ctx: &RequestContext,
        action: &str,
        resource_type: &str,
    ) -> Result<FilterPredicate, AuthzError> {
        let actor = ctx.actor_value()?;
        tracing::info!(
            target: AUDIT,
            request_id = %ctx.request_id(),
            %actor,
            action,
            resource_type,
            column = %self.filter_column,
            "list_local"
        );
        let sql = self
            .policy
            .list_local(&actor, action, resource_type, &self.filter_column)
            .await?;
        tracing::debug!(target: AUDIT, %sql, "list_local result");
        Ok(FilterPredicate::new(sql, self.filter_column.clone()))
    }

    /// Ad hoc relation query; arguments may be unbound wildcards.
    pub async fn query(
        &self,
        predicate: &str,
        args: &[&(dyn ToValue + Sync)],
    ) -> Result<Vec<Fact>, AuthzError> {
        let pattern = pattern(predicate, args);
        tracing::info!(target: AUDIT, %pattern, "query");
        Ok(self.policy.query(&pattern).await?)
    }

    /// Fetch stored facts matching a pattern; arguments may be unbound.
    pub async fn get(
        &self,
        predicate: &str,
        args: &[&(dyn ToValue + Sync)],
    ) -> Result<Vec<Fact>, AuthzError> {
        let pattern = pattern(predicate, args);
        tracing::info!(target: AUDIT, %pattern, "get");
        Ok(self.policy.get(&pattern).await?)
    }

    pub async fn tell(&self, predicate: &str, args: &[&(dyn ToValue + Sync)]) -> Result<(), AuthzError> {
        self.gateway.tell(predicate, args).await
    }

    pub async fn bulk_update(
        &self,
        delete: &[BulkFact],
        insert: &[BulkFact],
    ) -> Result<(), AuthzError> {
        self.gateway.bulk_update(delete, insert).await
    }
}

impl core::fmt::Debug for Authorizer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Authorizer")
            .field("facts", &self.facts)
            .field("filter_column", &self.filter_column)
            .finish_non_exhaustive()
    }
}

fn bound_parts(resource: &Value) -> Result<(&str, &str), AuthzError> {
    match (resource.kind(), resource.id()) {
        (Some(kind), Some(id)) => Ok((kind, id)),
        _ => Err(AuthzError::invalid_argument(format!(
            "resource {resource} must name both a type and an id"
        ))),
    }
}

fn pattern(predicate: &str, args: &[&(dyn ToValue + Sync)]) -> Fact {
    Fact::new(
        predicate,
        args.iter().map(|a| a.to_arg().encode(true)).collect(),
    )
}

fn display_facts(facts: &[Fact]) -> Vec<String> {
    facts.iter().map(ToString::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facts::{HAS_RELATION, IN_REPO_CONTEXT};
    use crate::testing::{issue, FakeSession, PolicyCall, RecordingPolicy};
    use gitclub_core::{RequestId, UserId};
    use tracing_test::traced_test;

    fn ctx(actor: Option<i64>, session: FakeSession) -> RequestContext {
        let session = Arc::new(session);
        match actor {
            Some(id) => RequestContext::authenticated(UserId::new(id), RequestId::new(), session),
            None => RequestContext::anonymous(RequestId::new(), session),
        }
    }

    fn closed_issue() -> gitclub_core::Issue {
        issue(7, 3, 9, true)
    }

    #[tokio::test]
    async fn authorize_ships_issue_context_facts() {
        let policy = Arc::new(RecordingPolicy {
            allow: true,
            ..RecordingPolicy::default()
        });
        let authz = Authorizer::new(policy.clone());
        let ctx = ctx(Some(1), FakeSession::with_issues(vec![closed_issue()]));

        let allowed = authz.authorize(&ctx, "read", &closed_issue(), None).await.unwrap();
        assert!(allowed);

        let calls = policy.calls();
        let [PolicyCall::Authorize { actor, action, resource, facts }] = calls.as_slice() else {
            panic!("expected one authorize call, got {calls:?}");
        };
        assert_eq!(actor, &Value::new("User", "1"));
        assert_eq!(action, "read");
        assert_eq!(resource, &Value::new("Issue", "7"));
        assert_eq!(facts.len(), 3);
        assert_eq!(facts[0].name, HAS_RELATION);
    }

    #[tokio::test]
    async fn authorize_with_parent_uses_container_context() {
        let policy = Arc::new(RecordingPolicy::default());
        let authz = Authorizer::new(policy.clone());
        let ctx = ctx(Some(1), FakeSession::with_issues(vec![closed_issue()]));

        let allowed = authz
            .authorize(&ctx, "read", &closed_issue(), Some(RepositoryId::new(3)))
            .await
            .unwrap();
        assert!(!allowed);

        let PolicyCall::Authorize { facts, .. } = &policy.calls()[0] else {
            panic!("expected authorize");
        };
        assert_eq!(facts[0].name, IN_REPO_CONTEXT);
    }

    #[tokio::test]
    #[traced_test]
    async fn authorize_fails_closed_on_remote_error() {
        let policy = Arc::new(RecordingPolicy {
            allow: true,
            ..RecordingPolicy::failing()
        });
        let authz = Authorizer::new(policy.clone());
        let ctx = ctx(Some(1), FakeSession::with_issues(vec![closed_issue()]));

        let allowed = authz.authorize(&ctx, "read", &closed_issue(), None).await.unwrap();
        assert!(!allowed);
        assert_eq!(policy.calls().len(), 1);
        assert!(logs_contain("denying"));
    }

    #[tokio::test]
    async fn authorize_fails_closed_on_store_error() {
        let policy = Arc::new(RecordingPolicy {
            allow: true,
            ..RecordingPolicy::default()
        });
        let authz = Authorizer::new(policy.clone());
        let ctx = ctx(Some(1), FakeSession::failing());

        let allowed = authz.authorize(&ctx, "read", &closed_issue(), None).await.unwrap();
        assert!(!allowed);
        assert!(policy.calls().is_empty());
    }

    #[tokio::test]
    async fn authorize_requires_an_actor() {
        let policy = Arc::new(RecordingPolicy::default());
        let authz = Authorizer::new(policy.clone());
        let ctx = ctx(None, FakeSession::default());

        let err = authz
            .authorize(&ctx, "read", &closed_issue(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::Unauthenticated));
        assert!(policy.calls().is_empty());
    }

    #[tokio::test]
    async fn authorize_on_unregistered_kind_sends_no_facts() {
        let policy = Arc::new(RecordingPolicy::default());
        let authz = Authorizer::new(policy.clone());
        let ctx = ctx(Some(1), FakeSession::default());

        authz
            .authorize(&ctx, "read", &Value::new("Repository", "3"), None)
            .await
            .unwrap();
        let PolicyCall::Authorize { facts, .. } = &policy.calls()[0] else {
            panic!("expected authorize");
        };
        assert!(facts.is_empty());
    }

    #[tokio::test]
    async fn actions_are_sorted_and_deduplicated() {
        let policy = Arc::new(RecordingPolicy {
            actions: vec!["read".into(), "close".into(), "read".into(), "comment".into()],
            ..RecordingPolicy::default()
        });
        let authz = Authorizer::new(policy);
        let ctx = ctx(Some(1), FakeSession::with_issues(vec![closed_issue()]));

        let actions = authz.actions(&ctx, &closed_issue(), None).await.unwrap();
        assert_eq!(actions, vec!["close", "comment", "read"]);
    }

    #[tokio::test]
    async fn actions_reraise_remote_errors() {
        let authz = Authorizer::new(Arc::new(RecordingPolicy::failing()));
        let ctx = ctx(Some(1), FakeSession::with_issues(vec![closed_issue()]));

        let err = authz.actions(&ctx, &closed_issue(), None).await.unwrap_err();
        assert!(matches!(err, AuthzError::RemoteUnavailable(_)));
    }

    #[tokio::test]
    async fn actions_for_anonymous_caller_is_empty_without_remote_call() {
        let policy = Arc::new(RecordingPolicy::failing());
        let authz = Authorizer::new(policy.clone());
        let ctx = ctx(None, FakeSession::default());

        let actions = authz.actions(&ctx, &closed_issue(), None).await.unwrap();
        assert!(actions.is_empty());
        assert!(policy.calls().is_empty());
    }

    #[tokio::test]
    async fn actions_honour_an_explicit_actor() {
        let policy = Arc::new(RecordingPolicy::default());
        let authz = Authorizer::new(policy.clone());
        let ctx = ctx(None, FakeSession::with_issues(vec![closed_issue()]));
        let other = Value::new("User", "5");

        authz.actions(&ctx, &closed_issue(), Some(&other)).await.unwrap();
        let PolicyCall::Actions { actor, .. } = &policy.calls()[0] else {
            panic!("expected actions");
        };
        assert_eq!(actor, &other);
    }

    #[tokio::test]
    async fn list_resources_for_anonymous_caller_is_empty_without_remote_call() {
        let policy = Arc::new(RecordingPolicy::failing());
        let authz = Authorizer::new(policy.clone());
        let ctx = ctx(None, FakeSession::default());

        let ids = authz
            .list_resources(&ctx, "read", "Issue", None)
            .await
            .unwrap();
        assert!(ids.is_empty());
        assert!(policy.calls().is_empty());
    }

    #[tokio::test]
    async fn list_resources_for_issues_requires_a_parent() {
        let authz = Authorizer::new(Arc::new(RecordingPolicy::default()));
        let ctx = ctx(Some(1), FakeSession::default());

        let err = authz
            .list_resources(&ctx, "read", "Issue", None)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn list_resources_scopes_to_the_parent_container() {
        let policy = Arc::new(RecordingPolicy {
            ids: vec!["7".into(), "8".into()],
            ..RecordingPolicy::default()
        });
        let authz = Authorizer::new(policy.clone());
        let ctx = ctx(Some(1), FakeSession::default());

        let ids = authz
            .list_resources(&ctx, "read", "Issue", Some(RepositoryId::new(3)))
            .await
            .unwrap();
        assert_eq!(ids, vec!["7", "8"]);

        assert_eq!(
            policy.calls(),
            vec![PolicyCall::List {
                actor: Value::new("User", "1"),
                action: "read".into(),
                resource_type: "Issue".into(),
                facts: vec![Fact::new(IN_REPO_CONTEXT, vec![Value::new("Repository", "3")])],
            }]
        );
    }

    #[tokio::test]
    async fn list_query_uses_the_configured_column() {
        let policy = Arc::new(RecordingPolicy {
            sql: "id::TEXT IN ('1', '2')".into(),
            ..RecordingPolicy::default()
        });
        let authz = Authorizer::new(policy.clone()).with_filter_column("issues.id::TEXT");
        let ctx = ctx(Some(1), FakeSession::default());

        let filter = authz.list_query(&ctx, "read", "Issue").await.unwrap();
        assert_eq!(filter.sql(), "id::TEXT IN ('1', '2')");
        assert_eq!(filter.column(), "issues.id::TEXT");
        let PolicyCall::ListLocal { column, .. } = &policy.calls()[0] else {
            panic!("expected list_local");
        };
        assert_eq!(column, "issues.id::TEXT");
    }

    #[tokio::test]
    async fn list_query_requires_an_actor() {
        let authz = Authorizer::new(Arc::new(RecordingPolicy::default()));
        let ctx = ctx(None, FakeSession::default());
        let err = authz.list_query(&ctx, "read", "Issue").await.unwrap_err();
        assert!(matches!(err, AuthzError::Unauthenticated));
    }

    #[tokio::test]
    async fn query_encodes_wildcards() {
        let policy = Arc::new(RecordingPolicy::default());
        let authz = Authorizer::new(policy.clone());

        authz
            .query("has_role", &[&Value::new("User", "1"), &None::<String>, &Value::of_kind("Repository")])
            .await
            .unwrap();

        let PolicyCall::Query(pattern) = &policy.calls()[0] else {
            panic!("expected query");
        };
        assert!(pattern.args[1].is_empty());
        assert_eq!(pattern.args[2], Value::of_kind("Repository"));
    }

    #[tokio::test]
    async fn get_propagates_remote_errors() {
        let authz = Authorizer::new(Arc::new(RecordingPolicy::failing()));
        let err = authz
            .get("has_role", &[&Value::new("User", "1")])
            .await
            .unwrap_err();
        assert!(matches!(err, AuthzError::RemoteUnavailable(_)));
    }
}
