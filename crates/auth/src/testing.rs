//! Test doubles for the session and policy ports.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use gitclub_core::{
    DataSession, Issue, IssueFilter, IssueId, Repository, RepositoryId, StoreError, User, UserId,
};

use crate::error::RemoteError;
use crate::fact::Fact;
use crate::policy::PolicyClient;
use crate::value::Value;

pub fn issue(id: i64, repo: i64, creator: i64, closed: bool) -> Issue {
    Issue {
        id: IssueId::new(id),
        title: format!("issue {id}"),
        repo_id: RepositoryId::new(repo),
        creator_id: UserId::new(creator),
        closed,
    }
}

#[derive(Debug, Default)]
pub struct FakeSession {
    issues: Vec<Issue>,
    failing: bool,
    reads: AtomicUsize,
}

impl FakeSession {
    pub fn with_issues(issues: Vec<Issue>) -> Self {
        Self {
            issues,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl DataSession for FakeSession {
    async fn issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(StoreError::Backend("connection reset".into()));
        }
        Ok(self.issues.iter().filter(|i| filter.matches(i)).cloned().collect())
    }

    async fn issues_where(&self, _predicate_sql: &str) -> Result<Vec<Issue>, StoreError> {
        Err(StoreError::Unsupported("sql predicates".into()))
    }

    async fn user(&self, _id: UserId) -> Result<Option<User>, StoreError> {
        Ok(None)
    }

    async fn repository(&self, _id: RepositoryId) -> Result<Option<Repository>, StoreError> {
        Ok(None)
    }
}

/// One recorded call to the policy service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyCall {
    Authorize { actor: Value, action: String, resource: Value, facts: Vec<Fact> },
    Actions { actor: Value, resource: Value, facts: Vec<Fact> },
    List { actor: Value, action: String, resource_type: String, facts: Vec<Fact> },
    ListLocal { actor: Value, action: String, resource_type: String, column: String },
    Query(Fact),
    Get(Fact),
    Bulk { delete: Vec<Fact>, tell: Vec<Fact> },
}

/// Policy double: canned answers, every call recorded.
#[derive(Debug, Default)]
pub struct RecordingPolicy {
    pub allow: bool,
    pub actions: Vec<String>,
    pub ids: Vec<String>,
    pub sql: String,
    pub facts: Vec<Fact>,
    pub failing: bool,
    pub calls: Mutex<Vec<PolicyCall>>,
}

impl RecordingPolicy {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<PolicyCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: PolicyCall) -> Result<(), RemoteError> {
        self.calls.lock().unwrap().push(call);
        if self.failing {
            return Err(RemoteError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl PolicyClient for RecordingPolicy {
    async fn authorize(
        &self,
        actor: &Value,
        action: &str,
        resource: &Value,
        context_facts: &[Fact],
    ) -> Result<bool, RemoteError> {
        self.record(PolicyCall::Authorize {
            actor: actor.clone(),
            action: action.into(),
            resource: resource.clone(),
            facts: context_facts.to_vec(),
        })?;
        Ok(self.allow)
    }

    async fn actions(
        &self,
        actor: &Value,
        resource: &Value,
        context_facts: &[Fact],
    ) -> Result<Vec<String>, RemoteError> {
        self.record(PolicyCall::Actions {
            actor: actor.clone(),
            resource: resource.clone(),
            facts: context_facts.to_vec(),
        })?;
        Ok(self.actions.clone())
    }

    async fn list(
        &self,
        actor: &Value,
        action: &str,
        resource_type: &str,
        context_facts: &[Fact],
    ) -> Result<Vec<String>, RemoteError> {
        self.record(PolicyCall::List {
            actor: actor.clone(),
            action: action.into(),
            resource_type: resource_type.into(),
            facts: context_facts.to_vec(),
        })?;
        Ok(self.ids.clone())
    }

    async fn list_local(
        &self,
        actor: &Value,
        action: &str,
        resource_type: &str,
        column: &str,
    ) -> Result<String, RemoteError> {
        self.record(PolicyCall::ListLocal {
            actor: actor.clone(),
            action: action.into(),
            resource_type: resource_type.into(),
            column: column.into(),
        })?;
        Ok(self.sql.clone())
    }

    async fn query(&self, pattern: &Fact) -> Result<Vec<Fact>, RemoteError> {
        self.record(PolicyCall::Query(pattern.clone()))?;
        Ok(self.facts.clone())
    }

    async fn get(&self, pattern: &Fact) -> Result<Vec<Fact>, RemoteError> {
        self.record(PolicyCall::Get(pattern.clone()))?;
        Ok(self.facts.clone())
    }

    async fn bulk(&self, delete: &[Fact], tell: &[Fact]) -> Result<(), RemoteError> {
        self.record(PolicyCall::Bulk {
            delete: delete.to_vec(),
            tell: tell.to_vec(),
        })
    }
}
