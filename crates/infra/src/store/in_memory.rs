use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;

use gitclub_core::{
    DataSession, Issue, IssueFilter, IssueId, Repository, RepositoryId, SessionFactory,
    StoreError, User, UserId,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: BTreeMap<UserId, User>,
    repositories: BTreeMap<RepositoryId, Repository>,
    issues: BTreeMap<IssueId, Issue>,
}

/// In-memory domain store.
///
/// Intended for tests/dev. Each session reads a snapshot taken when it was
/// opened, so a request never observes writes made after it started.
/// SQL filter predicates are not supported.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: User) -> Result<(), StoreError> {
        self.write(|t| {
            t.users.insert(user.id, user);
        })
    }

    pub fn insert_repository(&self, repository: Repository) -> Result<(), StoreError> {
        self.write(|t| {
            t.repositories.insert(repository.id, repository);
        })
    }

    pub fn insert_issue(&self, issue: Issue) -> Result<(), StoreError> {
        self.write(|t| {
            t.issues.insert(issue.id, issue);
        })
    }

    /// Open a snapshot session.
    pub fn snapshot(&self) -> Result<InMemorySession, StoreError> {
        let tables = self
            .tables
            .read()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        Ok(InMemorySession {
            tables: tables.clone(),
        })
    }

    fn write(&self, f: impl FnOnce(&mut Tables)) -> Result<(), StoreError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| StoreError::Backend("lock poisoned".to_string()))?;
        f(&mut tables);
        Ok(())
    }
}

#[async_trait]
impl SessionFactory for InMemoryStore {
    async fn begin(&self) -> Result<Arc<dyn DataSession>, StoreError> {
        Ok(Arc::new(self.snapshot()?))
    }
}

/// A point-in-time view of an [`InMemoryStore`].
#[derive(Debug)]
pub struct InMemorySession {
    tables: Tables,
}

#[async_trait]
impl DataSession for InMemorySession {
    async fn issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>, StoreError> {
        Ok(self
            .tables
            .issues
            .values()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect())
    }

    async fn issues_where(&self, _predicate_sql: &str) -> Result<Vec<Issue>, StoreError> {
        Err(StoreError::Unsupported(
            "SQL filter predicates need the Postgres store".to_string(),
        ))
    }

    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        Ok(self.tables.users.get(&id).cloned())
    }

    async fn repository(&self, id: RepositoryId) -> Result<Option<Repository>, StoreError> {
        Ok(self.tables.repositories.get(&id).cloned())
    }
}
