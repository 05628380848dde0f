//! Port to the remote policy-evaluation service.
//!
//! The service owns the policy language and the durable fact store; this
//! crate only ships values and facts to it. Implementations live in
//! `gitclub-infra` (HTTP) and in tests (recording doubles).

use serde::{Deserialize, Serialize};

use crate::error::RemoteError;
use crate::fact::Fact;
use crate::value::Value;

/// A locally executable filter restricting a query to permitted instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterPredicate {
    sql: String,
    column: String,
}

impl FilterPredicate {
    pub fn new(sql: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            column: column.into(),
        }
    }

    /// The SQL boolean expression, trusted as produced by the policy service.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The column the expression is keyed on.
    pub fn column(&self) -> &str {
        &self.column
    }
}

#[async_trait::async_trait]
pub trait PolicyClient: Send + Sync {
    async fn authorize(
        &self,
        actor: &Value,
        action: &str,
        resource: &Value,
        context_facts: &[Fact],
    ) -> Result<bool, RemoteError>;

    async fn actions(
        &self,
        actor: &Value,
        resource: &Value,
        context_facts: &[Fact],
    ) -> Result<Vec<String>, RemoteError>;

    async fn list(
        &self,
        actor: &Value,
        action: &str,
        resource_type: &str,
        context_facts: &[Fact],
    ) -> Result<Vec<String>, RemoteError>;

    /// Returns a SQL expression over `column`.
    async fn list_local(
        &self,
        actor: &Value,
        action: &str,
        resource_type: &str,
        column: &str,
    ) -> Result<String, RemoteError>;

    async fn query(&self, pattern: &Fact) -> Result<Vec<Fact>, RemoteError>;

    async fn get(&self, pattern: &Fact) -> Result<Vec<Fact>, RemoteError>;

    /// Apply deletions and insertions as one transactional batch.
    async fn bulk(&self, delete: &[Fact], tell: &[Fact]) -> Result<(), RemoteError>;
}
