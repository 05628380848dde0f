//! Postgres-backed domain store.
//!
//! One `PgSession` per request, wrapping a `REPEATABLE READ` transaction so the
//! handler and the fact assembler read the same snapshot. Sessions are
//! read-only; the transaction is rolled back when the session is dropped.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tokio::sync::Mutex;

use gitclub_core::{
    DataSession, Issue, IssueFilter, IssueId, Repository, RepositoryId, SessionFactory,
    StoreError, User, UserId,
};

const ISSUE_COLUMNS: &str = "id, title, repo_id, creator_id, closed";

#[derive(Debug, Clone)]
pub struct PgSessionFactory {
    pool: PgPool,
}

impl PgSessionFactory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(backend)?;
        Ok(Self::new(pool))
    }
}

#[async_trait]
impl SessionFactory for PgSessionFactory {
    async fn begin(&self) -> Result<Arc<dyn DataSession>, StoreError> {
        let mut tx = self.pool.begin().await.map_err(backend)?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await
            .map_err(backend)?;
        Ok(Arc::new(PgSession {
            tx: Mutex::new(tx),
        }))
    }
}

pub struct PgSession {
    tx: Mutex<Transaction<'static, Postgres>>,
}

impl core::fmt::Debug for PgSession {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PgSession").finish_non_exhaustive()
    }
}

#[async_trait]
impl DataSession for PgSession {
    async fn issues(&self, filter: &IssueFilter) -> Result<Vec<Issue>, StoreError> {
        let sql = format!(
            "SELECT {ISSUE_COLUMNS} FROM issues \
             WHERE ($1::BIGINT IS NULL OR repo_id = $1) \
               AND ($2::BIGINT IS NULL OR id = $2) \
             ORDER BY id"
        );
        let mut tx = self.tx.lock().await;
        let rows = sqlx::query(&sql)
            .bind(filter.repo_id.map(|r| r.get()))
            .bind(filter.id.map(|i| i.get()))
            .fetch_all(&mut **tx)
            .await
            .map_err(backend)?;
        rows.iter().map(issue_from_row).collect()
    }

    async fn issues_where(&self, predicate_sql: &str) -> Result<Vec<Issue>, StoreError> {
        // The predicate comes from the policy service's local filter endpoint.
        let sql = format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE {predicate_sql} ORDER BY id");
        let mut tx = self.tx.lock().await;
        let rows = sqlx::query(&sql)
            .fetch_all(&mut **tx)
            .await
            .map_err(backend)?;
        rows.iter().map(issue_from_row).collect()
    }

    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let mut tx = self.tx.lock().await;
        let row = sqlx::query("SELECT id, username, email FROM users WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&mut **tx)
            .await
            .map_err(backend)?;
        row.map(|row| {
            Ok(User {
                id: UserId::new(row.try_get("id").map_err(decode)?),
                username: row.try_get("username").map_err(decode)?,
                email: row.try_get("email").map_err(decode)?,
            })
        })
        .transpose()
    }

    async fn repository(&self, id: RepositoryId) -> Result<Option<Repository>, StoreError> {
        let mut tx = self.tx.lock().await;
        let row = sqlx::query("SELECT id, name FROM repositories WHERE id = $1")
            .bind(id.get())
            .fetch_optional(&mut **tx)
            .await
            .map_err(backend)?;
        row.map(|row| {
            Ok(Repository {
                id: RepositoryId::new(row.try_get("id").map_err(decode)?),
                name: row.try_get("name").map_err(decode)?,
            })
        })
        .transpose()
    }
}

fn issue_from_row(row: &PgRow) -> Result<Issue, StoreError> {
    Ok(Issue {
        id: IssueId::new(row.try_get("id").map_err(decode)?),
        title: row.try_get("title").map_err(decode)?,
        repo_id: RepositoryId::new(row.try_get("repo_id").map_err(decode)?),
        creator_id: UserId::new(row.try_get("creator_id").map_err(decode)?),
        closed: row.try_get("closed").map_err(decode)?,
    })
}

fn backend(e: sqlx::Error) -> StoreError {
    StoreError::Backend(e.to_string())
}

fn decode(e: sqlx::Error) -> StoreError {
    StoreError::Decode(e.to_string())
}
