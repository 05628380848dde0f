//! Service wiring: policy client, authorizer, domain store, token signer.

use std::sync::Arc;

use anyhow::Context;

use gitclub_auth::{Authorizer, Hs256JwtValidator, PolicyClient};
use gitclub_core::{Issue, IssueId, Repository, RepositoryId, SessionFactory, User, UserId};
use gitclub_infra::{HttpPolicyClient, InMemoryStore, PgSessionFactory, PolicyConfig};

use crate::config::ApiConfig;

/// Shared, immutable application services (one instance per process).
pub struct AppServices {
    pub authz: Authorizer,
    pub sessions: Arc<dyn SessionFactory>,
    pub jwt: Arc<Hs256JwtValidator>,
    /// Root secret for actor-scoped policy tokens, when configured.
    pub actor_root_secret: Option<String>,
}

impl AppServices {
    pub fn new(
        policy: Arc<dyn PolicyClient>,
        policy_config: &PolicyConfig,
        sessions: Arc<dyn SessionFactory>,
        session_secret: &str,
    ) -> Self {
        Self {
            authz: Authorizer::new(policy).with_filter_column(policy_config.filter_column.clone()),
            sessions,
            jwt: Arc::new(Hs256JwtValidator::new(session_secret.as_bytes())),
            actor_root_secret: policy_config.actor_root_secret.clone(),
        }
    }
}

impl core::fmt::Debug for AppServices {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AppServices")
            .field("authz", &self.authz)
            .finish_non_exhaustive()
    }
}

/// Build services from configuration: Postgres when `DATABASE_URL` is set,
/// otherwise an in-memory store seeded with demo data.
pub async fn build_services(
    api: &ApiConfig,
    policy_config: &PolicyConfig,
) -> anyhow::Result<AppServices> {
    let policy = HttpPolicyClient::new(policy_config).context("building policy client")?;

    let sessions: Arc<dyn SessionFactory> = match &api.database_url {
        Some(url) => Arc::new(
            PgSessionFactory::connect(url)
                .await
                .context("connecting to postgres")?,
        ),
        None => Arc::new(demo_store().context("seeding in-memory store")?),
    };

    Ok(AppServices::new(
        Arc::new(policy),
        policy_config,
        sessions,
        &api.session_secret,
    ))
}

/// A small fixture data set for running without a database.
pub fn demo_store() -> Result<InMemoryStore, gitclub_core::StoreError> {
    let store = InMemoryStore::new();
    for (id, name) in [(1, "john"), (2, "paul"), (3, "admin")] {
        store.insert_user(User {
            id: UserId::new(id),
            username: name.to_string(),
            email: format!("{name}@beatles.com"),
        })?;
    }
    for (id, name) in [(1, "abbey_road"), (2, "paperwork")] {
        store.insert_repository(Repository {
            id: RepositoryId::new(id),
            name: name.to_string(),
        })?;
    }
    for (id, title, repo, creator, closed) in [
        (1, "take a sad song", 1, 1, false),
        (2, "and make it better", 1, 2, true),
        (3, "file the forms", 2, 3, false),
    ] {
        store.insert_issue(Issue {
            id: IssueId::new(id),
            title: title.to_string(),
            repo_id: RepositoryId::new(repo),
            creator_id: UserId::new(creator),
            closed,
        })?;
    }
    Ok(store)
}
