//! HTTP client for the remote policy service.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use gitclub_auth::{Fact, PolicyClient, RemoteError, Value};

use crate::config::PolicyConfig;

// ─────────────────────────────────────────────────────────────────────────────
// Wire types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AuthorizeRequest<'a> {
    actor_type: Option<&'a str>,
    actor_id: Option<&'a str>,
    action: &'a str,
    resource_type: Option<&'a str>,
    resource_id: Option<&'a str>,
    context_facts: &'a [Fact],
}

#[derive(Debug, Serialize)]
struct ActionsRequest<'a> {
    actor_type: Option<&'a str>,
    actor_id: Option<&'a str>,
    resource_type: Option<&'a str>,
    resource_id: Option<&'a str>,
    context_facts: &'a [Fact],
}

#[derive(Debug, Serialize)]
struct ListRequest<'a> {
    actor_type: Option<&'a str>,
    actor_id: Option<&'a str>,
    action: &'a str,
    resource_type: &'a str,
    context_facts: &'a [Fact],
}

#[derive(Debug, Serialize)]
struct ListLocalRequest<'a> {
    actor_type: Option<&'a str>,
    actor_id: Option<&'a str>,
    action: &'a str,
    resource_type: &'a str,
    column: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    data_bindings: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct FactRequest<'a> {
    fact: &'a Fact,
}

#[derive(Debug, Serialize)]
struct BulkRequest<'a> {
    delete: &'a [Fact],
    tell: &'a [Fact],
}

#[derive(Debug, Deserialize)]
struct AllowedResponse {
    allowed: bool,
}

#[derive(Debug, Deserialize)]
struct ResultsResponse<T> {
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct SqlResponse {
    sql: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// `PolicyClient` over JSON/HTTP. Cheap to clone.
#[derive(Clone)]
pub struct HttpPolicyClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    data_bindings: Option<String>,
}

impl HttpPolicyClient {
    pub fn new(config: &PolicyConfig) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            data_bindings: config.data_bindings.clone(),
        })
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<reqwest::Response, RemoteError> {
        let url = format!("{}/api/{path}", self.base_url);
        let mut req = self.http.post(&url).json(body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let response = req.send().await.map_err(|e| {
            tracing::debug!(%url, error = %e, "policy request failed");
            RemoteError::Transport(e.to_string())
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    async fn post<B: Serialize + ?Sized, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, RemoteError> {
        let response = self.send(path, body).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        serde_json::from_slice(&bytes).map_err(|e| RemoteError::Decode(format!("{path}: {e}")))
    }
}

impl core::fmt::Debug for HttpPolicyClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HttpPolicyClient")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PolicyClient for HttpPolicyClient {
    async fn authorize(
        &self,
        actor: &Value,
        action: &str,
        resource: &Value,
        context_facts: &[Fact],
    ) -> Result<bool, RemoteError> {
        let body = AuthorizeRequest {
            actor_type: actor.kind(),
            actor_id: actor.id(),
            action,
            resource_type: resource.kind(),
            resource_id: resource.id(),
            context_facts,
        };
        let res: AllowedResponse = self.post("authorize", &body).await?;
        Ok(res.allowed)
    }

    async fn actions(
        &self,
        actor: &Value,
        resource: &Value,
        context_facts: &[Fact],
    ) -> Result<Vec<String>, RemoteError> {
        let body = ActionsRequest {
            actor_type: actor.kind(),
            actor_id: actor.id(),
            resource_type: resource.kind(),
            resource_id: resource.id(),
            context_facts,
        };
        let res: ResultsResponse<String> = self.post("actions", &body).await?;
        Ok(res.results)
    }

    async fn list(
        &self,
        actor: &Value,
        action: &str,
        resource_type: &str,
        context_facts: &[Fact],
    ) -> Result<Vec<String>, RemoteError> {
        let body = ListRequest {
            actor_type: actor.kind(),
            actor_id: actor.id(),
            action,
            resource_type,
            context_facts,
        };
        let res: ResultsResponse<String> = self.post("list", &body).await?;
        Ok(res.results)
    }

    async fn list_local(
        &self,
        actor: &Value,
        action: &str,
        resource_type: &str,
        column: &str,
    ) -> Result<String, RemoteError> {
        let body = ListLocalRequest {
            actor_type: actor.kind(),
            actor_id: actor.id(),
            action,
            resource_type,
            column,
            data_bindings: self.data_bindings.as_deref(),
        };
        let res: SqlResponse = self.post("list_local", &body).await?;
        Ok(res.sql)
    }

    async fn query(&self, pattern: &Fact) -> Result<Vec<Fact>, RemoteError> {
        let res: ResultsResponse<Fact> = self.post("query", &FactRequest { fact: pattern }).await?;
        Ok(res.results)
    }

    async fn get(&self, pattern: &Fact) -> Result<Vec<Fact>, RemoteError> {
        let res: ResultsResponse<Fact> = self.post("get", &FactRequest { fact: pattern }).await?;
        Ok(res.results)
    }

    async fn bulk(&self, delete: &[Fact], tell: &[Fact]) -> Result<(), RemoteError> {
        self.send("bulk", &BulkRequest { delete, tell }).await?;
        Ok(())
    }
}
