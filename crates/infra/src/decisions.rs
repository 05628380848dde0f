//! HTTP adapter for the path-scoped decision service.

use async_trait::async_trait;

use gitclub_auth::{DecisionQuery, DecisionResponse, DecisionService, RemoteError};

use crate::config::DecisionConfig;

#[derive(Debug, Clone)]
pub struct HttpDecisionService {
    http: reqwest::Client,
    url: String,
}

impl HttpDecisionService {
    pub fn new(config: &DecisionConfig) -> Result<Self, RemoteError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl DecisionService for HttpDecisionService {
    /// Status and body are handed back as-is; interpretation (and failing
    /// open) is the caller's job.
    async fn lookup(&self, query: &DecisionQuery) -> Result<DecisionResponse, RemoteError> {
        let mut params = vec![
            ("request_id", query.request_id.as_str()),
            ("path", query.path.as_str()),
        ];
        if let Some(parent_id) = &query.parent_id {
            params.push(("parent_id", parent_id.as_str()));
        }

        let response = self
            .http
            .get(&self.url)
            .query(&params)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        Ok(DecisionResponse { status, body })
    }
}
