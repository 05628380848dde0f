//! Field-level visibility checks for graph-query responses.
//!
//! A separate decision service has already evaluated the query plan for a
//! request; resolvers ask it, per field path, whether a field (or each node of
//! a connection) may be shown. This path fails open: it shapes visibility of
//! data that already passed the primary access gate.

use serde_json::Value as Json;

use gitclub_core::{Entity, RequestId};

use crate::error::RemoteError;

/// One segment of the execution path to a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(s: &str) -> Self {
        Self::Field(s.to_string())
    }
}

impl From<usize> for PathSegment {
    fn from(i: usize) -> Self {
        Self::Index(i)
    }
}

/// What a resolver knows about the field being resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldInfo {
    pub path: Vec<PathSegment>,
    /// The field resolves to a paginated connection.
    pub returns_connection: bool,
}

impl FieldInfo {
    pub fn new(path: impl IntoIterator<Item = PathSegment>) -> Self {
        Self {
            path: path.into_iter().collect(),
            returns_connection: false,
        }
    }

    pub fn connection(mut self) -> Self {
        self.returns_connection = true;
        self
    }

    /// `/a/b/c`, list indices dropped, `/nodes` appended for connections.
    pub fn decision_path(&self) -> String {
        let mut segments: Vec<&str> = self
            .path
            .iter()
            .filter_map(|s| match s {
                PathSegment::Field(name) => Some(name.as_str()),
                PathSegment::Index(_) => None,
            })
            .collect();
        if self.returns_connection {
            segments.push("nodes");
        }
        format!("/{}", segments.join("/"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionQuery {
    pub request_id: String,
    pub path: String,
    pub parent_id: Option<String>,
}

/// Raw reply from the decision service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionResponse {
    pub status: u16,
    pub body: String,
}

#[async_trait::async_trait]
pub trait DecisionService: Send + Sync {
    async fn lookup(&self, query: &DecisionQuery) -> Result<DecisionResponse, RemoteError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldDecision {
    /// Show or hide the whole field.
    Allowed(bool),
    /// Per-node visibility for a connection, in node order.
    Results(Vec<bool>),
}

impl FieldDecision {
    /// Interpret a decision body. `None` for any unexpected shape.
    pub fn from_body(body: &str) -> Option<Self> {
        let json: Json = serde_json::from_str(body).ok()?;
        if let Some(allowed) = json.get("Allowed") {
            return allowed.as_bool().map(Self::Allowed);
        }
        if let Some(results) = json.get("Results") {
            return results
                .as_array()?
                .iter()
                .map(Json::as_bool)
                .collect::<Option<Vec<_>>>()
                .map(Self::Results);
        }
        None
    }

    /// Whether anything at all may be shown.
    pub fn any_allowed(&self) -> bool {
        match self {
            Self::Allowed(allowed) => *allowed,
            Self::Results(results) => results.iter().any(|r| *r),
        }
    }
}

/// Ask the decision service whether the field at `info` is visible.
///
/// `source` is the object the field hangs off; root fields have none.
/// Every anomaly (transport failure, non-200, odd body) is logged and treated
/// as allowed.
pub async fn check_path<E: Entity>(
    service: &dyn DecisionService,
    source: Option<&E>,
    info: &FieldInfo,
    request_id: RequestId,
) -> FieldDecision {
    let request_id = request_id.to_string();
    let query = DecisionQuery {
        request_id: request_id.clone(),
        path: info.decision_path(),
        parent_id: source.map(|s| s.id().to_string()),
    };
    let request_id = request_id.as_str();

    let response = match service.lookup(&query).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(request_id, path = %query.path, error = %e, "decision service unreachable; allowing");
            return FieldDecision::Allowed(true);
        }
    };

    if response.status != 200 {
        tracing::warn!(
            request_id,
            path = %query.path,
            status = response.status,
            body = %response.body,
            "error from decision service; allowing"
        );
        return FieldDecision::Allowed(true);
    }

    match FieldDecision::from_body(&response.body) {
        Some(decision) => {
            tracing::debug!(request_id, path = %query.path, ?decision, "check path");
            decision
        }
        None => {
            tracing::warn!(request_id, path = %query.path, body = %response.body, "unexpected decision shape; allowing");
            FieldDecision::Allowed(true)
        }
    }
}
