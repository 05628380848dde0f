use thiserror::Error;

use gitclub_core::StoreError;

use crate::token::TokenError;

/// Failure talking to a remote collaborator (policy or decision service).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RemoteError {
    /// Connect/IO failure, including an expired request timeout.
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("remote returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("undecodable response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum AuthzError {
    /// No authenticated actor in the request context.
    #[error("unauthenticated")]
    Unauthenticated,

    /// Programmer error: a required parent/instance id was missing or malformed.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("policy service unavailable: {0}")]
    RemoteUnavailable(#[from] RemoteError),

    #[error("domain store failure: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Token(#[from] TokenError),
}

impl AuthzError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}
