//! Request context: who is asking, which request, which data session.

use std::sync::Arc;

use gitclub_core::{DataSession, RequestId, User, UserId};

use crate::error::AuthzError;
use crate::value::Value;

/// Immutable per-request context passed into every authorizer call.
///
/// An absent actor means the request is unauthenticated; that is a distinct
/// state, never an empty actor value.
#[derive(Clone)]
pub struct RequestContext {
    actor: Option<UserId>,
    request_id: RequestId,
    session: Arc<dyn DataSession>,
}

impl RequestContext {
    pub fn anonymous(request_id: RequestId, session: Arc<dyn DataSession>) -> Self {
        Self {
            actor: None,
            request_id,
            session,
        }
    }

    pub fn authenticated(
        actor: UserId,
        request_id: RequestId,
        session: Arc<dyn DataSession>,
    ) -> Self {
        Self {
            actor: Some(actor),
            request_id,
            session,
        }
    }

    pub fn actor(&self) -> Option<UserId> {
        self.actor
    }

    pub fn is_authenticated(&self) -> bool {
        self.actor.is_some()
    }

    /// The actor as a policy value, or `Unauthenticated`.
    pub fn actor_value(&self) -> Result<Value, AuthzError> {
        self.actor
            .map(actor_value)
            .ok_or(AuthzError::Unauthenticated)
    }

    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    pub fn session(&self) -> &dyn DataSession {
        self.session.as_ref()
    }
}

impl core::fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RequestContext")
            .field("actor", &self.actor)
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}

/// Actors are always `User` values.
pub fn actor_value(user: UserId) -> Value {
    Value::new(<User as gitclub_core::Entity>::KIND, user.to_string())
}
