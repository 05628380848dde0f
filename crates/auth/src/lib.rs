//! `gitclub-auth`: the authorization boundary between request handlers and
//! the remote policy service.
//!
//! Nothing here speaks HTTP or SQL directly: the policy service, the field
//! decision service and the domain store are ports, implemented in
//! `gitclub-infra`.

pub mod authorizer;
pub mod context;
pub mod error;
pub mod fact;
pub mod facts;
pub mod field;
pub mod gateway;
pub mod policy;
pub mod token;
pub mod value;

#[cfg(test)]
mod testing;

pub use authorizer::{Authorizer, DEFAULT_FILTER_COLUMN};
pub use context::{actor_value, RequestContext};
pub use error::{AuthzError, RemoteError};
pub use fact::{BulkFact, Fact};
pub use facts::{FactRegistry, FactStrategy, IssueFacts};
pub use field::{
    check_path, DecisionQuery, DecisionResponse, DecisionService, FieldDecision, FieldInfo,
    PathSegment,
};
pub use gateway::FactGateway;
pub use policy::{FilterPredicate, PolicyClient};
pub use token::{
    mint_actor_token, verify_actor_token, ActorClaims, Hs256JwtValidator, JwtValidator,
    SessionClaims, TokenError,
};
pub use value::{entity_value, to_value, Arg, ToValue, Value};
