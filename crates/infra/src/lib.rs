//! Infrastructure layer: remote service clients, domain stores, config.

pub mod config;
pub mod decisions;
pub mod policy_client;
pub mod store;

pub use config::{ConfigError, DecisionConfig, PolicyConfig};
pub use decisions::HttpDecisionService;
pub use policy_client::HttpPolicyClient;
pub use store::{InMemoryStore, PgSessionFactory};
