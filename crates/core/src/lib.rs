//! `gitclub-core`: domain foundation building blocks.
//!
//! This crate contains the domain models, identifiers, and the data-access
//! session ports the authorization layer reads through. No SQL or HTTP here.

pub mod entity;
pub mod error;
pub mod id;
pub mod model;
pub mod store;

pub use entity::Entity;
pub use error::{DomainError, DomainResult};
pub use id::{IssueId, RepositoryId, RequestId, UserId};
pub use model::{Issue, Repository, User};
pub use store::{
    one_or, one_or_forbidden, one_or_not_found, DataSession, IssueFilter, SessionFactory,
    StoreError,
};
