//! Domain models the authorization layer reasons about.

use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::id::{IssueId, RepositoryId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    pub id: RepositoryId,
    pub name: String,
}

/// An issue filed against a repository.
///
/// `repo_id`, `creator_id` and `closed` are exactly the attributes the policy
/// service needs as context facts; they are never stored there durably.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub title: String,
    pub repo_id: RepositoryId,
    pub creator_id: UserId,
    pub closed: bool,
}

impl Entity for User {
    const KIND: &'static str = "User";
    type Id = UserId;

    fn id(&self) -> &UserId {
        &self.id
    }
}

impl Entity for Repository {
    const KIND: &'static str = "Repository";
    type Id = RepositoryId;

    fn id(&self) -> &RepositoryId {
        &self.id
    }
}

impl Entity for Issue {
    const KIND: &'static str = "Issue";
    type Id = IssueId;

    fn id(&self) -> &IssueId {
        &self.id
    }
}
