use serde::{Deserialize, Serialize};

use gitclub_core::{Issue, User};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub id: Option<i64>,
}

/// Front-end `RoleAssignment`: grant `role` on a repository to a user.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignmentRequest {
    #[serde(alias = "user_id")]
    pub user_id: i64,
    pub role: String,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
}

impl From<User> for UserResponse {
    fn from(u: User) -> Self {
        Self {
            id: u.id.get(),
            username: u.username,
            email: u.email,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    #[serde(flatten)]
    pub user: UserResponse,
    /// Bearer token for subsequent requests.
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_token: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct IssueResponse {
    pub id: i64,
    pub title: String,
    pub repo_id: i64,
    pub creator_id: i64,
    pub closed: bool,
}

impl From<Issue> for IssueResponse {
    fn from(i: Issue) -> Self {
        Self {
            id: i.id.get(),
            title: i.title,
            repo_id: i.repo_id.get(),
            creator_id: i.creator_id.get(),
            closed: i.closed,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActionsResponse {
    pub actions: Vec<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoleAssignmentResponse {
    pub user_id: String,
    pub role: String,
}
