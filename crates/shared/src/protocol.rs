//! Request and response bodies of the remote list service.

use serde::{Deserialize, Serialize};

use crate::domain::{ListId, TodoList};

pub const USERNAME_HEADER: &str = "X-Username";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Entry of `GET /lists/{username}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListSummary {
    pub id: ListId,
    pub title: String,
}

impl From<ListSummary> for TodoList {
    fn from(summary: ListSummary) -> Self {
        TodoList::new(summary.id, summary.title)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub content: String,
    pub completed: bool,
    pub todo_list_id: ListId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListRequest {
    pub title: String,
    pub user_id: String,
}
