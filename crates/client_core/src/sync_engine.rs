use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use shared::{
    domain::{ListId, Task, TodoList},
    protocol::{
        CreateListRequest, CreateTaskRequest, CredentialsRequest, ListSummary, LoginResponse,
        USERNAME_HEADER,
    },
};
use tracing::{debug, warn};
use url::Url;

use crate::error::{AuthError, SyncError, SyncOperation};

/// Remote calls used by the controllers. Each method is exactly one round
/// trip; nothing is batched, retried or deduplicated.
#[async_trait]
pub trait SyncEngine: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<String, AuthError>;
    async fn register(&self, username: &str, password: &str) -> Result<(), AuthError>;
    async fn fetch_lists(&self, username: &str, token: &str)
        -> Result<Vec<TodoList>, SyncError>;
    async fn fetch_tasks(&self, list_id: &ListId, token: &str) -> Result<Vec<Task>, SyncError>;
    async fn push_task_order(
        &self,
        list_id: &ListId,
        tasks: &[Task],
        token: &str,
    ) -> Result<(), SyncError>;
    async fn create_task(
        &self,
        list_id: &ListId,
        content: &str,
        token: &str,
    ) -> Result<(), SyncError>;
    async fn create_list(&self, title: &str, username: &str, token: &str)
        -> Result<(), SyncError>;
}

pub struct HttpSyncEngine {
    http: Client,
    base_url: Url,
}

impl HttpSyncEngine {
    pub fn new(server_url: &str) -> Result<Self> {
        Self::with_client(Client::new(), server_url)
    }

    pub fn with_timeout(server_url: &str, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build http client")?;
        Self::with_client(http, server_url)
    }

    pub fn with_client(http: Client, server_url: &str) -> Result<Self> {
        let base_url = Url::parse(server_url.trim())
            .with_context(|| format!("invalid server url '{server_url}'"))?;
        if base_url.cannot_be_a_base() || !matches!(base_url.scheme(), "http" | "https") {
            return Err(anyhow!("server_url must start with http:// or https://"));
        }
        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn send_credentials(
        &self,
        route: &str,
        username: &str,
        password: &str,
    ) -> Result<Response, AuthError> {
        let url = self.endpoint(&[route]);
        debug!("auth: request route=/{route} username={username}");
        self.http
            .post(url)
            .json(&CredentialsRequest {
                username: username.to_string(),
                password: password.to_string(),
            })
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(|err| {
                warn!("auth: /{route} failed username={username} err={err}");
                AuthError::new(err.to_string())
            })
    }

    async fn send(
        &self,
        operation: SyncOperation,
        request: RequestBuilder,
    ) -> Result<Response, SyncError> {
        request
            .send()
            .await
            .and_then(Response::error_for_status)
            .map_err(|err| {
                let err = SyncError::from_reqwest(operation, err);
                warn!("sync: {err}");
                err
            })
    }

    async fn decode<T: DeserializeOwned>(
        operation: SyncOperation,
        response: Response,
    ) -> Result<T, SyncError> {
        response.json::<T>().await.map_err(|err| {
            let err = SyncError::Decode {
                operation,
                message: err.to_string(),
            };
            warn!("sync: {err}");
            err
        })
    }
}

#[async_trait]
impl SyncEngine for HttpSyncEngine {
    async fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        let response = self.send_credentials("login", username, password).await?;
        let body: LoginResponse = response.json().await.map_err(|err| {
            warn!("auth: malformed login response username={username} err={err}");
            AuthError::new(format!("malformed login response: {err}"))
        })?;
        if body.token.trim().is_empty() {
            warn!("auth: login response carried an empty token username={username}");
            return Err(AuthError::new("login response carried an empty token"));
        }
        Ok(body.token)
    }

    async fn register(&self, username: &str, password: &str) -> Result<(), AuthError> {
        self.send_credentials("signup", username, password).await?;
        Ok(())
    }

    async fn fetch_lists(
        &self,
        username: &str,
        token: &str,
    ) -> Result<Vec<TodoList>, SyncError> {
        let operation = SyncOperation::FetchLists;
        let request = self
            .http
            .get(self.endpoint(&["lists", username]))
            .bearer_auth(token)
            .header(USERNAME_HEADER, username);
        let response = self.send(operation, request).await?;
        let summaries: Vec<ListSummary> = Self::decode(operation, response).await?;
        debug!("sync: fetched lists username={username} count={}", summaries.len());
        Ok(summaries.into_iter().map(TodoList::from).collect())
    }

    async fn fetch_tasks(&self, list_id: &ListId, token: &str) -> Result<Vec<Task>, SyncError> {
        let operation = SyncOperation::FetchTasks;
        let request = self
            .http
            .get(self.endpoint(&["tasks", list_id.as_str()]))
            .bearer_auth(token);
        let response = self.send(operation, request).await?;
        let tasks: Vec<Task> = Self::decode(operation, response).await?;
        debug!("sync: fetched tasks list_id={list_id} count={}", tasks.len());
        Ok(tasks)
    }

    async fn push_task_order(
        &self,
        list_id: &ListId,
        tasks: &[Task],
        token: &str,
    ) -> Result<(), SyncError> {
        let request = self
            .http
            .put(self.endpoint(&["tasks", list_id.as_str()]))
            .bearer_auth(token)
            .json(tasks);
        self.send(SyncOperation::PushTaskOrder, request).await?;
        debug!("sync: pushed task order list_id={list_id} count={}", tasks.len());
        Ok(())
    }

    async fn create_task(
        &self,
        list_id: &ListId,
        content: &str,
        token: &str,
    ) -> Result<(), SyncError> {
        let request = self
            .http
            .post(self.endpoint(&["tasks"]))
            .bearer_auth(token)
            .json(&CreateTaskRequest {
                content: content.to_string(),
                completed: false,
                todo_list_id: list_id.clone(),
            });
        self.send(SyncOperation::CreateTask, request).await?;
        Ok(())
    }

    async fn create_list(
        &self,
        title: &str,
        username: &str,
        token: &str,
    ) -> Result<(), SyncError> {
        let request = self
            .http
            .post(self.endpoint(&["todo-lists"]))
            .bearer_auth(token)
            .json(&CreateListRequest {
                title: title.to_string(),
                user_id: username.to_string(),
            });
        self.send(SyncOperation::CreateList, request).await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/sync_engine_tests.rs"]
mod tests;
