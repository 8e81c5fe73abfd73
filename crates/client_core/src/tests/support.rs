//! In-memory stand-in for the remote list service used by controller tests.

use std::collections::HashSet;

use async_trait::async_trait;
use shared::domain::{ListId, Task, TodoList};
use tokio::sync::Mutex;

use crate::{
    error::{AuthError, SyncError, SyncOperation},
    sync_engine::SyncEngine,
};

pub const PASSWORD: &str = "hunter2";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Login { username: String },
    Register { username: String },
    FetchLists { username: String, token: String },
    FetchTasks { list_id: ListId },
    PushTaskOrder { list_id: ListId, task_ids: Vec<String> },
    CreateTask { list_id: ListId, content: String },
    CreateList { title: String, username: String },
}

pub fn task(id: &str) -> Task {
    Task::new(id, format!("task {id}"))
}

pub fn list(id: &str, task_ids: &[&str]) -> TodoList {
    TodoList::new(id, format!("list {id}")).with_tasks(task_ids.iter().map(|t| task(t)).collect())
}

#[derive(Default)]
pub struct RecordingSyncEngine {
    calls: Mutex<Vec<Call>>,
    remote: Mutex<Vec<TodoList>>,
    failing_pushes: Mutex<HashSet<ListId>>,
    failing_fetch_lists: Mutex<bool>,
    next_task_id: Mutex<u32>,
}

impl RecordingSyncEngine {
    pub fn with_lists(lists: Vec<TodoList>) -> Self {
        Self {
            remote: Mutex::new(lists),
            ..Self::default()
        }
    }

    pub async fn fail_push_for(&self, list_id: &str) {
        self.failing_pushes.lock().await.insert(ListId::new(list_id));
    }

    pub async fn fail_fetch_lists(&self) {
        *self.failing_fetch_lists.lock().await = true;
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    pub async fn push_calls(&self) -> Vec<Call> {
        self.calls()
            .await
            .into_iter()
            .filter(|call| matches!(call, Call::PushTaskOrder { .. }))
            .collect()
    }

    pub async fn remote_task_ids(&self, list_id: &str) -> Vec<String> {
        self.remote
            .lock()
            .await
            .iter()
            .find(|l| l.id.as_str() == list_id)
            .map(|l| l.tasks.iter().map(|t| t.id.to_string()).collect())
            .unwrap_or_default()
    }

    async fn record(&self, call: Call) {
        self.calls.lock().await.push(call);
    }
}

#[async_trait]
impl SyncEngine for RecordingSyncEngine {
    async fn login(&self, username: &str, password: &str) -> Result<String, AuthError> {
        self.record(Call::Login {
            username: username.to_string(),
        })
        .await;
        if password == PASSWORD {
            Ok(format!("token-{username}"))
        } else {
            Err(AuthError::new("HTTP status client error (401 Unauthorized)"))
        }
    }

    async fn register(&self, username: &str, _password: &str) -> Result<(), AuthError> {
        self.record(Call::Register {
            username: username.to_string(),
        })
        .await;
        if username == "taken" {
            Err(AuthError::new("HTTP status client error (409 Conflict)"))
        } else {
            Ok(())
        }
    }

    async fn fetch_lists(
        &self,
        username: &str,
        token: &str,
    ) -> Result<Vec<TodoList>, SyncError> {
        self.record(Call::FetchLists {
            username: username.to_string(),
            token: token.to_string(),
        })
        .await;
        if *self.failing_fetch_lists.lock().await {
            return Err(SyncError::Status {
                operation: SyncOperation::FetchLists,
                status: 503,
            });
        }
        Ok(self
            .remote
            .lock()
            .await
            .iter()
            .map(|l| TodoList::new(l.id.clone(), l.title.clone()))
            .collect())
    }

    async fn fetch_tasks(&self, list_id: &ListId, _token: &str) -> Result<Vec<Task>, SyncError> {
        self.record(Call::FetchTasks {
            list_id: list_id.clone(),
        })
        .await;
        self.remote
            .lock()
            .await
            .iter()
            .find(|l| &l.id == list_id)
            .map(|l| l.tasks.clone())
            .ok_or(SyncError::Status {
                operation: SyncOperation::FetchTasks,
                status: 404,
            })
    }

    async fn push_task_order(
        &self,
        list_id: &ListId,
        tasks: &[Task],
        _token: &str,
    ) -> Result<(), SyncError> {
        self.record(Call::PushTaskOrder {
            list_id: list_id.clone(),
            task_ids: tasks.iter().map(|t| t.id.to_string()).collect(),
        })
        .await;
        if self.failing_pushes.lock().await.contains(list_id) {
            return Err(SyncError::Status {
                operation: SyncOperation::PushTaskOrder,
                status: 500,
            });
        }
        if let Some(list) = self.remote.lock().await.iter_mut().find(|l| &l.id == list_id) {
            list.tasks = tasks.to_vec();
        }
        Ok(())
    }

    async fn create_task(
        &self,
        list_id: &ListId,
        content: &str,
        _token: &str,
    ) -> Result<(), SyncError> {
        self.record(Call::CreateTask {
            list_id: list_id.clone(),
            content: content.to_string(),
        })
        .await;
        let id = {
            let mut next = self.next_task_id.lock().await;
            *next += 1;
            format!("new-{}", *next)
        };
        let mut remote = self.remote.lock().await;
        let list = remote
            .iter_mut()
            .find(|l| &l.id == list_id)
            .ok_or(SyncError::Status {
                operation: SyncOperation::CreateTask,
                status: 404,
            })?;
        list.tasks.push(Task::new(id, content));
        Ok(())
    }

    async fn create_list(
        &self,
        title: &str,
        username: &str,
        _token: &str,
    ) -> Result<(), SyncError> {
        self.record(Call::CreateList {
            title: title.to_string(),
            username: username.to_string(),
        })
        .await;
        let mut remote = self.remote.lock().await;
        let id = format!("list-{}", remote.len() + 1);
        remote.push(TodoList::new(id, title));
        Ok(())
    }
}
