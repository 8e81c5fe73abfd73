use std::{collections::HashSet, sync::Arc};

use shared::domain::{ListId, Task, TodoList};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::error::ContractViolation;

/// All lists of the signed-in user, in display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workspace {
    lists: Vec<TodoList>,
}

/// One drag-and-drop relocation, expressed in list-relative 0-based indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskMove {
    pub source_list: ListId,
    pub source_index: usize,
    pub dest_list: ListId,
    pub dest_index: usize,
}

impl TaskMove {
    pub fn is_same_list(&self) -> bool {
        self.source_list == self.dest_list
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedTask {
    pub workspace: Workspace,
    pub source: TodoList,
    pub destination: TodoList,
}

fn dedupe_tasks(list_id: &ListId, tasks: Vec<Task>) -> Vec<Task> {
    let mut seen = HashSet::with_capacity(tasks.len());
    let before = tasks.len();
    let unique: Vec<Task> = tasks
        .into_iter()
        .filter(|task| seen.insert(task.id.clone()))
        .collect();
    if unique.len() != before {
        warn!(
            "workspace: dropped duplicate task ids list_id={list_id} dropped={}",
            before - unique.len()
        );
    }
    unique
}

impl Workspace {
    pub fn new(lists: Vec<TodoList>) -> Self {
        Self { lists }
    }

    pub fn lists(&self) -> &[TodoList] {
        &self.lists
    }

    pub fn list(&self, list_id: &ListId) -> Option<&TodoList> {
        self.lists.iter().find(|list| &list.id == list_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    fn position(&self, list_id: &ListId) -> Result<usize, ContractViolation> {
        self.lists
            .iter()
            .position(|list| &list.id == list_id)
            .ok_or_else(|| ContractViolation::UnknownList(list_id.clone()))
    }

    /// Replaces the list sequence. Incoming lists without tasks (the metadata
    /// fetch) keep whatever tasks were already loaded under the same id.
    pub fn with_lists(&self, lists: Vec<TodoList>) -> Workspace {
        let lists = lists
            .into_iter()
            .map(|mut incoming| {
                if incoming.tasks.is_empty() {
                    if let Some(existing) = self.list(&incoming.id) {
                        incoming.tasks = existing.tasks.clone();
                    }
                }
                let tasks = std::mem::take(&mut incoming.tasks);
                incoming.tasks = dedupe_tasks(&incoming.id, tasks);
                incoming
            })
            .collect();
        Workspace { lists }
    }

    pub fn with_tasks(&self, list_id: &ListId, tasks: Vec<Task>) -> Option<Workspace> {
        let index = self.position(list_id).ok()?;
        let mut next = self.clone();
        next.lists[index].tasks = dedupe_tasks(list_id, tasks);
        Some(next)
    }

    pub fn with_moved_task(&self, mv: &TaskMove) -> Result<MovedTask, ContractViolation> {
        let source_pos = self.position(&mv.source_list)?;
        let dest_pos = self.position(&mv.dest_list)?;

        let source_len = self.lists[source_pos].tasks.len();
        if mv.source_index >= source_len {
            return Err(ContractViolation::IndexOutOfRange {
                list_id: mv.source_list.clone(),
                index: mv.source_index,
                len: source_len,
            });
        }

        let mut next = self.clone();
        let task = next.lists[source_pos].tasks.remove(mv.source_index);
        let dest_tasks = &mut next.lists[dest_pos].tasks;
        let dest_index = mv.dest_index.min(dest_tasks.len());
        dest_tasks.insert(dest_index, task);

        let source = next.lists[source_pos].clone();
        let destination = next.lists[dest_pos].clone();
        Ok(MovedTask {
            workspace: next,
            source,
            destination,
        })
    }
}

/// Owner of the shared [`Workspace`]. Every mutation publishes a complete new
/// snapshot, so subscribers never observe a partially applied change.
pub struct ListModel {
    state: watch::Sender<Arc<Workspace>>,
}

impl Default for ListModel {
    fn default() -> Self {
        Self::new()
    }
}

impl ListModel {
    pub fn new() -> Self {
        let (state, _) = watch::channel(Arc::new(Workspace::default()));
        Self { state }
    }

    pub fn snapshot(&self) -> Arc<Workspace> {
        Arc::clone(&self.state.borrow())
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<Workspace>> {
        self.state.subscribe()
    }

    pub fn set_lists(&self, lists: Vec<TodoList>) -> Arc<Workspace> {
        let mut published = None;
        self.state.send_modify(|current| {
            let next = Arc::new(current.with_lists(lists));
            published = Some(Arc::clone(&next));
            *current = next;
        });
        debug!("workspace: lists replaced");
        published.unwrap_or_else(|| self.snapshot())
    }

    /// Returns false, leaving the workspace untouched, when `list_id` is unknown.
    pub fn set_tasks(&self, list_id: &ListId, tasks: Vec<Task>) -> bool {
        let applied = self.state.send_if_modified(|current| {
            match current.with_tasks(list_id, tasks) {
                Some(next) => {
                    *current = Arc::new(next);
                    true
                }
                None => false,
            }
        });
        if !applied {
            warn!("workspace: inconsistency, set_tasks for unknown list list_id={list_id}");
        }
        applied
    }

    pub fn move_task(&self, mv: &TaskMove) -> Result<MovedTask, ContractViolation> {
        let moved = self.state.borrow().with_moved_task(mv)?;
        self.state.send_replace(Arc::new(moved.workspace.clone()));
        Ok(moved)
    }

    /// Puts back the task sequences of the given lists, matched by id. Lists
    /// that no longer exist are skipped.
    pub fn restore_lists(&self, lists: &[TodoList]) {
        self.state.send_modify(|current| {
            let mut next = Workspace::clone(current);
            for previous in lists {
                if let Some(list) = next.lists.iter_mut().find(|l| l.id == previous.id) {
                    list.tasks = previous.tasks.clone();
                }
            }
            *current = Arc::new(next);
        });
    }

    pub fn clear(&self) {
        self.state.send_replace(Arc::new(Workspace::default()));
    }
}

#[cfg(test)]
#[path = "tests/list_model_tests.rs"]
mod tests;
