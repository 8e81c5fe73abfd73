use std::sync::Arc;

use shared::domain::{ListId, TodoList};
use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::{
    error::{ContractViolation, SyncError},
    list_model::{ListModel, TaskMove},
    session_store::Session,
    sync_engine::SyncEngine,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragLocation {
    pub list_id: ListId,
    pub index: usize,
}

impl DragLocation {
    pub fn new(list_id: impl Into<ListId>, index: usize) -> Self {
        Self {
            list_id: list_id.into(),
            index,
        }
    }
}

/// A finished drag. `destination` is `None` when the task was dropped outside
/// every list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DragGesture {
    pub source: DragLocation,
    pub destination: Option<DragLocation>,
}

impl DragGesture {
    pub fn resolve(&self) -> Option<TaskMove> {
        let destination = self.destination.as_ref()?;
        Some(TaskMove {
            source_list: self.source.list_id.clone(),
            source_index: self.source.index,
            dest_list: destination.list_id.clone(),
            dest_index: destination.index,
        })
    }
}

/// What happens to the optimistic move when a push fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RollbackPolicy {
    #[default]
    KeepOptimistic,
    RestoreOnFailure,
}

#[derive(Debug, Clone)]
pub struct UnreconciledList {
    pub list_id: ListId,
    pub error: SyncError,
}

#[derive(Debug, Clone)]
pub enum DragEndOutcome {
    /// Dropped outside any list; nothing changed and nothing was sent.
    Ignored,
    Synced {
        lists: Vec<ListId>,
    },
    /// The local move stands (unless rolled back) but the remote order of
    /// the listed lists is stale.
    Unreconciled {
        synced: Vec<ListId>,
        failures: Vec<UnreconciledList>,
        rolled_back: bool,
    },
}

impl DragEndOutcome {
    pub fn unreconciled_lists(&self) -> Vec<&ListId> {
        match self {
            DragEndOutcome::Unreconciled { failures, .. } => {
                failures.iter().map(|failure| &failure.list_id).collect()
            }
            _ => Vec::new(),
        }
    }
}

pub struct ReorderController {
    model: Arc<ListModel>,
    sync: Arc<dyn SyncEngine>,
    session: watch::Receiver<Session>,
    rollback: RollbackPolicy,
}

impl ReorderController {
    pub fn new(
        model: Arc<ListModel>,
        sync: Arc<dyn SyncEngine>,
        session: watch::Receiver<Session>,
    ) -> Self {
        Self {
            model,
            sync,
            session,
            rollback: RollbackPolicy::default(),
        }
    }

    pub fn with_rollback_policy(mut self, rollback: RollbackPolicy) -> Self {
        self.rollback = rollback;
        self
    }

    /// Applies the move locally, then pushes the destination list and, once
    /// that push has settled, the source list. A same-list move is pushed once.
    pub async fn on_drag_end(
        &self,
        gesture: &DragGesture,
    ) -> Result<DragEndOutcome, ContractViolation> {
        let Some(task_move) = gesture.resolve() else {
            debug!("reorder: drag ended outside any list; ignoring");
            return Ok(DragEndOutcome::Ignored);
        };

        let before = self.model.snapshot();
        let moved = self.model.move_task(&task_move).map_err(|violation| {
            error!("reorder: rejected drag gesture err={violation}");
            violation
        })?;
        debug!(
            "reorder: applied move source={}[{}] dest={}[{}]",
            task_move.source_list,
            task_move.source_index,
            task_move.dest_list,
            task_move.dest_index
        );

        let mut pending: Vec<&TodoList> = vec![&moved.destination];
        if !task_move.is_same_list() {
            pending.push(&moved.source);
        }

        let token = self.session.borrow().token().map(str::to_string);
        let mut synced = Vec::new();
        let mut failures = Vec::new();
        for list in pending {
            let result = match token.as_deref() {
                Some(token) => {
                    self.sync
                        .push_task_order(&list.id, &list.tasks, token)
                        .await
                }
                None => Err(SyncError::NotAuthenticated),
            };
            match result {
                Ok(()) => synced.push(list.id.clone()),
                Err(error) => {
                    error!(
                        "reorder: remote order left unreconciled list_id={} err={error}",
                        list.id
                    );
                    failures.push(UnreconciledList {
                        list_id: list.id.clone(),
                        error,
                    });
                }
            }
        }

        if failures.is_empty() {
            return Ok(DragEndOutcome::Synced { lists: synced });
        }

        let rolled_back = self.rollback == RollbackPolicy::RestoreOnFailure;
        if rolled_back {
            let previous: Vec<TodoList> = before
                .lists()
                .iter()
                .filter(|list| list.id == task_move.source_list || list.id == task_move.dest_list)
                .cloned()
                .collect();
            self.model.restore_lists(&previous);
            info!(
                "reorder: restored pre-move order source={} dest={}",
                task_move.source_list, task_move.dest_list
            );
        }

        Ok(DragEndOutcome::Unreconciled {
            synced,
            failures,
            rolled_back,
        })
    }
}

#[cfg(test)]
#[path = "tests/reorder_tests.rs"]
mod tests;
