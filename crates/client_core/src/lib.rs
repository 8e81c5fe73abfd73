//! Client core for ordered task lists kept in sync with a remote list service.
//!
//! [`SessionController`] gates everything: it signs users in and out and is
//! the only component that populates or clears the [`ListModel`].
//! [`ReorderController`] turns finished drag gestures into optimistic moves
//! followed by sequential pushes through a [`SyncEngine`].

pub mod error;
pub mod list_model;
pub mod reorder;
pub mod session_controller;
pub mod session_store;
pub mod sync_engine;

pub use error::{AuthError, ContractViolation, SessionStoreError, SyncError, SyncOperation};
pub use list_model::{ListModel, MovedTask, TaskMove, Workspace};
pub use reorder::{
    DragEndOutcome, DragGesture, DragLocation, ReorderController, RollbackPolicy,
    UnreconciledList,
};
pub use session_controller::SessionController;
pub use session_store::{
    CredentialEdit, CredentialStorage, Credentials, FileCredentialStorage,
    MemoryCredentialStorage, Session, SessionStore,
};
pub use sync_engine::{HttpSyncEngine, SyncEngine};

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;
