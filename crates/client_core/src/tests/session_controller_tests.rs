use super::*;
use shared::domain::TodoList;
use crate::{
    session_store::MemoryCredentialStorage,
    test_support::{list, Call, RecordingSyncEngine, PASSWORD},
};

type Controller = SessionController<Arc<MemoryCredentialStorage>>;

fn controller_with(
    remote: Arc<RecordingSyncEngine>,
) -> (Controller, Arc<MemoryCredentialStorage>) {
    let storage = Arc::new(MemoryCredentialStorage::new());
    let controller = SessionController::new(
        SessionStore::new(Arc::clone(&storage)),
        remote,
        Arc::new(ListModel::new()),
    );
    (controller, storage)
}

fn sample_remote() -> Arc<RecordingSyncEngine> {
    Arc::new(RecordingSyncEngine::with_lists(vec![
        list("home", &["A", "B"]),
        list("work", &["X"]),
    ]))
}

fn task_ids(controller: &Controller, list_id: &str) -> Vec<String> {
    controller
        .model()
        .snapshot()
        .list(&ListId::new(list_id))
        .map(|l| l.tasks.iter().map(|t| t.id.to_string()).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn sign_in_persists_session_and_loads_workspace() {
    let remote = sample_remote();
    let (controller, storage) = controller_with(remote.clone());

    let session = controller.sign_in("alice", PASSWORD).await.expect("sign in");

    assert!(session.is_authenticated());
    assert_eq!(session.token(), Some("token-alice"));
    assert_eq!(session.username(), Some("alice"));
    assert_eq!(controller.session(), session);
    assert_eq!(SessionStore::new(storage).restore(), session);

    assert_eq!(task_ids(&controller, "home"), vec!["A", "B"]);
    assert_eq!(task_ids(&controller, "work"), vec!["X"]);
    assert_eq!(
        remote.calls().await,
        vec![
            Call::Login {
                username: "alice".into()
            },
            Call::FetchLists {
                username: "alice".into(),
                token: "token-alice".into()
            },
            Call::FetchTasks {
                list_id: ListId::new("home")
            },
            Call::FetchTasks {
                list_id: ListId::new("work")
            },
        ]
    );
}

#[tokio::test]
async fn failed_sign_in_stays_signed_out() {
    let remote = sample_remote();
    let (controller, storage) = controller_with(remote.clone());

    let err = controller
        .sign_in("alice", "wrong")
        .await
        .expect_err("bad password");

    assert!(err.reason().contains("401"));
    assert!(!controller.session().is_authenticated());
    assert!(controller.model().snapshot().is_empty());
    assert!(!SessionStore::new(storage).restore().is_authenticated());
    assert_eq!(remote.calls().await.len(), 1);
}

#[tokio::test]
async fn sign_up_registers_then_signs_in() {
    let remote = sample_remote();
    let (controller, _) = controller_with(remote.clone());

    let session = controller.sign_up("bob", PASSWORD).await.expect("sign up");

    assert_eq!(session.username(), Some("bob"));
    let calls = remote.calls().await;
    assert_eq!(
        calls[..2],
        [
            Call::Register {
                username: "bob".into()
            },
            Call::Login {
                username: "bob".into()
            },
        ]
    );
}

#[tokio::test]
async fn rejected_sign_up_never_attempts_login() {
    let remote = sample_remote();
    let (controller, _) = controller_with(remote.clone());

    assert!(controller.sign_up("taken", PASSWORD).await.is_err());
    assert!(!controller.session().is_authenticated());
    assert_eq!(
        remote.calls().await,
        vec![Call::Register {
            username: "taken".into()
        }]
    );
}

#[tokio::test]
async fn sign_out_clears_session_store_and_workspace() {
    let remote = sample_remote();
    let (controller, storage) = controller_with(remote);
    controller.sign_in("alice", PASSWORD).await.expect("sign in");
    let mut session_rx = controller.subscribe();

    controller.sign_out();
    controller.sign_out();

    assert!(!controller.session().is_authenticated());
    assert!(!session_rx.borrow_and_update().is_authenticated());
    assert!(controller.model().snapshot().is_empty());
    assert!(!SessionStore::new(storage).restore().is_authenticated());
}

#[tokio::test]
async fn restore_reloads_workspace_for_persisted_session() {
    let remote = sample_remote();
    let (controller, storage) = controller_with(remote.clone());
    SessionStore::new(Arc::clone(&storage))
        .persist(&Session::authenticated("token-alice", "alice"))
        .expect("seed");

    let session = controller.restore().await;

    assert_eq!(session.username(), Some("alice"));
    assert_eq!(controller.model().snapshot().lists().len(), 2);
    assert!(matches!(remote.calls().await[0], Call::FetchLists { .. }));
}

#[tokio::test]
async fn persisted_session_is_read_without_remote_calls() {
    let remote = sample_remote();
    let (controller, storage) = controller_with(remote.clone());
    SessionStore::new(Arc::clone(&storage))
        .persist(&Session::authenticated("token-alice", "alice"))
        .expect("seed");

    let persisted = controller.persisted_session();

    assert_eq!(persisted.username(), Some("alice"));
    assert!(!controller.session().is_authenticated());
    assert!(controller.model().snapshot().is_empty());
    assert!(remote.calls().await.is_empty());
}

#[tokio::test]
async fn restore_without_credentials_makes_no_calls() {
    let remote = sample_remote();
    let (controller, _) = controller_with(remote.clone());

    assert!(!controller.restore().await.is_authenticated());
    assert!(remote.calls().await.is_empty());
}

#[tokio::test]
async fn sign_in_succeeds_even_when_initial_load_fails() {
    let remote = sample_remote();
    remote.fail_fetch_lists().await;
    let (controller, _) = controller_with(remote);

    let session = controller.sign_in("alice", PASSWORD).await.expect("sign in");

    assert!(session.is_authenticated());
    assert!(controller.model().snapshot().is_empty());
    assert!(matches!(
        controller.reload_workspace().await,
        Err(SyncError::Status { status: 503, .. })
    ));
}

#[tokio::test]
async fn add_task_sends_content_as_typed_then_refetches_list() {
    let remote = sample_remote();
    let (controller, _) = controller_with(remote.clone());
    controller.sign_in("alice", PASSWORD).await.expect("sign in");

    controller
        .add_task(&ListId::new("work"), "  file taxes  ")
        .await
        .expect("add task");

    assert_eq!(task_ids(&controller, "work"), vec!["X", "new-1"]);
    let calls = remote.calls().await;
    assert_eq!(
        calls[calls.len() - 2..],
        [
            Call::CreateTask {
                list_id: ListId::new("work"),
                content: "  file taxes  ".into()
            },
            Call::FetchTasks {
                list_id: ListId::new("work")
            },
        ]
    );
}

#[tokio::test]
async fn add_task_uses_the_list_id_form_issued_by_the_service() {
    let remote = Arc::new(RecordingSyncEngine::with_lists(vec![TodoList::new(
        ListId::numeric(5),
        "Numbered",
    )]));
    let (controller, _) = controller_with(remote.clone());
    controller.sign_in("alice", PASSWORD).await.expect("sign in");

    controller
        .add_task(&ListId::new("5"), "milk")
        .await
        .expect("add task");

    let created = remote
        .calls()
        .await
        .into_iter()
        .find_map(|call| match call {
            Call::CreateTask { list_id, .. } => Some(list_id),
            _ => None,
        })
        .expect("create call");
    assert!(created.is_numeric());
    assert_eq!(task_ids(&controller, "5"), vec!["new-1"]);
}

#[tokio::test]
async fn blank_task_content_is_ignored() {
    let remote = sample_remote();
    let (controller, _) = controller_with(remote.clone());
    controller.sign_in("alice", PASSWORD).await.expect("sign in");
    let calls_before = remote.calls().await.len();

    controller
        .add_task(&ListId::new("work"), "   ")
        .await
        .expect("blank is not an error");

    assert_eq!(remote.calls().await.len(), calls_before);
}

#[tokio::test]
async fn add_list_refetches_lists_and_keeps_loaded_tasks() {
    let remote = sample_remote();
    let (controller, _) = controller_with(remote.clone());
    controller.sign_in("alice", PASSWORD).await.expect("sign in");

    controller.add_list("Errands").await.expect("add list");

    let snapshot = controller.model().snapshot();
    let titles: Vec<&str> = snapshot.lists().iter().map(|l| l.title.as_str()).collect();
    assert_eq!(titles, vec!["list home", "list work", "Errands"]);
    assert_eq!(task_ids(&controller, "home"), vec!["A", "B"]);
    assert!(remote.calls().await.contains(&Call::CreateList {
        title: "Errands".into(),
        username: "alice".into()
    }));
}

#[tokio::test]
async fn workspace_operations_require_a_session() {
    let remote = sample_remote();
    let (controller, _) = controller_with(remote.clone());

    assert!(matches!(
        controller.add_list("Errands").await,
        Err(SyncError::NotAuthenticated)
    ));
    assert!(matches!(
        controller.refresh_list(&ListId::new("home")).await,
        Err(SyncError::NotAuthenticated)
    ));
    assert!(remote.calls().await.is_empty());
}

#[tokio::test]
async fn reorder_controller_follows_session_changes() {
    let remote = sample_remote();
    let (controller, _) = controller_with(remote.clone());
    let reorder = controller.reorder_controller();
    controller.sign_in("alice", PASSWORD).await.expect("sign in");

    let outcome = reorder
        .on_drag_end(&crate::reorder::DragGesture {
            source: crate::reorder::DragLocation::new("home", 0),
            destination: Some(crate::reorder::DragLocation::new("work", 0)),
        })
        .await
        .expect("drag end");

    assert!(outcome.unreconciled_lists().is_empty());
    assert_eq!(remote.remote_task_ids("work").await, vec!["A", "X"]);
    assert_eq!(remote.remote_task_ids("home").await, vec!["B"]);
}
