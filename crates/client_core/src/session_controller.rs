use std::sync::Arc;

use shared::domain::ListId;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{
    error::{AuthError, SyncError},
    list_model::ListModel,
    reorder::ReorderController,
    session_store::{CredentialStorage, Credentials, Session, SessionStore},
    sync_engine::SyncEngine,
};

/// Owns the authentication state and is the only path by which the
/// workspace gets populated or emptied.
pub struct SessionController<S> {
    store: SessionStore<S>,
    sync: Arc<dyn SyncEngine>,
    model: Arc<ListModel>,
    session: watch::Sender<Session>,
}

impl<S: CredentialStorage> SessionController<S> {
    pub fn new(store: SessionStore<S>, sync: Arc<dyn SyncEngine>, model: Arc<ListModel>) -> Self {
        let (session, _) = watch::channel(Session::signed_out());
        Self {
            store,
            sync,
            model,
            session,
        }
    }

    pub fn session(&self) -> Session {
        self.session.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.session.subscribe()
    }

    pub fn model(&self) -> &Arc<ListModel> {
        &self.model
    }

    pub fn reorder_controller(&self) -> ReorderController {
        ReorderController::new(
            Arc::clone(&self.model),
            Arc::clone(&self.sync),
            self.subscribe(),
        )
    }

    /// The persisted session as stored, without adopting it or touching the
    /// remote service.
    pub fn persisted_session(&self) -> Session {
        self.store.restore()
    }

    /// Picks up a previously persisted session and, when it is complete,
    /// loads the workspace for it.
    pub async fn restore(&self) -> Session {
        let session = self.store.restore();
        if !session.is_authenticated() {
            return session;
        }

        info!(
            "session: restored persisted sign-in username={}",
            session.username().unwrap_or_default()
        );
        self.session.send_replace(session.clone());
        if let Err(err) = self.reload_workspace().await {
            warn!("session: workspace load after restore incomplete err={err}");
        }
        session
    }

    pub async fn sign_in(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        let token = self.sync.login(username, password).await.map_err(|err| {
            warn!("session: sign-in failed username={username} err={err}");
            err
        })?;

        let session = Session::authenticated(token, username);
        if !session.is_authenticated() {
            warn!("session: sign-in produced incomplete credentials username={username:?}");
            return Err(AuthError::new("username and token must not be blank"));
        }

        if let Err(err) = self.store.persist(&session) {
            error!("session: failed to persist sign-in username={username} err={err}");
        }
        self.session.send_replace(session.clone());
        info!("session: signed in username={username}");

        if let Err(err) = self.reload_workspace().await {
            warn!("session: workspace load after sign-in incomplete err={err}");
        }
        Ok(session)
    }

    /// Registration never yields a session by itself; a successful sign-up
    /// is followed by an ordinary sign-in with the same credentials.
    pub async fn sign_up(&self, username: &str, password: &str) -> Result<Session, AuthError> {
        self.sync.register(username, password).await.map_err(|err| {
            warn!("session: sign-up failed username={username} err={err}");
            err
        })?;
        info!("session: registered username={username}");
        self.sign_in(username, password).await
    }

    pub fn sign_out(&self) {
        let previous = self.session.send_replace(Session::signed_out());
        if let Err(err) = self.store.clear() {
            error!("session: failed to clear persisted credentials err={err}");
        }
        self.model.clear();
        if let Some(username) = previous.username() {
            info!("session: signed out username={username}");
        }
    }

    fn credentials(&self) -> Result<Credentials, SyncError> {
        self.session
            .borrow()
            .credentials()
            .cloned()
            .ok_or(SyncError::NotAuthenticated)
    }

    /// Results that arrive after a sign-out or a switch of account must not
    /// repopulate the workspace.
    fn is_current(&self, credentials: &Credentials) -> bool {
        self.session.borrow().credentials() == Some(credentials)
    }

    /// Fetches list metadata, then each list's tasks in display order. Every
    /// list is attempted; the first failure is returned.
    pub async fn reload_workspace(&self) -> Result<(), SyncError> {
        let credentials = self.credentials()?;
        let lists = self
            .sync
            .fetch_lists(&credentials.username, &credentials.token)
            .await?;
        if !self.is_current(&credentials) {
            debug!("session: discarding list fetch for a superseded session");
            return Ok(());
        }
        let list_ids: Vec<ListId> = lists.iter().map(|list| list.id.clone()).collect();
        self.model.set_lists(lists);

        let mut first_error = None;
        for list_id in &list_ids {
            if let Err(err) = self.load_tasks(&credentials, list_id).await {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn load_tasks(&self, credentials: &Credentials, list_id: &ListId) -> Result<(), SyncError> {
        let tasks = self.sync.fetch_tasks(list_id, &credentials.token).await?;
        if self.is_current(credentials) {
            self.model.set_tasks(list_id, tasks);
        }
        Ok(())
    }

    pub async fn refresh_list(&self, list_id: &ListId) -> Result<(), SyncError> {
        let credentials = self.credentials()?;
        self.load_tasks(&credentials, list_id).await
    }

    /// Creates a task remotely and re-fetches the list to observe it; the
    /// service does not echo the created task. Blank content is ignored,
    /// anything else is sent as typed.
    pub async fn add_task(&self, list_id: &ListId, content: &str) -> Result<(), SyncError> {
        if content.trim().is_empty() {
            debug!("session: ignoring blank task content list_id={list_id}");
            return Ok(());
        }
        let credentials = self.credentials()?;
        // The loaded list carries the id in the form the service issued it.
        let list_id = self
            .model
            .snapshot()
            .list(list_id)
            .map(|list| list.id.clone())
            .unwrap_or_else(|| list_id.clone());
        self.sync
            .create_task(&list_id, content, &credentials.token)
            .await?;
        self.load_tasks(&credentials, &list_id).await
    }

    pub async fn add_list(&self, title: &str) -> Result<(), SyncError> {
        if title.trim().is_empty() {
            debug!("session: ignoring blank list title");
            return Ok(());
        }
        let credentials = self.credentials()?;
        self.sync
            .create_list(title, &credentials.username, &credentials.token)
            .await?;
        let lists = self
            .sync
            .fetch_lists(&credentials.username, &credentials.token)
            .await?;
        if self.is_current(&credentials) {
            self.model.set_lists(lists);
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/session_controller_tests.rs"]
mod tests;
