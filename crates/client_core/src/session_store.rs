use std::{
    collections::BTreeMap,
    fmt, fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use tracing::{debug, warn};

use crate::error::SessionStoreError;

pub const TOKEN_KEY: &str = "token";
pub const USERNAME_KEY: &str = "username";

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub username: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("username", &self.username)
            .finish()
    }
}

/// Authentication state. A session is authenticated exactly when both a
/// token and a username are present, which is why they travel together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    credentials: Option<Credentials>,
}

impl Session {
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn authenticated(token: impl Into<String>, username: impl Into<String>) -> Self {
        Self::from_parts(Some(token.into()), Some(username.into()))
    }

    /// Blank values count as absent; a lone token or username yields a
    /// signed-out session.
    pub fn from_parts(token: Option<String>, username: Option<String>) -> Self {
        let token = token.filter(|value| !value.trim().is_empty());
        let username = username.filter(|value| !value.trim().is_empty());
        match (token, username) {
            (Some(token), Some(username)) => Self {
                credentials: Some(Credentials { token, username }),
            },
            _ => Self::default(),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.credentials.is_some()
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn token(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.token.as_str())
    }

    pub fn username(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.username.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialEdit<'a> {
    Set { key: &'a str, value: &'a str },
    Remove(&'a str),
}

/// Key/value persistence for session fields. `load` returns every entry from
/// a single read; `apply` either writes every edit through to the backing
/// store or returns an error.
pub trait CredentialStorage: Send + Sync {
    fn load(&self) -> BTreeMap<String, String>;
    fn apply(&self, edits: &[CredentialEdit<'_>]) -> Result<(), SessionStoreError>;

    fn get(&self, key: &str) -> Option<String> {
        self.load().remove(key)
    }
}

impl<S: CredentialStorage + ?Sized> CredentialStorage for Arc<S> {
    fn load(&self) -> BTreeMap<String, String> {
        (**self).load()
    }

    fn apply(&self, edits: &[CredentialEdit<'_>]) -> Result<(), SessionStoreError> {
        (**self).apply(edits)
    }
}

fn apply_edits(map: &mut BTreeMap<String, String>, edits: &[CredentialEdit<'_>]) {
    for edit in edits {
        match edit {
            CredentialEdit::Set { key, value } => {
                map.insert((*key).to_string(), (*value).to_string());
            }
            CredentialEdit::Remove(key) => {
                map.remove(*key);
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryCredentialStorage {
    entries: Mutex<BTreeMap<String, String>>,
}

impl MemoryCredentialStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStorage for MemoryCredentialStorage {
    fn load(&self) -> BTreeMap<String, String> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(_) => {
                warn!("session: credential map poisoned; treating as empty");
                BTreeMap::new()
            }
        }
    }

    fn apply(&self, edits: &[CredentialEdit<'_>]) -> Result<(), SessionStoreError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| SessionStoreError::Poisoned)?;
        apply_edits(&mut entries, edits);
        Ok(())
    }
}

/// Credentials kept as a flat JSON object on disk.
#[derive(Debug)]
pub struct FileCredentialStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileCredentialStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> SessionStoreError {
        SessionStoreError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }

    fn read_entries(&self) -> BTreeMap<String, String> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(err) => {
                warn!(
                    "session: unreadable credential file path={} err={err}",
                    self.path.display()
                );
                return BTreeMap::new();
            }
        };

        match serde_json::from_str::<BTreeMap<String, String>>(&raw) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(
                    "session: malformed credential file treated as empty path={} err={err}",
                    self.path.display()
                );
                BTreeMap::new()
            }
        }
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), SessionStoreError> {
        if entries.is_empty() {
            return match fs::remove_file(&self.path) {
                Ok(()) => Ok(()),
                Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(err) => Err(self.io_error(err)),
            };
        }

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| self.io_error(err))?;
        }

        let serialized = serde_json::to_string_pretty(entries)?;
        let staging = self.path.with_extension("json.tmp");
        fs::write(&staging, serialized).map_err(|err| self.io_error(err))?;
        fs::rename(&staging, &self.path).map_err(|err| self.io_error(err))?;
        Ok(())
    }
}

impl CredentialStorage for FileCredentialStorage {
    fn load(&self) -> BTreeMap<String, String> {
        self.read_entries()
    }

    fn apply(&self, edits: &[CredentialEdit<'_>]) -> Result<(), SessionStoreError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| SessionStoreError::Poisoned)?;
        let mut entries = self.read_entries();
        apply_edits(&mut entries, edits);
        self.write_entries(&entries)
    }
}

pub struct SessionStore<S> {
    storage: S,
}

impl<S: CredentialStorage> SessionStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn restore(&self) -> Session {
        let mut entries = self.storage.load();
        let session =
            Session::from_parts(entries.remove(TOKEN_KEY), entries.remove(USERNAME_KEY));
        debug!(
            authenticated = session.is_authenticated(),
            "session: restored persisted state"
        );
        session
    }

    pub fn persist(&self, session: &Session) -> Result<(), SessionStoreError> {
        let edits = match session.credentials() {
            Some(credentials) => vec![
                CredentialEdit::Set {
                    key: TOKEN_KEY,
                    value: &credentials.token,
                },
                CredentialEdit::Set {
                    key: USERNAME_KEY,
                    value: &credentials.username,
                },
            ],
            None => vec![
                CredentialEdit::Remove(TOKEN_KEY),
                CredentialEdit::Remove(USERNAME_KEY),
            ],
        };
        self.storage.apply(&edits)
    }

    pub fn clear(&self) -> Result<(), SessionStoreError> {
        self.storage.apply(&[
            CredentialEdit::Remove(TOKEN_KEY),
            CredentialEdit::Remove(USERNAME_KEY),
        ])
    }
}

#[cfg(test)]
#[path = "tests/session_store_tests.rs"]
mod tests;
