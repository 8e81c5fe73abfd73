use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;
use tracing::warn;

pub const CONFIG_FILE: &str = "todo.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub session_path: PathBuf,
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:3000".into(),
            session_path: default_session_path(),
            request_timeout_secs: 10,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct FileSettings {
    server_url: Option<String>,
    session_path: Option<PathBuf>,
    request_timeout_secs: Option<u64>,
}

pub fn default_session_path() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("todo_sync")
        .join("session.json")
}

pub fn load_settings(config_path: Option<&Path>) -> Settings {
    load_settings_from(
        config_path.unwrap_or_else(|| Path::new(CONFIG_FILE)),
        |name| std::env::var(name).ok(),
    )
}

/// Defaults, then the TOML file, then environment variables; later layers win.
pub(crate) fn load_settings_from<F>(config_path: &Path, env: F) -> Settings
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(config_path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => {
                if let Some(v) = file_cfg.server_url {
                    settings.server_url = v;
                }
                if let Some(v) = file_cfg.session_path {
                    settings.session_path = v;
                }
                match file_cfg.request_timeout_secs {
                    Some(0) => warn!(
                        "config: ignoring request_timeout_secs=0 path={}",
                        config_path.display()
                    ),
                    Some(v) => settings.request_timeout_secs = v,
                    None => {}
                }
            }
            Err(err) => warn!(
                "config: ignoring malformed config file path={} err={err}",
                config_path.display()
            ),
        }
    }

    let non_empty = |name: &str| env(name).filter(|value| !value.trim().is_empty());

    if let Some(v) = non_empty("TODO_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = non_empty("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = non_empty("TODO_SESSION_PATH") {
        settings.session_path = PathBuf::from(v);
    }
    if let Some(v) = non_empty("APP__SESSION_PATH") {
        settings.session_path = PathBuf::from(v);
    }

    if let Some(v) = non_empty("APP__REQUEST_TIMEOUT_SECS") {
        match v.parse::<u64>() {
            Ok(0) => warn!("config: ignoring APP__REQUEST_TIMEOUT_SECS=0, timeout must be positive"),
            Ok(parsed) => settings.request_timeout_secs = parsed,
            Err(err) => warn!("config: ignoring APP__REQUEST_TIMEOUT_SECS={v:?} err={err}"),
        }
    }

    settings
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
