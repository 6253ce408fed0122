use std::path::{Path, PathBuf};
use std::time::Duration;

use cointel_session::{DEFAULT_CHAT_ENDPOINT, SessionConfig};
use cointel_transport::DEFAULT_UPLOAD_ENDPOINT;
use figment::{
    Figment,
    providers::{Env, Format, Json, Serialized},
};
use serde::{Deserialize, Serialize};
use snafu::{ResultExt, Snafu};

pub const SETTINGS_DIRECTORY_NAME: &str = "cointel";
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const ENV_PREFIX: &str = "COINTEL_";
pub const DEFAULT_REPLY_TIMEOUT_SECS: u64 = 120;

/// Dashboard settings: defaults, then the JSON file, then `COINTEL_*` env vars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_upload_url")]
    pub upload_url: String,
    #[serde(default = "default_chat_url")]
    pub chat_url: String,
    /// Seconds to wait for a reply before giving up; `0` waits forever.
    #[serde(default = "default_reply_timeout_secs")]
    pub reply_timeout_secs: u64,
    #[serde(default)]
    pub reconnect_on_upload: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            upload_url: default_upload_url(),
            chat_url: default_chat_url(),
            reply_timeout_secs: default_reply_timeout_secs(),
            reconnect_on_upload: false,
        }
    }
}

impl Settings {
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|path| path.join(SETTINGS_DIRECTORY_NAME))
            .unwrap_or_else(|| PathBuf::from(".cointel"))
    }

    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join(SETTINGS_FILE_NAME)
    }

    /// Loads settings, falling back to defaults when the sources cannot be parsed.
    pub fn load(path: &Path) -> Self {
        let mut figment = Figment::from(Serialized::defaults(Settings::default()));
        if path.exists() {
            figment = figment.merge(Json::file(path));
        } else {
            tracing::info!("settings file not found at {:?}, using defaults", path);
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        match figment.extract::<Settings>() {
            Ok(settings) => settings.normalized(),
            Err(error) => {
                tracing::warn!(
                    "failed to parse settings from {:?}: {}. using defaults",
                    path,
                    error
                );
                Settings::default()
            }
        }
    }

    pub fn normalized(mut self) -> Self {
        self.upload_url = non_blank_or(self.upload_url, default_upload_url);
        self.chat_url = non_blank_or(self.chat_url, default_chat_url);
        self
    }

    pub fn reply_timeout(&self) -> Option<Duration> {
        (self.reply_timeout_secs > 0).then(|| Duration::from_secs(self.reply_timeout_secs))
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            chat_endpoint: self.chat_url.clone(),
            reconnect_on_upload: self.reconnect_on_upload,
        }
    }

    /// Writes the settings atomically through a temporary sibling file.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context(CreateDirSnafu {
                stage: "create-settings-directory",
                path: parent.to_path_buf(),
            })?;
        }

        let content = serde_json::to_string_pretty(self).context(SerializeConfigSnafu {
            stage: "serialize-settings-json",
        })?;

        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).context(WriteFileSnafu {
            stage: "write-temporary-settings-file",
            path: temp_path.clone(),
        })?;

        std::fs::rename(&temp_path, path).context(RenameTempFileSnafu {
            stage: "rename-temporary-settings-file",
            from: temp_path,
            to: path.to_path_buf(),
        })?;

        tracing::info!("saved settings to {:?}", path);
        Ok(())
    }
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum SettingsError {
    #[snafu(display("failed to create settings directory at {path:?} on `{stage}`: {source}"))]
    CreateDir {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display("failed to serialize settings on `{stage}`: {source}"))]
    SerializeConfig {
        stage: &'static str,
        source: serde_json::Error,
    },
    #[snafu(display("failed to write settings file at {path:?} on `{stage}`: {source}"))]
    WriteFile {
        stage: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },
    #[snafu(display(
        "failed to replace settings file from {from:?} to {to:?} on `{stage}`: {source}"
    ))]
    RenameTempFile {
        stage: &'static str,
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

fn non_blank_or(value: String, default: fn() -> String) -> String {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default()
    } else {
        trimmed.to_string()
    }
}

fn default_upload_url() -> String {
    DEFAULT_UPLOAD_ENDPOINT.to_string()
}

fn default_chat_url() -> String {
    DEFAULT_CHAT_ENDPOINT.to_string()
}

fn default_reply_timeout_secs() -> u64 {
    DEFAULT_REPLY_TIMEOUT_SECS
}
