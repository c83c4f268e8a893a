// Settings store and shutdown persistence
// Holds the key/value settings mapping, its TOML file format, and the
// drop guard that flushes settings back to disk when the process ends

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{error, info};

/// Settings persistence and lookup failures
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("cannot read settings file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("settings file {path} is malformed: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("cannot write settings file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("setting \"{0}\" was never set")]
    MissingKey(String),
}

impl SettingsError {
    /// True when a load failed only because the file does not exist yet.
    /// The caller decides whether that means "first run" or a fatal error.
    pub fn is_missing_file(&self) -> bool {
        matches!(self, SettingsError::Read { source, .. }
            if source.kind() == io::ErrorKind::NotFound)
    }
}

/// On-disk shape: one record per setting, each carrying a key and a value
///
/// ```toml
/// [[setting]]
/// key = "lang"
/// value = "en"
/// ```
#[derive(Serialize, Deserialize, Default)]
struct SettingsFile {
    #[serde(default, rename = "setting")]
    settings: Vec<SettingRecord>,
}

#[derive(Serialize, Deserialize)]
struct SettingRecord {
    key: String,
    value: String,
}

/// In-memory settings mapping. Keys are unique; order is irrelevant.
#[derive(Debug, Default)]
pub struct SettingsStore {
    entries: HashMap<String, String>,
}

impl SettingsStore {
    /// Parse the settings file at `path` into a fresh store.
    /// Missing, unreadable, or malformed files all fail; see
    /// [`SettingsError::is_missing_file`] for the first-run case.
    pub fn load(path: &Path) -> Result<SettingsStore, SettingsError> {
        let raw = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let file: SettingsFile = toml::from_str(&raw).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

        let mut entries = HashMap::new();
        for record in file.settings {
            entries.insert(record.key, record.value);
        }
        info!(count = entries.len(), ?path, "settings loaded");
        Ok(SettingsStore { entries })
    }

    /// Defaults for a first run, before any settings file exists.
    /// The language is detected from the system locale.
    pub fn first_run() -> SettingsStore {
        let detected = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
        let mut store = SettingsStore::default();
        store.set("lang", &crate::tpl_lang::normalize_code(&detected));
        store
    }

    /// Look up a setting. A key that was never set is an error, never a
    /// silent default.
    pub fn get(&self, key: &str) -> Result<&str, SettingsError> {
        self.entries
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| SettingsError::MissingKey(key.to_string()))
    }

    /// Insert or replace a setting in memory. No disk write happens here.
    pub fn set(&mut self, key: &str, value: &str) {
        self.entries.insert(key.to_string(), value.to_string());
    }

    /// Serialize every entry to `path`, fully overwriting prior contents.
    /// Records are written in key order so repeated saves are stable.
    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let mut keys: Vec<&String> = self.entries.keys().collect();
        keys.sort();
        let file = SettingsFile {
            settings: keys
                .into_iter()
                .map(|key| SettingRecord {
                    key: key.clone(),
                    value: self.entries[key].clone(),
                })
                .collect(),
        };
        let raw = toml::to_string(&file)?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| SettingsError::Write {
                path: path.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, raw).map_err(|source| SettingsError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

/// Settings handle shared between the UI thread and the shutdown guard.
pub type SharedSettings = Arc<Mutex<SettingsStore>>;

/// Lock the shared store, recovering the data if a panicking thread
/// poisoned the mutex (the snapshot is still the last coherent state).
pub fn lock(settings: &SharedSettings) -> MutexGuard<'_, SettingsStore> {
    settings
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Shutdown persistence hook. Constructed once at startup; its `Drop`
/// serializes the store, so the flush runs on normal return and on unwind
/// alike. A save failure at teardown is logged and swallowed.
pub struct SettingsGuard {
    settings: SharedSettings,
    path: PathBuf,
}

impl SettingsGuard {
    pub fn new(settings: SharedSettings, path: PathBuf) -> SettingsGuard {
        SettingsGuard { settings, path }
    }
}

impl Drop for SettingsGuard {
    fn drop(&mut self) {
        let store = lock(&self.settings);
        match store.save(&self.path) {
            Ok(()) => info!(count = store.len(), path = ?self.path, "settings saved at shutdown"),
            Err(err) => error!(%err, path = ?self.path, "settings save failed at shutdown"),
        }
    }
}

/// Settings file location under the per-user config directory,
/// falling back to the working directory when none is available.
pub fn settings_path() -> Option<PathBuf> {
    if let Some(proj) = ProjectDirs::from("com", "tplates", "tplates") {
        let mut path = proj.config_dir().to_path_buf();
        path.push("settings.toml");
        return Some(path);
    }
    if let Ok(mut path) = env::current_dir() {
        path.push("settings.toml");
        return Some(path);
    }
    None
}
