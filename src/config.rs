use crate::route::HistoryMode;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Setting key for the sensor list's CREATED column format.
pub const SENSOR_LIST_CREATION: &str = "sensorListCreation";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub source: Option<String>,
    pub managed_namespace: Option<String>,
    pub history: HistoryMode,
    pub fetch_timeout_secs: u64,
    pub log_tail_lines: i64,
    pub settings_path: Option<PathBuf>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            source: None,
            managed_namespace: None,
            history: HistoryMode::Push,
            fetch_timeout_secs: default_fetch_timeout_secs(),
            log_tail_lines: default_log_tail_lines(),
            settings_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
struct ConsoleConfigFile {
    #[serde(default, alias = "managedNamespace")]
    managed_namespace: Option<String>,
    #[serde(default)]
    history: HistorySpec,
    #[serde(default = "default_fetch_timeout_secs", alias = "timeout")]
    fetch_timeout_secs: u64,
    #[serde(default = "default_log_tail_lines", alias = "tail")]
    log_tail_lines: i64,
    #[serde(default)]
    settings_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
enum HistorySpec {
    #[default]
    Push,
    Replace,
}

impl From<HistorySpec> for HistoryMode {
    fn from(value: HistorySpec) -> Self {
        match value {
            HistorySpec::Push => Self::Push,
            HistorySpec::Replace => Self::Replace,
        }
    }
}

impl ConsoleConfig {
    /// Loads the explicit path when given, otherwise the first discovered file.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = explicit.map(Path::to_path_buf).or_else(discover_config_path);
        let Some(path) = path else {
            return Ok(Self::default());
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let parsed: ConsoleConfigFile = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse config {}", path.display()))?;

        Ok(Self {
            source: Some(path.display().to_string()),
            managed_namespace: parsed
                .managed_namespace
                .map(|namespace| namespace.trim().to_string())
                .filter(|namespace| !namespace.is_empty()),
            history: parsed.history.into(),
            fetch_timeout_secs: parsed.fetch_timeout_secs.max(1),
            log_tail_lines: parsed.log_tail_lines.max(1),
            settings_path: parsed.settings_path,
        })
    }
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_log_tail_lines() -> i64 {
    200
}

fn discover_config_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("SENSORSCOPE_CONFIG")
        && !path.trim().is_empty()
    {
        return Some(PathBuf::from(path));
    }

    let cwd_candidates = [
        PathBuf::from("sensorscope.yaml"),
        PathBuf::from("sensorscope.yml"),
        PathBuf::from(".sensorscope.yaml"),
    ];
    for candidate in cwd_candidates {
        if candidate.exists() {
            return Some(candidate);
        }
    }

    user_config_dir()
        .map(|dir| dir.join("config.yaml"))
        .filter(|candidate| candidate.exists())
}

fn user_config_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .filter(|home| !home.trim().is_empty())
        .map(|home| PathBuf::from(home).join(".config/sensorscope"))
}

/// Small persisted key/value store for view preferences.
#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    path: Option<PathBuf>,
    values: BTreeMap<String, bool>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    flags: BTreeMap<String, bool>,
}

impl SettingsStore {
    pub fn open(path: Option<PathBuf>) -> Result<Self> {
        let path = path.or_else(|| user_config_dir().map(|dir| dir.join("settings.yaml")));
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.exists() {
            return Ok(Self {
                path: Some(path),
                values: BTreeMap::new(),
            });
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read settings {}", path.display()))?;
        let parsed: SettingsFile = serde_yaml::from_str(&raw)
            .with_context(|| format!("failed to parse settings {}", path.display()))?;
        Ok(Self {
            path: Some(path),
            values: parsed.flags,
        })
    }

    pub fn flag(&self, key: &str) -> bool {
        self.values.get(key).copied().unwrap_or(false)
    }

    pub fn set_flag(&mut self, key: &str, value: bool) -> Result<()> {
        self.values.insert(key.to_string(), value);
        let Some(path) = self.path.as_ref() else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let rendered = serde_yaml::to_string(&SettingsFile {
            flags: self.values.clone(),
        })
        .context("failed to encode settings")?;
        fs::write(path, rendered)
            .with_context(|| format!("failed to write settings {}", path.display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConsoleConfig, SENSOR_LIST_CREATION, SettingsStore};
    use crate::route::HistoryMode;
    use std::fs;

    #[test]
    fn config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sensorscope.yaml");
        fs::write(
            &path,
            "managedNamespace: team-a\nhistory: replace\nfetch_timeout_secs: 3\n",
        )
        .unwrap();

        let config = ConsoleConfig::load(Some(&path)).unwrap();
        assert_eq!(config.managed_namespace.as_deref(), Some("team-a"));
        assert_eq!(config.history, HistoryMode::Replace);
        assert_eq!(config.fetch_timeout_secs, 3);
        assert_eq!(config.log_tail_lines, 200);
    }

    #[test]
    fn blank_managed_namespace_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sensorscope.yaml");
        fs::write(&path, "managed_namespace: '  '\n").unwrap();

        let config = ConsoleConfig::load(Some(&path)).unwrap();
        assert_eq!(config.managed_namespace, None);
        assert_eq!(config.history, HistoryMode::Push);
    }

    #[test]
    fn invalid_config_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.yaml");
        fs::write(&path, "history: sideways\n").unwrap();

        let error = ConsoleConfig::load(Some(&path)).unwrap_err();
        assert!(format!("{error:#}").contains("broken.yaml"));
    }

    #[test]
    fn settings_round_trip_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/settings.yaml");

        let mut store = SettingsStore::open(Some(path.clone())).unwrap();
        assert!(!store.flag(SENSOR_LIST_CREATION));
        store.set_flag(SENSOR_LIST_CREATION, true).unwrap();

        let reopened = SettingsStore::open(Some(path)).unwrap();
        assert!(reopened.flag(SENSOR_LIST_CREATION));
    }
}
