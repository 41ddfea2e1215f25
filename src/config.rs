use anyhow::{Context, Result, anyhow, bail};
use dirs::{data_dir, home_dir};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const VENDOR_DIR: &str = "MrHouston";
const APP_DIR: &str = "ActivityTracker";
const CONFIG_FILE: &str = "config.json";
const DB_FILE: &str = "activity_tracker.db";
const LOCK_FILE: &str = "app.lock";
pub const EXPORT_FILE_NAME: &str = "activity_tracker_data.json";
const DEFAULT_API_PORT: u16 = 5000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_port: u16,
    pub db_path: PathBuf,
    pub lock_path: PathBuf,
    pub export_dir: PathBuf,
    pub open_browser: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::with_root(&default_root_dir())
    }
}

impl Config {
    /// Builds a config whose data files all live under `root`.
    pub fn with_root(root: &Path) -> Self {
        Self {
            api_port: DEFAULT_API_PORT,
            db_path: root.join(DB_FILE),
            lock_path: root.join(LOCK_FILE),
            export_dir: default_export_dir(),
            open_browser: true,
        }
    }

    pub fn root_dir() -> PathBuf {
        default_root_dir()
    }

    pub fn config_path() -> PathBuf {
        default_root_dir().join(CONFIG_FILE)
    }

    pub fn load_from(config_path: &Path) -> Result<Self> {
        let content = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
    }

    /// Loads the saved config, falling back to defaults when none was written yet.
    pub fn load_or_default() -> Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(config_path, content)
            .with_context(|| format!("Failed to write config file: {}", config_path.display()))?;

        Ok(())
    }

    pub fn ensure_data_dirs(&self) -> Result<()> {
        [&self.db_path, &self.lock_path]
            .into_iter()
            .filter_map(|path| path.parent())
            .try_for_each(|dir| {
                fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create data directory: {}", dir.display()))
            })
    }

    pub fn default_export_path(&self) -> PathBuf {
        self.export_dir.join(EXPORT_FILE_NAME)
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_config_key(key) {
            "api_port" => {
                self.api_port = value
                    .parse::<u16>()
                    .map_err(|_| anyhow!("api_port must be a number between 0 and 65535"))?;
            }
            "db_path" => {
                self.db_path = non_empty_path(key, value)?;
            }
            "lock_path" => {
                self.lock_path = non_empty_path(key, value)?;
            }
            "export_dir" => {
                self.export_dir = non_empty_path(key, value)?;
            }
            "open_browser" => {
                self.open_browser = value
                    .parse::<bool>()
                    .map_err(|_| anyhow!("open_browser must be true/false"))?;
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: api_port|api.port, db_path|db.path, lock_path|lock.path, export_dir|export.dir, open_browser|ui.open_browser"
                );
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "api_port" => Some(self.api_port.to_string()),
            "db_path" => Some(self.db_path.display().to_string()),
            "lock_path" => Some(self.lock_path.display().to_string()),
            "export_dir" => Some(self.export_dir.display().to_string()),
            "open_browser" => Some(self.open_browser.to_string()),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "api_port" | "api.port" => "api_port",
        "db_path" | "db.path" => "db_path",
        "lock_path" | "lock.path" => "lock_path",
        "export_dir" | "export.dir" => "export_dir",
        "open_browser" | "ui.open_browser" => "open_browser",
        _ => key,
    }
}

fn non_empty_path(key: &str, value: &str) -> Result<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        bail!("{key} requires a path");
    }
    Ok(expand_home(trimmed))
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

fn default_export_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
}

fn default_root_dir() -> PathBuf {
    data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(VENDOR_DIR)
        .join(APP_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_root_places_data_files_under_root() {
        let root = PathBuf::from("/tmp/tracker-root");
        let config = Config::with_root(&root);

        assert_eq!(config.db_path, root.join("activity_tracker.db"));
        assert_eq!(config.lock_path, root.join("app.lock"));
        assert_eq!(config.api_port, 5000);
        assert!(config.open_browser);
    }

    #[test]
    fn set_value_accepts_aliases() {
        let mut config = Config::with_root(Path::new("/tmp/tracker-root"));

        config.set_value("api.port", "5050").unwrap();
        config.set_value("ui.open_browser", "false").unwrap();
        config.set_value("export_dir", "/tmp/exports").unwrap();

        assert_eq!(config.get_value("api_port").as_deref(), Some("5050"));
        assert_eq!(config.get_value("open_browser").as_deref(), Some("false"));
        assert_eq!(config.default_export_path(), PathBuf::from("/tmp/exports").join(EXPORT_FILE_NAME));
    }

    #[test]
    fn set_value_rejects_bad_input() {
        let mut config = Config::with_root(Path::new("/tmp/tracker-root"));

        assert!(config.set_value("api_port", "not-a-port").is_err());
        assert!(config.set_value("open_browser", "maybe").is_err());
        assert!(config.set_value("db_path", "   ").is_err());
        assert!(config.set_value("unknown", "1").is_err());
        assert!(config.get_value("unknown").is_none());
    }

    #[test]
    fn save_and_load_round_trip_with_missing_keys_defaulted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let mut config = Config::with_root(dir.path());
        config.api_port = 6123;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_port, 6123);
        assert_eq!(loaded.db_path, config.db_path);

        fs::write(&path, r#"{"api_port": 7000}"#).unwrap();
        let partial = Config::load_from(&path).unwrap();
        assert_eq!(partial.api_port, 7000);
        assert!(partial.open_browser);
    }
}
