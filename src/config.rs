//! Configuration management for OnTop
//!
//! Handles loading, saving, and live-reloading user preferences.

use anyhow::Result;
use log::{debug, info, warn};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{OnTopError, OnTopResult};

/// Configuration shared between the host and the hook thread
pub type SharedConfig = Arc<RwLock<Config>>;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// General application settings
    pub general: GeneralConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Get the configuration file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("ontop")
            .join("config.toml")
    }

    /// Load configuration from file or create default
    pub fn load_or_default() -> Result<Self> {
        Self::load_or_default_from(&Self::config_path())
    }

    /// Load configuration from `path`, writing defaults there if it is missing
    pub fn load_or_default_from(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from: {:?}", path);
            let content = std::fs::read_to_string(path)?;
            match toml::from_str(&content) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    warn!("Failed to parse config, using defaults: {}", e);
                    return Ok(Self::default());
                }
            }
        }

        let config = Self::default();
        config.save_to(path)?;
        Ok(config)
    }

    /// Save configuration to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to: {:?}", path);
        Ok(())
    }

    /// Wrap into the shared handle handed to the service
    pub fn into_shared(self) -> SharedConfig {
        Arc::new(RwLock::new(self))
    }
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Add the "Always on top" entry to window system menus
    pub show_always_on_top_item: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            show_always_on_top_item: true,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (error, warn, info, debug, trace)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Parsed level filter, `None` when the string is not a level name
    pub fn level_filter(&self) -> Option<log::LevelFilter> {
        self.level.parse().ok()
    }
}

/// Reloads the shared config whenever its file changes on disk
pub struct ConfigWatcher {
    path: PathBuf,
    // Kept alive to maintain the OS watch
    _watcher: RecommendedWatcher,
}

impl ConfigWatcher {
    /// Start watching `path`, writing every successful reload into `shared`
    pub fn start(path: PathBuf, shared: SharedConfig) -> OnTopResult<Self> {
        let dir = path
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| OnTopError::Config(format!("No parent directory for {:?}", path)))?;
        std::fs::create_dir_all(&dir)?;

        let target = path.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) => {
                let relevant = matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_));
                if relevant && event.paths.iter().any(|p| p.file_name() == target.file_name()) {
                    reload_into(&target, &shared);
                }
            }
            Err(e) => warn!("Config watcher error: {}", e),
        })
        .map_err(|e| OnTopError::Config(format!("Failed to create config watcher: {}", e)))?;

        // Editors often replace the file, so watch the directory instead of the file
        watcher
            .watch(&dir, RecursiveMode::NonRecursive)
            .map_err(|e| OnTopError::Config(format!("Failed to watch {:?}: {}", dir, e)))?;

        Ok(Self {
            path,
            _watcher: watcher,
        })
    }

    /// The file being watched
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Re-read `path` into `shared`; a file that fails to parse leaves the old config in place
fn reload_into(path: &Path, shared: &SharedConfig) {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            debug!("Config not readable yet: {}", e);
            return;
        }
    };

    match toml::from_str::<Config>(&content) {
        Ok(config) => {
            info!(
                "Configuration reloaded (always-on-top item: {})",
                config.general.show_always_on_top_item
            );
            *shared.write() = config;
        }
        Err(e) => warn!("Ignoring invalid config change: {}", e),
    }
}
