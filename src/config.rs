//! TOML-based configuration system.
//!
//! Loads prefetch settings from a `config.toml` file, falling back to the
//! defaults of the intent detector. Every struct implements `Default` so a
//! missing or partial config file behaves exactly like no file at all.
//!
//! ## Config file search order
//!
//! 1. `INSTANT_PREFETCH_CONFIG` environment variable (explicit override)
//! 2. Next to the executable (`<exe_dir>/config.toml`)
//! 3. Platform config directory (`%APPDATA%\InstantPrefetch\config.toml` on Windows)
//! 4. Current working directory (`./config.toml`)
//! 5. No file found → `Config::default()`

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

// ─────────────────────────────────────────────────────────────────────────────
// Config structs
// ─────────────────────────────────────────────────────────────────────────────

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub prefetch: PrefetchConfig,
}

/// Intent detector settings. Immutable once the detector is installed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrefetchConfig {
    /// Hover time before a prefetch starts, in milliseconds.
    pub delay_on_hover_ms: u64,
    /// Use mousedown instead of hover as the mouse trigger.
    pub use_mousedown: bool,
    /// Only mousedown triggers a prefetch; hover and touch are ignored.
    pub use_mousedown_only: bool,
    /// Links with a query string may be prefetched.
    pub allow_query_string: bool,
    /// Links to another origin may be prefetched.
    pub allow_external_links: bool,
    /// Only links carrying `data-instant` are prefetched.
    pub use_whitelist: bool,
}

impl Default for PrefetchConfig {
    fn default() -> Self {
        Self {
            delay_on_hover_ms: 65,
            use_mousedown: false,
            use_mousedown_only: false,
            allow_query_string: false,
            allow_external_links: false,
            use_whitelist: false,
        }
    }
}

impl PrefetchConfig {
    pub fn delay_on_hover(&self) -> Duration {
        Duration::from_millis(self.delay_on_hover_ms)
    }

    /// `true` when mousedown (not mouseover) is the mouse trigger.
    pub fn mousedown_trigger(&self) -> bool {
        self.use_mousedown || self.use_mousedown_only
    }
}

/// Caller-supplied overrides, merged field by field onto a base config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigOverrides {
    pub delay_on_hover_ms: Option<u64>,
    pub use_mousedown: Option<bool>,
    pub use_mousedown_only: Option<bool>,
    pub allow_query_string: Option<bool>,
    pub allow_external_links: Option<bool>,
    pub use_whitelist: Option<bool>,
}

impl ConfigOverrides {
    /// Returns `base` with every set override applied.
    pub fn apply(&self, base: &PrefetchConfig) -> PrefetchConfig {
        PrefetchConfig {
            delay_on_hover_ms: self.delay_on_hover_ms.unwrap_or(base.delay_on_hover_ms),
            use_mousedown: self.use_mousedown.unwrap_or(base.use_mousedown),
            use_mousedown_only: self.use_mousedown_only.unwrap_or(base.use_mousedown_only),
            allow_query_string: self.allow_query_string.unwrap_or(base.allow_query_string),
            allow_external_links: self
                .allow_external_links
                .unwrap_or(base.allow_external_links),
            use_whitelist: self.use_whitelist.unwrap_or(base.use_whitelist),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Config loading and saving
// ─────────────────────────────────────────────────────────────────────────────

impl Config {
    /// Loads configuration from the first config file found. Never panics —
    /// returns defaults if no file is found or if parsing fails.
    pub fn load() -> Self {
        match find_config_path() {
            Some(path) => Self::load_from(&path),
            None => {
                info!("No config file found, using defaults");
                Config::default()
            }
        }
    }

    /// Loads configuration from `path`, falling back to defaults when the
    /// file cannot be read or is not a valid prefetch config.
    pub fn load_from(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Cannot read config, using defaults");
                return Config::default();
            }
        };
        match toml::from_str::<Config>(&content) {
            Ok(config) => {
                info!(
                    path = %path.display(),
                    delay_on_hover_ms = config.prefetch.delay_on_hover_ms,
                    mousedown_trigger = config.prefetch.mousedown_trigger(),
                    whitelist = config.prefetch.use_whitelist,
                    "Prefetch configuration loaded"
                );
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Invalid config, using defaults");
                Config::default()
            }
        }
    }

    /// Saves configuration to the platform config directory.
    /// Creates the directory if it doesn't exist.
    pub fn save(&self) -> io::Result<()> {
        let path = save_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(io::Error::other)?;
        fs::write(&path, content)?;
        info!(path = %path.display(), "Configuration saved");
        Ok(())
    }
}

/// Searches for a config file in the standard locations.
fn find_config_path() -> Option<PathBuf> {
    // 1. Explicit env var override
    if let Ok(path) = std::env::var("INSTANT_PREFETCH_CONFIG") {
        let p = PathBuf::from(path);
        if p.is_file() {
            return Some(p);
        }
    }

    // 2. Next to the executable
    if let Ok(exe) = std::env::current_exe()
        && let Some(dir) = exe.parent()
    {
        let p = dir.join("config.toml");
        if p.is_file() {
            return Some(p);
        }
    }

    // 3. Platform config directory
    if let Some(dir) = platform_config_dir() {
        let p = dir.join("config.toml");
        if p.is_file() {
            return Some(p);
        }
    }

    // 4. Current working directory
    let p = PathBuf::from("config.toml");
    if p.is_file() {
        return Some(p);
    }

    None
}

/// Returns the platform-specific save path for the config file.
fn save_path() -> PathBuf {
    platform_config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("config.toml")
}

/// Returns the platform config directory without adding a dependency.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(windows)]
    {
        std::env::var("APPDATA")
            .ok()
            .map(|appdata| PathBuf::from(appdata).join("InstantPrefetch"))
    }
    #[cfg(not(windows))]
    {
        std::env::var("XDG_CONFIG_HOME")
            .ok()
            .or_else(|| std::env::var("HOME").ok().map(|h| format!("{h}/.config")))
            .map(|dir| PathBuf::from(dir).join("instant-prefetch"))
    }
}
