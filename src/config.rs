//! Configuration loading and management

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::shortcut::{BinderConfig, ShortcutCondition, ShortcutMap};

/// Environment variable overriding the detected OS identifier
pub const OS_TYPE_ENV: &str = "SHORTCUT_OS_TYPE";
/// Environment variable holding the shortcut map as JSON
pub const SHORTCUT_MAP_ENV: &str = "SHORTCUT_MAP";
/// Environment variable selecting the keyboard event source
pub const SOURCE_ENV: &str = "SHORTCUT_SOURCE";

/// OS identifier selecting the active entry of a shortcut map
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OsType(String);

impl OsType {
    pub fn new(os: impl Into<String>) -> Self {
        Self(os.into())
    }

    /// Identifier for the platform this binary was built for
    pub fn detect() -> Self {
        Self::new(std::env::consts::OS)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OsType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where keyboard events come from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventSource {
    /// JSON lines on standard input
    Stdin,
    /// System-wide CGEventTap (macOS only)
    Tap,
}

impl Default for EventSource {
    fn default() -> Self {
        if cfg!(target_os = "macos") {
            Self::Tap
        } else {
            Self::Stdin
        }
    }
}

impl std::str::FromStr for EventSource {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stdin" => Ok(Self::Stdin),
            "tap" => Ok(Self::Tap),
            other => bail!("unknown event source {:?} (expected \"stdin\" or \"tap\")", other),
        }
    }
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// OS identifier used to pick the active shortcut
    pub os_type: OsType,

    /// Shortcut definitions
    pub shortcuts: ShortcutMap,

    /// Keyboard event source
    pub source: EventSource,
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let os_type = lookup(OS_TYPE_ENV)
            .filter(|v| !v.trim().is_empty())
            .map(|v| OsType::new(v.trim()))
            .unwrap_or_else(OsType::detect);

        let shortcuts = match lookup(SHORTCUT_MAP_ENV) {
            Some(json) => ShortcutMap::from_json(&json)
                .with_context(|| format!("failed to parse {}", SHORTCUT_MAP_ENV))?,
            None => default_shortcuts(),
        };

        let source = match lookup(SOURCE_ENV) {
            Some(value) => value
                .parse::<EventSource>()
                .context("invalid event source")?,
            None => EventSource::default(),
        };

        Ok(Self {
            os_type,
            shortcuts,
            source,
        })
    }

    /// Whether applying `reloaded` needs a restart rather than a live update
    ///
    /// Only the event source is fixed for the life of the process.
    pub fn needs_restart_for(&self, reloaded: &Config) -> bool {
        self.source != reloaded.source
    }

    /// The part of the configuration a binder follows
    pub fn binder_config(&self) -> BinderConfig {
        BinderConfig {
            os_type: self.os_type.clone(),
            shortcuts: self.shortcuts.clone(),
        }
    }
}

/// Command+K on macOS, Ctrl+K everywhere else
fn default_shortcuts() -> ShortcutMap {
    ShortcutMap::all(ShortcutCondition::key("k").with_ctrl())
        .with_os("macos", ShortcutCondition::key("k").with_meta())
}
