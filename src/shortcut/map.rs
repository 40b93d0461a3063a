//! Per-OS shortcut definitions with an `all` fallback

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::condition::ShortcutCondition;
use crate::config::OsType;

/// Shortcut conditions keyed by OS identifier
///
/// Deserializes from a flat JSON object where every key other than
/// `all` names an OS:
///
/// ```json
/// {"windows": {"ctrlKey": true, "key": "p"}, "all": {"metaKey": true, "key": "p"}}
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShortcutMap {
    /// Used when the current OS has no entry of its own
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<ShortcutCondition>,
    #[serde(flatten)]
    pub by_os: HashMap<String, ShortcutCondition>,
}

impl ShortcutMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map with only a fallback entry
    pub fn all(condition: ShortcutCondition) -> Self {
        Self {
            all: Some(condition),
            by_os: HashMap::new(),
        }
    }

    pub fn with_os(mut self, os: impl Into<String>, condition: ShortcutCondition) -> Self {
        self.by_os.insert(os.into(), condition);
        self
    }

    pub fn with_fallback(mut self, condition: ShortcutCondition) -> Self {
        self.all = Some(condition);
        self
    }

    /// The condition in effect for `os`: its own entry, else the fallback
    pub fn active(&self, os: &OsType) -> Option<&ShortcutCondition> {
        self.by_os.get(os.as_str()).or(self.all.as_ref())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
