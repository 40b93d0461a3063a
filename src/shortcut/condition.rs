//! Exact-match shortcut conditions

use serde::{Deserialize, Serialize};

use crate::events::KeyboardEvent;

/// One exact trigger pattern
///
/// Unset modifiers must be released for a match. Unset `key`/`code`
/// place no constraint on that dimension; an empty string counts as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShortcutCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta_key: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ctrl_key: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_key: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift_key: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ShortcutCondition {
    /// Condition on a logical key with no modifiers
    pub fn key(key: impl Into<String>) -> Self {
        Self {
            key: Some(key.into()),
            ..Default::default()
        }
    }

    /// Condition on a physical key code with no modifiers
    pub fn code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            ..Default::default()
        }
    }

    pub fn with_meta(mut self) -> Self {
        self.meta_key = Some(true);
        self
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl_key = Some(true);
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt_key = Some(true);
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift_key = Some(true);
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Check an event against all six dimensions
    pub fn matches(&self, event: &KeyboardEvent) -> bool {
        let is_meta = self.meta_key.unwrap_or(false) == event.meta_key;
        let is_ctrl = self.ctrl_key.unwrap_or(false) == event.ctrl_key;
        let is_alt = self.alt_key.unwrap_or(false) == event.alt_key;
        let is_shift = self.shift_key.unwrap_or(false) == event.shift_key;
        let is_key = constraint(&self.key).map_or(true, |key| event.key == key);
        let is_code = constraint(&self.code).map_or(true, |code| event.code == code);

        is_meta && is_ctrl && is_alt && is_shift && is_key && is_code
    }
}

fn constraint(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl std::fmt::Display for ShortcutCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut parts: Vec<&str> = Vec::new();
        for (held, name) in [
            (self.ctrl_key, "Ctrl"),
            (self.alt_key, "Alt"),
            (self.shift_key, "Shift"),
            (self.meta_key, "Meta"),
        ] {
            if held.unwrap_or(false) {
                parts.push(name);
            }
        }
        if let Some(key) = constraint(&self.key) {
            parts.push(key);
        }
        if let Some(code) = constraint(&self.code) {
            parts.push(code);
        }
        if parts.is_empty() {
            write!(f, "<any unmodified key>")
        } else {
            write!(f, "{}", parts.join("+"))
        }
    }
}
