//! Keyboard event types delivered by input sources
//!
//! Field names follow the DOM `KeyboardEvent` so that events can be
//! written by hand as JSON (`{"ctrlKey": true, "key": "k", "code": "KeyK"}`).

use serde::{Deserialize, Serialize};

/// Whether a key went down or came back up
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyEventKind {
    #[default]
    KeyDown,
    KeyUp,
}

impl std::fmt::Display for KeyEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeyEventKind::KeyDown => write!(f, "keydown"),
            KeyEventKind::KeyUp => write!(f, "keyup"),
        }
    }
}

/// A single keyboard event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KeyboardEvent {
    /// Event kind; JSON input without a `type` is a key-down
    #[serde(rename = "type")]
    pub kind: KeyEventKind,
    /// "Win" on Windows and "Command" on macOS
    pub meta_key: bool,
    pub ctrl_key: bool,
    pub alt_key: bool,
    pub shift_key: bool,
    /// Logical key name, e.g. `"k"`, `"K"`, `"Enter"`
    pub key: String,
    /// Physical key code, e.g. `"KeyK"`
    pub code: String,
}

impl KeyboardEvent {
    /// A key-down event with no modifiers held
    pub fn key_down(key: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            kind: KeyEventKind::KeyDown,
            key: key.into(),
            code: code.into(),
            ..Default::default()
        }
    }

    /// A key-up event with no modifiers held
    pub fn key_up(key: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            kind: KeyEventKind::KeyUp,
            ..Self::key_down(key, code)
        }
    }

    pub fn with_meta(mut self) -> Self {
        self.meta_key = true;
        self
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl_key = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt_key = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift_key = true;
        self
    }
}

impl std::fmt::Display for KeyboardEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ", self.kind)?;
        for (held, name) in [
            (self.ctrl_key, "Ctrl"),
            (self.alt_key, "Alt"),
            (self.shift_key, "Shift"),
            (self.meta_key, "Meta"),
        ] {
            if held {
                write!(f, "{}+", name)?;
            }
        }
        write!(f, "{} ({})", self.key, self.code)
    }
}
