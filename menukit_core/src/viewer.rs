use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identity of a menu viewer, independent of any transient
/// connection state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewerId(String);

impl ViewerId {
    pub fn new(id: impl Into<String>) -> Self {
        ViewerId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ViewerId {
    fn from(value: &str) -> Self {
        ViewerId::new(value)
    }
}

/// How a viewer participates in a menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ViewMode {
    /// Interactions reach registered handlers.
    Modify,
    /// Read-only; every interaction is swallowed.
    View,
}
