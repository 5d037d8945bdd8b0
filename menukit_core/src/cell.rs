use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque visual payload written into menu slots.
///
/// The framework never inspects a cell beyond identity and equality; hosts
/// map the id onto whatever their rendering surface understands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    pub id: String,
}

impl Cell {
    pub fn new(id: impl Into<String>) -> Self {
        Cell { id: id.into() }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}
