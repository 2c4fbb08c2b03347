//! Identity components: how the registry finds entities.

use serde::{Deserialize, Serialize};

/// Tag and display name, matched by preference rule selectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Unique-ish display name; quoted-name selectors match it exactly.
    pub name: String,
    /// Classification tag; bare selectors match it.
    pub tag: String,
}

impl Identity {
    pub fn new(name: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tag: tag.into(),
        }
    }
}
