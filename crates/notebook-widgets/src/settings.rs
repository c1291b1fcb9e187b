#![forbid(unsafe_code)]

//! Notebook view settings.
//!
//! Settings are plain serde data in the host's camelCase JSON shape:
//!
//! ```json
//! { "overscanCount": 5 }
//! ```
//!
//! The notebook modal copies them when it opens. Changing them while a modal is
//! open has no effect until the next open.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::NotebookError;
use crate::virtualized::{DEFAULT_OVERSCAN, ListConfig};

/// User-tunable notebook settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotebookSettings {
    /// Items rendered beyond each visible boundary of the note list.
    pub overscan_count: usize,
}

impl Default for NotebookSettings {
    fn default() -> Self {
        Self {
            overscan_count: DEFAULT_OVERSCAN,
        }
    }
}

impl NotebookSettings {
    /// Parse settings JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, NotebookError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse settings JSON, falling back to defaults on malformed input.
    #[must_use]
    pub fn from_json_or_default(json: &str) -> Self {
        Self::from_json(json).unwrap_or_else(|err| {
            warn!(error = %err, "falling back to default notebook settings");
            Self::default()
        })
    }

    /// Serialize to the host JSON shape.
    pub fn to_json(&self) -> Result<String, NotebookError> {
        Ok(serde_json::to_string(self)?)
    }

    /// List configuration derived from these settings.
    #[must_use]
    pub fn list_config(&self) -> ListConfig {
        ListConfig {
            overscan: self.overscan_count,
        }
    }
}
