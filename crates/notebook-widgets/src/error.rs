#![forbid(unsafe_code)]

//! Error type for notebook operations.

use std::fmt;

/// Errors from settings parsing and notebook management.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotebookError {
    /// Settings JSON could not be parsed.
    InvalidSettings(String),
    /// No notebook with this name exists.
    UnknownNotebook(String),
    /// A notebook with this name already exists.
    DuplicateNotebook(String),
}

impl fmt::Display for NotebookError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSettings(reason) => write!(f, "invalid notebook settings: {reason}"),
            Self::UnknownNotebook(name) => write!(f, "unknown notebook: {name}"),
            Self::DuplicateNotebook(name) => write!(f, "notebook already exists: {name}"),
        }
    }
}

impl std::error::Error for NotebookError {}

impl From<serde_json::Error> for NotebookError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidSettings(err.to_string())
    }
}
