// ABOUTME: Error types for descriptor parsing and shape validation
// ABOUTME: Defines specific error types for parser module operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParserError {
    #[error("Failed to read descriptor file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("Descriptor is neither valid JSON ({json}) nor valid YAML ({yaml})")]
    UnknownFormat {
        json: serde_json::Error,
        yaml: serde_yaml::Error,
    },

    #[error("Invalid descriptor shape at {path}: {error}")]
    Shape { path: String, error: ShapeError },
}

/// Problems with a single `{ "<type>": { ... } }` entry.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    #[error("expected a mapping, found {found}")]
    NotAMapping { found: &'static str },

    #[error("entry declares no task type")]
    Empty,

    #[error("entry declares more than one task type: {keys:?}")]
    MultipleKeys { keys: Vec<String> },

    #[error("configuration of '{task_type}' must be a mapping, found {found}")]
    ConfigNotAMapping {
        task_type: String,
        found: &'static str,
    },

    #[error("'after' of '{task_type}' must be a list, found {found}")]
    AfterNotAList {
        task_type: String,
        found: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, ParserError>;
