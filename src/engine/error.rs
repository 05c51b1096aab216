// ABOUTME: Error types for task compilation and execution
// ABOUTME: Every failure converts into a structured { type, message, data } record

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum TaskError {
    #[error("Task not found: {name}")]
    TaskNotFound { name: String },

    #[error("Invalid task {name}: {cause}")]
    InvalidTask {
        name: String,
        descriptor: Value,
        context: Value,
        #[source]
        cause: Box<TaskError>,
    },

    #[error("Malformed {entry}: {reason}")]
    MalformedEntry { entry: String, reason: String },

    #[error("Invalid {entry}: {cause}")]
    InvalidEntry {
        entry: String,
        #[source]
        cause: Box<TaskError>,
    },

    #[error("No task found in descriptor")]
    NoTaskFound { descriptor: Value },

    #[error("Descriptor declares more than one root task: {keys:?}")]
    MultipleRootTasks { keys: Vec<String>, descriptor: Value },

    #[error("Missing required parameter: {key}")]
    KeyError { key: String, descriptor: Value },

    #[error("Invalid parameters: {message}")]
    InvalidParameters { message: String, descriptor: Value },

    #[error("{kind}: {message}")]
    Handler {
        kind: String,
        message: String,
        data: Value,
    },

    #[error("Handler timed out after {timeout:?}")]
    HandlerTimeout { timeout: Duration },

    #[error("Handler panicked: {message}")]
    HandlerPanicked { message: String },

    /// A run of the task was dropped before it settled. The handler is not
    /// invoked a second time.
    #[error("Task {task} was interrupted before it settled")]
    Interrupted { task: String },

    #[error("Task {task} failed: {cause}")]
    HandlerFailed {
        task: String,
        #[source]
        cause: Box<TaskError>,
    },

    #[error("Task {task} failed: {} child task(s) failed", .failures.len())]
    ChildrenFailed {
        task: String,
        failures: Vec<TaskError>,
    },
}

pub type Result<T> = std::result::Result<T, TaskError>;

/// Serializable view of a [`TaskError`], suitable for logs and UI display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskFailure {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    #[serde(default)]
    pub data: Value,
}

impl TaskError {
    /// Build a handler-specific failure. Handlers use this for everything the
    /// engine has no dedicated variant for.
    pub fn handler(kind: impl Into<String>, message: impl Into<String>) -> Self {
        TaskError::Handler {
            kind: kind.into(),
            message: message.into(),
            data: Value::Null,
        }
    }

    /// Attach diagnostic data to a handler failure. Other variants are returned unchanged.
    pub fn with_data(self, data: Value) -> Self {
        match self {
            TaskError::Handler { kind, message, .. } => TaskError::Handler {
                kind,
                message,
                data,
            },
            other => other,
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            TaskError::TaskNotFound { .. } => "TaskNotFound",
            TaskError::InvalidTask { .. } => "InvalidTask",
            TaskError::MalformedEntry { .. } => "MalformedEntry",
            TaskError::InvalidEntry { .. } => "InvalidEntry",
            TaskError::NoTaskFound { .. } => "NoTaskFound",
            TaskError::MultipleRootTasks { .. } => "MultipleRootTasks",
            TaskError::KeyError { .. } => "KeyError",
            TaskError::InvalidParameters { .. } => "InvalidParameters",
            TaskError::Handler { kind, .. } => kind.as_str(),
            TaskError::HandlerTimeout { .. } => "HandlerTimeout",
            TaskError::HandlerPanicked { .. } => "HandlerPanicked",
            TaskError::Interrupted { .. } => "Interrupted",
            TaskError::HandlerFailed { .. } => "TaskFailed",
            TaskError::ChildrenFailed { .. } => "TaskFailed",
        }
    }

    /// Diagnostic payload. Nested causes are rendered as failures themselves.
    pub fn data(&self) -> Value {
        match self {
            TaskError::TaskNotFound { name } => json!({ "name": name }),
            TaskError::InvalidTask {
                name,
                descriptor,
                context,
                cause,
            } => json!({
                "name": name,
                "descriptor": descriptor,
                "context": context,
                "cause": cause.to_failure(),
            }),
            TaskError::MalformedEntry { entry, reason } => {
                json!({ "entry": entry, "reason": reason })
            }
            TaskError::InvalidEntry { entry, cause } => {
                json!({ "entry": entry, "cause": cause.to_failure() })
            }
            TaskError::NoTaskFound { descriptor } => json!({ "descriptor": descriptor }),
            TaskError::MultipleRootTasks { keys, descriptor } => {
                json!({ "keys": keys, "descriptor": descriptor })
            }
            TaskError::KeyError { key, descriptor } => {
                json!({ "key": key, "descriptor": descriptor })
            }
            TaskError::InvalidParameters { descriptor, .. } => {
                json!({ "descriptor": descriptor })
            }
            TaskError::Handler { data, .. } => data.clone(),
            TaskError::HandlerTimeout { timeout } => {
                let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                json!({ "timeout_ms": timeout_ms })
            }
            TaskError::HandlerPanicked { .. } => Value::Null,
            TaskError::Interrupted { task } => json!({ "task": task }),
            TaskError::HandlerFailed { task, cause } => {
                json!({ "task": task, "cause": cause.to_failure() })
            }
            TaskError::ChildrenFailed { task, failures } => json!({
                "task": task,
                "failures": failures.iter().map(TaskError::to_failure).collect::<Vec<_>>(),
            }),
        }
    }

    pub fn to_failure(&self) -> TaskFailure {
        TaskFailure {
            kind: self.kind().to_string(),
            message: self.to_string(),
            data: self.data(),
        }
    }

    /// Errors directly wrapped by this one, in declaration order.
    pub fn causes(&self) -> Vec<&TaskError> {
        match self {
            TaskError::InvalidTask { cause, .. }
            | TaskError::InvalidEntry { cause, .. }
            | TaskError::HandlerFailed { cause, .. } => vec![cause.as_ref()],
            TaskError::ChildrenFailed { failures, .. } => failures.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// This error followed by every nested cause, depth-first.
    pub fn chain(&self) -> Vec<&TaskError> {
        let mut chain = vec![self];
        for cause in self.causes() {
            chain.extend(cause.chain());
        }
        chain
    }

    /// Follows the first cause until an error without causes is reached.
    pub fn root_cause(&self) -> &TaskError {
        let mut current = self;
        while let Some(next) = current.causes().first().copied() {
            current = next;
        }
        current
    }
}

impl From<&TaskError> for TaskFailure {
    fn from(error: &TaskError) -> Self {
        error.to_failure()
    }
}

impl std::fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)
    }
}
