// ABOUTME: Descriptor loading from JSON/YAML and structural validation
// ABOUTME: Extracts single-key task entries and walks nested 'after' lists

use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tokio::fs;
use tracing::debug;

use super::error::{ParserError, Result, ShapeError};

/// Key holding the follow-up tasks of a task configuration.
pub const AFTER_KEY: &str = "after";

/// One `{ "<type>": <config> }` entry of a descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskEntry {
    pub task_type: String,
    pub config: Value,
}

impl TaskEntry {
    /// Split a single-key mapping into its task type and configuration.
    pub fn from_value(value: &Value) -> std::result::Result<Self, ShapeError> {
        let map = value.as_object().ok_or(ShapeError::NotAMapping {
            found: value_kind(value),
        })?;

        let mut entries = map.iter();
        match (entries.next(), entries.next()) {
            (None, _) => Err(ShapeError::Empty),
            (Some((task_type, config)), None) => Ok(Self {
                task_type: task_type.clone(),
                config: config.clone(),
            }),
            _ => Err(ShapeError::MultipleKeys {
                keys: map.keys().cloned().collect(),
            }),
        }
    }
}

/// Human readable name of a JSON value kind, used in error messages.
pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "mapping",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DescriptorFormat {
    Json,
    Yaml,
}

impl DescriptorFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Some(DescriptorFormat::Json),
            Some("yaml") | Some("yml") => Some(DescriptorFormat::Yaml),
            _ => None,
        }
    }
}

/// A task as seen by the shape walker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskOutline {
    pub depth: usize,
    pub path: String,
    pub task_type: String,
    pub parameters: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShapeReport {
    pub root: String,
    pub tasks: Vec<TaskOutline>,
    pub depth: usize,
}

impl ShapeReport {
    pub fn total_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Task types in depth-first order, duplicates included.
    pub fn task_types(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.task_type.as_str()).collect()
    }

    /// Distinct task types that are not in `known`, in first-seen order.
    pub fn unknown_types(&self, known: &[String]) -> Vec<String> {
        let mut unknown: Vec<String> = Vec::new();
        for task in &self.tasks {
            if !known.contains(&task.task_type) && !unknown.contains(&task.task_type) {
                unknown.push(task.task_type.clone());
            }
        }
        unknown
    }
}

pub struct DescriptorParser;

impl DescriptorParser {
    pub fn new() -> Self {
        Self
    }

    /// Load a descriptor file. The format follows the extension; unknown
    /// extensions are tried as JSON first, then YAML, and fail with both errors.
    pub async fn parse_file<P: AsRef<Path>>(&self, path: P) -> Result<Value> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).await?;
        debug!("Read descriptor file {} ({} bytes)", path.display(), content.len());

        match DescriptorFormat::from_path(path) {
            Some(format) => self.parse_str(&content, format),
            None => match serde_json::from_str(&content) {
                Ok(value) => Ok(value),
                Err(json) => serde_yaml::from_str(&content)
                    .map_err(|yaml| ParserError::UnknownFormat { json, yaml }),
            },
        }
    }

    pub fn parse_str(&self, content: &str, format: DescriptorFormat) -> Result<Value> {
        match format {
            DescriptorFormat::Json => Ok(serde_json::from_str(content)?),
            DescriptorFormat::Yaml => Ok(serde_yaml::from_str(content)?),
        }
    }

    /// Check the structure of a descriptor without resolving any handler.
    pub fn validate_shape(&self, descriptor: &Value) -> Result<ShapeReport> {
        let root = TaskEntry::from_value(descriptor).map_err(|error| ParserError::Shape {
            path: "$".to_string(),
            error,
        })?;

        let mut report = ShapeReport {
            root: root.task_type.clone(),
            tasks: Vec::new(),
            depth: 0,
        };
        let path = root.task_type.clone();
        walk(root, path, 1, &mut report)?;
        Ok(report)
    }
}

impl Default for DescriptorParser {
    fn default() -> Self {
        Self::new()
    }
}

fn walk(entry: TaskEntry, path: String, depth: usize, report: &mut ShapeReport) -> Result<()> {
    report.depth = report.depth.max(depth);

    let config = match entry.config {
        Value::Null => serde_json::Map::new(),
        Value::Object(config) => config,
        other => {
            return Err(ParserError::Shape {
                path,
                error: ShapeError::ConfigNotAMapping {
                    task_type: entry.task_type,
                    found: value_kind(&other),
                },
            })
        }
    };

    report.tasks.push(TaskOutline {
        depth,
        path: path.clone(),
        task_type: entry.task_type.clone(),
        parameters: config
            .keys()
            .filter(|key| key.as_str() != AFTER_KEY)
            .cloned()
            .collect(),
    });

    let children = match config.get(AFTER_KEY) {
        None | Some(Value::Null) => return Ok(()),
        Some(Value::Array(children)) => children,
        Some(other) => {
            return Err(ParserError::Shape {
                path,
                error: ShapeError::AfterNotAList {
                    task_type: entry.task_type,
                    found: value_kind(other),
                },
            })
        }
    };

    for (index, child) in children.iter().enumerate() {
        let entry_path = format!("{path}.after[{index}]");
        let child = TaskEntry::from_value(child).map_err(|error| ParserError::Shape {
            path: entry_path.clone(),
            error,
        })?;
        let child_path = format!("{entry_path}.{}", child.task_type);
        walk(child, child_path, depth + 1, report)?;
    }

    Ok(())
}
