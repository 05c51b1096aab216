// ABOUTME: Compiles descriptor entries into task node trees
// ABOUTME: Resolves handlers up front so unknown task types fail before anything runs

use serde_json::{Map, Value};
use tracing::debug;

use super::context::{Context, Descriptor};
use super::error::{Result, TaskError};
use super::node::TaskNode;
use super::registry::HandlerRegistry;
use crate::parser::{value_kind, TaskEntry, AFTER_KEY};

pub struct TaskCompiler<'a> {
    registry: &'a HandlerRegistry,
}

impl<'a> TaskCompiler<'a> {
    pub fn new(registry: &'a HandlerRegistry) -> Self {
        Self { registry }
    }

    /// Compile the task `name` with its parameters and default context.
    ///
    /// An unregistered `name` fails with [`TaskError::TaskNotFound`]. Any other
    /// problem, including one in a nested `after` entry, fails with
    /// [`TaskError::InvalidTask`] carrying the offending input and the cause.
    pub fn compile(
        &self,
        name: &str,
        descriptor: Option<Value>,
        context: Option<Context>,
    ) -> Result<TaskNode> {
        let handler = self
            .registry
            .lookup(name)
            .ok_or_else(|| TaskError::TaskNotFound {
                name: name.to_string(),
            })?;

        let context = context.unwrap_or_default();
        let raw = descriptor.clone().unwrap_or(Value::Null);

        let build = || -> Result<TaskNode> {
            let descriptor = normalize_descriptor(descriptor)?;
            let children = self.compile_children(&descriptor)?;
            debug!(
                "Compiled task {} with {} child task(s)",
                name,
                children.len()
            );
            Ok(TaskNode::new(
                name.to_string(),
                descriptor,
                context.clone(),
                handler,
                children,
            ))
        };

        build().map_err(|cause| TaskError::InvalidTask {
            name: name.to_string(),
            descriptor: raw,
            context: Value::Object(context.clone()),
            cause: Box::new(cause),
        })
    }

    fn compile_children(&self, descriptor: &Descriptor) -> Result<Vec<TaskNode>> {
        let entries = match descriptor.get(AFTER_KEY) {
            None | Some(Value::Null) => return Ok(Vec::new()),
            Some(Value::Array(entries)) => entries,
            Some(other) => {
                return Err(TaskError::MalformedEntry {
                    entry: AFTER_KEY.to_string(),
                    reason: format!("expected a list, found {}", value_kind(other)),
                })
            }
        };

        entries
            .iter()
            .enumerate()
            .map(|(index, entry)| self.compile_entry(index, entry))
            .collect()
    }

    fn compile_entry(&self, index: usize, entry: &Value) -> Result<TaskNode> {
        let label = format!("{AFTER_KEY}[{index}]");

        let entry = TaskEntry::from_value(entry).map_err(|error| TaskError::MalformedEntry {
            entry: label.clone(),
            reason: error.to_string(),
        })?;

        self.compile(&entry.task_type, Some(entry.config), None)
            .map_err(|cause| TaskError::InvalidEntry {
                entry: label,
                cause: Box::new(cause),
            })
    }
}

fn normalize_descriptor(descriptor: Option<Value>) -> Result<Descriptor> {
    match descriptor {
        None | Some(Value::Null) => Ok(Map::new()),
        Some(Value::Object(descriptor)) => Ok(descriptor),
        Some(other) => Err(TaskError::MalformedEntry {
            entry: "descriptor".to_string(),
            reason: format!("expected a mapping, found {}", value_kind(&other)),
        }),
    }
}
