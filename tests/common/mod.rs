// ABOUTME: Common utilities and helpers for integration tests
// ABOUTME: Provides recording handlers and descriptor helpers shared by the test suites

#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use automator::{handler_fn, Automator, Context, Descriptor, TaskError, TaskHandler};

/// One handler invocation as seen by a [`Recorder`].
#[derive(Debug, Clone)]
pub struct Call {
    pub task_type: String,
    pub descriptor: Descriptor,
    pub context: Context,
}

/// Records handler invocations and start/end events across a run.
#[derive(Clone, Default)]
pub struct Recorder {
    calls: Arc<Mutex<Vec<Call>>>,
    events: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handler resolving with `result`. A `delay_ms` parameter makes it sleep first.
    pub fn handler(&self, task_type: &str, result: Value) -> Arc<dyn TaskHandler> {
        self.build(task_type, Ok(result))
    }

    /// Handler failing with `error`. A `delay_ms` parameter makes it sleep first.
    pub fn failing(&self, task_type: &str, error: TaskError) -> Arc<dyn TaskHandler> {
        self.build(task_type, Err(error))
    }

    fn build(&self, task_type: &str, outcome: Result<Value, TaskError>) -> Arc<dyn TaskHandler> {
        let recorder = self.clone();
        let task_type = task_type.to_string();

        Arc::new(handler_fn(move |descriptor: Descriptor, context: Context| {
            let recorder = recorder.clone();
            let task_type = task_type.clone();
            let outcome = outcome.clone();

            async move {
                recorder.event(format!("start:{task_type}"));
                recorder.calls.lock().unwrap().push(Call {
                    task_type: task_type.clone(),
                    descriptor: descriptor.clone(),
                    context,
                });

                if let Some(delay) = descriptor.get("delay_ms").and_then(Value::as_u64) {
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }

                recorder.event(format!("end:{task_type}"));
                outcome
            }
        }))
    }

    pub fn event(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, task_type: &str) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.task_type == task_type)
            .collect()
    }

    pub fn count(&self, task_type: &str) -> usize {
        self.calls_for(task_type).len()
    }

    /// Position of `event` in the event log.
    pub fn position(&self, event: &str) -> Option<usize> {
        self.events().iter().position(|e| e == event)
    }
}

/// Automator whose handlers each resolve with `{ "<type>": "<type>-result" }`.
pub fn recording_automator(recorder: &Recorder, task_types: &[&str]) -> Automator {
    let automator = Automator::new();
    for task_type in task_types {
        automator
            .registry()
            .register_arc(*task_type, recorder.handler(task_type, result_of(task_type)));
    }
    automator
}

/// Result produced by the default recording handler of `task_type`.
pub fn result_of(task_type: &str) -> Value {
    json!({ "id": format!("{task_type}-result") })
}

pub fn map(value: Value) -> serde_json::Map<String, Value> {
    value
        .as_object()
        .cloned()
        .expect("test helper expects a JSON object")
}
