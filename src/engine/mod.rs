// ABOUTME: Task orchestration engine module
// ABOUTME: Handles handler registration, descriptor compilation, and task tree execution

pub mod compiler;
pub mod context;
pub mod error;
pub mod handler;
pub mod node;
pub mod registry;
pub mod result;

pub use compiler::TaskCompiler;
pub use context::{Context, Descriptor};
pub use error::{Result, TaskError, TaskFailure};
pub use handler::{handler_fn, with_timeout, HandlerResult, TaskHandler};
pub use node::TaskNode;
pub use registry::{register_handler, HandlerRegistry};
pub use result::{TaskState, TaskSummary};

use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, info_span, warn, Instrument};

use crate::parser::{ShapeError, TaskEntry};

/// Entry point binding a handler registry to descriptor compilation and runs.
#[derive(Clone, Debug)]
pub struct Automator {
    registry: Arc<HandlerRegistry>,
}

impl Automator {
    /// An automator with its own, empty registry.
    pub fn new() -> Self {
        Self::with_registry(Arc::new(HandlerRegistry::new()))
    }

    pub fn with_registry(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    /// An automator backed by the process-wide registry.
    pub fn global() -> Self {
        Self::with_registry(registry::global())
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    pub fn register<H>(&self, name: impl Into<String>, handler: H)
    where
        H: TaskHandler + 'static,
    {
        self.registry.register(name, handler);
    }

    pub fn register_fn<F, Fut>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(Descriptor, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.registry.register_fn(name, f);
    }

    /// Compile a single task without running it.
    pub fn task(
        &self,
        name: &str,
        descriptor: Option<Value>,
        context: Option<Context>,
    ) -> Result<TaskNode> {
        TaskCompiler::new(&self.registry).compile(name, descriptor, context)
    }

    /// Compile the root task of a top-level descriptor.
    ///
    /// The descriptor must be a mapping with exactly one key. `context`
    /// becomes the root task's default context.
    pub fn prepare(&self, descriptor: &Value, context: Option<Context>) -> Result<TaskNode> {
        let root = TaskEntry::from_value(descriptor).map_err(|error| match error {
            ShapeError::MultipleKeys { keys } => TaskError::MultipleRootTasks {
                keys,
                descriptor: descriptor.clone(),
            },
            _ => TaskError::NoTaskFound {
                descriptor: descriptor.clone(),
            },
        })?;

        self.task(&root.task_type, Some(root.config), context)
    }

    /// Compile and run a top-level descriptor, resolving with the root task's result.
    pub async fn run(&self, descriptor: &Value, context: Option<Context>) -> Result<Value> {
        let run_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("run", run_id = %run_id);

        async move {
            let start_time = Instant::now();
            let root = self.prepare(descriptor, context).map_err(|e| {
                warn!("Descriptor rejected: {}", e);
                e
            })?;

            info!("Starting task tree: {}", root.task_type());
            let result = root.run(None).await;

            info!(
                "Task tree {} finished in {:?} with state: {}",
                root.task_type(),
                start_time.elapsed(),
                root.state()
            );
            result
        }
        .instrument(span)
        .await
    }
}

impl Default for Automator {
    fn default() -> Self {
        Self::new()
    }
}

/// Compile a task against the process-wide registry.
pub fn task(name: &str, descriptor: Option<Value>, context: Option<Context>) -> Result<TaskNode> {
    Automator::global().task(name, descriptor, context)
}

/// Run a top-level descriptor against the process-wide registry.
pub async fn run(descriptor: &Value, context: Option<Context>) -> Result<Value> {
    Automator::global().run(descriptor, context).await
}
