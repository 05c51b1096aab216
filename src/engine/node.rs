// ABOUTME: Compiled task node and its run state machine
// ABOUTME: Runs a handler once, then its children concurrently against the derived context

use chrono::{DateTime, Utc};
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OnceCell;
use tracing::{debug, error, info_span, Instrument};

use super::context::{derive_context, merge_context, Context, Descriptor};
use super::error::TaskError;
use super::handler::{HandlerResult, TaskHandler};
use super::result::{TaskState, TaskSummary};

#[derive(Debug)]
struct NodeStatus {
    state: TaskState,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    last_error: Option<TaskError>,
}

/// One compiled entry of a descriptor tree.
///
/// A node executes at most once. The first call to [`TaskNode::run`] starts
/// the handler; every later or concurrent call awaits and returns that same
/// outcome. Children are run only after the node's own handler succeeded,
/// each with its own copy of the derived context.
pub struct TaskNode {
    task_type: String,
    descriptor: Descriptor,
    default_context: Context,
    handler: Arc<dyn TaskHandler>,
    children: Vec<TaskNode>,
    status: Mutex<NodeStatus>,
    outcome: OnceCell<HandlerResult>,
}

impl TaskNode {
    pub(crate) fn new(
        task_type: String,
        descriptor: Descriptor,
        default_context: Context,
        handler: Arc<dyn TaskHandler>,
        children: Vec<TaskNode>,
    ) -> Self {
        Self {
            task_type,
            descriptor,
            default_context,
            handler,
            children,
            status: Mutex::new(NodeStatus {
                state: TaskState::Idle,
                started_at: None,
                finished_at: None,
                last_error: None,
            }),
            outcome: OnceCell::new(),
        }
    }

    pub fn task_type(&self) -> &str {
        &self.task_type
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    pub fn default_context(&self) -> &Context {
        &self.default_context
    }

    pub fn children(&self) -> &[TaskNode] {
        &self.children
    }

    pub fn state(&self) -> TaskState {
        self.status().state
    }

    /// The failure this node settled with, if it ended in error.
    pub fn last_error(&self) -> Option<TaskError> {
        self.status().last_error.clone()
    }

    /// The settled outcome, without waiting for an in-flight run.
    pub fn outcome(&self) -> Option<HandlerResult> {
        self.outcome.get().cloned()
    }

    /// Run this node and its descendants.
    ///
    /// `context` is merged over the node's default context, keys from
    /// `context` winning. Only the first invocation's context is used.
    /// If a run is dropped before it settles, later runs fail with
    /// [`TaskError::Interrupted`] instead of invoking the handler again.
    pub fn run(&self, context: Option<Context>) -> BoxFuture<'_, HandlerResult> {
        async move {
            self.outcome
                .get_or_init(|| self.execute(context))
                .await
                .clone()
        }
        .boxed()
    }

    async fn execute(&self, context: Option<Context>) -> HandlerResult {
        let span = info_span!("task", task = %self.task_type);
        async move {
            if !self.begin() {
                // A dropped run already invoked the handler.
                return self.fail(TaskError::Interrupted {
                    task: self.task_type.clone(),
                });
            }

            let effective = merge_context(&self.default_context, context);
            debug!("Starting handler with {} context key(s)", effective.len());

            let outcome = AssertUnwindSafe(
                self.handler
                    .execute(self.descriptor.clone(), effective.clone()),
            )
            .catch_unwind()
            .await;

            let result = match outcome {
                Ok(Ok(result)) => result,
                Ok(Err(cause)) => return self.fail(self.handler_failed(cause)),
                Err(panic) => {
                    let cause = TaskError::HandlerPanicked {
                        message: panic_message(panic.as_ref()),
                    };
                    return self.fail(self.handler_failed(cause));
                }
            };

            if !self.children.is_empty() {
                let derived = derive_context(&effective, &self.task_type, &result);
                debug!("Running {} child task(s)", self.children.len());

                let settled = join_all(
                    self.children
                        .iter()
                        .map(|child| child.run(Some(derived.clone()))),
                )
                .await;

                let failures: Vec<TaskError> =
                    settled.into_iter().filter_map(Result::err).collect();
                if !failures.is_empty() {
                    return self.fail(TaskError::ChildrenFailed {
                        task: self.task_type.clone(),
                        failures,
                    });
                }
            }

            self.settle(TaskState::Success, None);
            debug!("Task completed successfully");
            Ok(result)
        }
        .instrument(span)
        .await
    }

    fn handler_failed(&self, cause: TaskError) -> TaskError {
        TaskError::HandlerFailed {
            task: self.task_type.clone(),
            cause: Box::new(cause),
        }
    }

    fn fail(&self, failure: TaskError) -> HandlerResult {
        error!("Task {} failed: {}", self.task_type, failure);
        self.settle(TaskState::Error, Some(failure.clone()));
        Err(failure)
    }

    /// Moves `Idle` to `Progress`. Returns false if the node already left `Idle`.
    fn begin(&self) -> bool {
        let mut status = self.status();
        if status.state != TaskState::Idle {
            return false;
        }
        status.state = TaskState::Progress;
        status.started_at = Some(Utc::now());
        true
    }

    fn settle(&self, state: TaskState, failure: Option<TaskError>) {
        let mut status = self.status();
        status.state = state;
        status.finished_at = Some(Utc::now());
        status.last_error = failure;
    }

    fn status(&self) -> MutexGuard<'_, NodeStatus> {
        self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of this node and every descendant.
    pub fn summary(&self) -> TaskSummary {
        let (state, started_at, finished_at, error) = {
            let status = self.status();
            (
                status.state,
                status.started_at,
                status.finished_at,
                status.last_error.as_ref().map(TaskError::to_failure),
            )
        };

        TaskSummary {
            task_type: self.task_type.clone(),
            state,
            started_at,
            finished_at,
            duration_ms: started_at
                .zip(finished_at)
                .map(|(start, end)| (end - start).num_milliseconds()),
            error,
            children: self.children.iter().map(TaskNode::summary).collect(),
        }
    }
}

impl fmt::Debug for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskNode")
            .field("task_type", &self.task_type)
            .field("state", &self.state())
            .field("descriptor", &self.descriptor)
            .field("children", &self.children)
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::handler::handler_fn;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn leaf(task_type: &str, handler: Arc<dyn TaskHandler>) -> TaskNode {
        TaskNode::new(
            task_type.to_string(),
            Descriptor::new(),
            Context::new(),
            handler,
            Vec::new(),
        )
    }

    fn counting(calls: Arc<AtomicUsize>, result: Value) -> Arc<dyn TaskHandler> {
        Arc::new(handler_fn(move |_, _| {
            let calls = Arc::clone(&calls);
            let result = result.clone();
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                Ok(result)
            }
        }))
    }

    #[tokio::test]
    async fn test_run_executes_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let node = leaf("collab", counting(Arc::clone(&calls), json!({ "id": 7 })));

        assert_eq!(node.state(), TaskState::Idle);
        let (first, second) = tokio::join!(node.run(None), node.run(None));
        let third = node.run(None).await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.unwrap(), json!({ "id": 7 }));
        assert_eq!(second.unwrap(), json!({ "id": 7 }));
        assert_eq!(third.unwrap(), json!({ "id": 7 }));
        assert_eq!(node.state(), TaskState::Success);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_run_is_not_executed_again() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let node = leaf(
            "collab",
            Arc::new(handler_fn(move |_, _| {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Ok(json!({ "id": 1 }))
                }
            })),
        );

        let first = tokio::time::timeout(Duration::from_millis(10), node.run(None)).await;
        assert!(first.is_err());
        assert_eq!(node.state(), TaskState::Progress);

        let second = node.run(None).await.unwrap_err();
        let third = node.run(None).await.unwrap_err();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(&second, TaskError::Interrupted { task } if task == "collab"));
        assert_eq!(third.kind(), "Interrupted");
        assert_eq!(node.state(), TaskState::Error);
        assert_eq!(node.last_error().unwrap().kind(), "Interrupted");
    }

    #[tokio::test]
    async fn test_handler_failure_sets_error_state() {
        let node = leaf(
            "collab",
            Arc::new(handler_fn(|_, _| async {
                Err(TaskError::handler("CollabCreateError", "quota exceeded"))
            })),
        );

        let error = node.run(None).await.unwrap_err();

        assert!(matches!(&error, TaskError::HandlerFailed { task, .. } if task == "collab"));
        assert_eq!(error.root_cause().kind(), "CollabCreateError");
        assert_eq!(node.state(), TaskState::Error);
        assert_eq!(node.last_error().unwrap().kind(), "TaskFailed");
        assert!(node.outcome().unwrap().is_err());
    }

    #[tokio::test]
    async fn test_handler_panic_is_reported() {
        let node = leaf(
            "collab",
            Arc::new(handler_fn(|_, _| async {
                let missing: Option<Value> = None;
                Ok(missing.expect("handler exploded"))
            })),
        );

        let error = node.run(None).await.unwrap_err();

        match error.root_cause() {
            TaskError::HandlerPanicked { message } => assert_eq!(message, "handler exploded"),
            other => panic!("unexpected cause: {other:?}"),
        }
        assert_eq!(node.state(), TaskState::Error);
    }

    #[tokio::test]
    async fn test_default_context_merged_with_override() {
        let seen = Arc::new(Mutex::new(None));
        let captured = Arc::clone(&seen);
        let handler: Arc<dyn TaskHandler> = Arc::new(handler_fn(move |_, context: Context| {
            let captured = Arc::clone(&captured);
            async move {
                *captured.lock().unwrap() = Some(Value::Object(context));
                Ok(Value::Null)
            }
        }));
        let node = TaskNode::new(
            "nav".to_string(),
            Descriptor::new(),
            json!({ "user": "alice", "collab": 1 })
                .as_object()
                .cloned()
                .unwrap(),
            handler,
            Vec::new(),
        );

        let overrides = json!({ "collab": 2 }).as_object().cloned().unwrap();
        node.run(Some(overrides)).await.unwrap();

        assert_eq!(
            seen.lock().unwrap().clone().unwrap(),
            json!({ "user": "alice", "collab": 2 })
        );
    }

    #[test]
    fn test_node_is_send_and_sync() {
        fn shareable<T: Send + Sync>() {}
        shareable::<TaskNode>();
    }

    #[tokio::test]
    async fn test_summary_records_timings() {
        let node = leaf("collab", counting(Arc::new(AtomicUsize::new(0)), json!(1)));
        assert!(node.summary().started_at.is_none());

        node.run(None).await.unwrap();

        let summary = node.summary();
        assert_eq!(summary.state, TaskState::Success);
        assert!(summary.started_at.is_some());
        assert!(summary.finished_at.is_some());
        assert!(summary.duration_ms.unwrap() >= 0);
        assert!(summary.error.is_none());
    }
}
