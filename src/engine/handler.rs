// ABOUTME: Handler contract implemented by task type operations
// ABOUTME: Includes the closure adapter and a timeout wrapper for individual handlers

use async_trait::async_trait;
use serde_json::Value;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

use super::context::{Context, Descriptor};
use super::error::TaskError;

pub type HandlerResult = std::result::Result<Value, TaskError>;

/// Operation bound to a task type name.
///
/// A handler receives the task's own parameters and the effective context,
/// which holds the results of every ancestor task keyed by type. Expected
/// failures are returned as `Err`; the engine wraps them with the task name.
#[async_trait]
pub trait TaskHandler: Send + Sync {
    async fn execute(&self, descriptor: Descriptor, context: Context) -> HandlerResult;
}

/// Adapter turning an async closure into a [`TaskHandler`].
pub struct FnHandler<F> {
    f: F,
}

pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Descriptor, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> TaskHandler for FnHandler<F>
where
    F: Fn(Descriptor, Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn execute(&self, descriptor: Descriptor, context: Context) -> HandlerResult {
        (self.f)(descriptor, context).await
    }
}

/// Handler failing with [`TaskError::HandlerTimeout`] when the inner handler
/// does not settle within `duration`. The engine itself never times out.
pub struct Timeout<H> {
    inner: H,
    duration: Duration,
}

pub fn with_timeout<H: TaskHandler>(inner: H, duration: Duration) -> Timeout<H> {
    Timeout { inner, duration }
}

#[async_trait]
impl<H: TaskHandler> TaskHandler for Timeout<H> {
    async fn execute(&self, descriptor: Descriptor, context: Context) -> HandlerResult {
        match timeout(self.duration, self.inner.execute(descriptor, context)).await {
            Ok(result) => result,
            Err(_) => {
                warn!("Handler exceeded timeout of {:?}", self.duration);
                Err(TaskError::HandlerTimeout {
                    timeout: self.duration,
                })
            }
        }
    }
}
