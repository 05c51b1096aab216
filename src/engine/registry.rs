// ABOUTME: Registry mapping task type names to their handlers
// ABOUTME: Holds the process-wide registry populated by collaborators at startup

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};
use tracing::debug;

use super::context::{Context, Descriptor};
use super::handler::{handler_fn, HandlerResult, TaskHandler};

#[derive(Default)]
pub struct HandlerRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn TaskHandler>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `handler` to `name`. An existing binding is replaced.
    pub fn register<H>(&self, name: impl Into<String>, handler: H)
    where
        H: TaskHandler + 'static,
    {
        self.register_arc(name, Arc::new(handler));
    }

    pub fn register_arc(&self, name: impl Into<String>, handler: Arc<dyn TaskHandler>) {
        let name = name.into();
        let mut handlers = self.handlers.write().unwrap_or_else(PoisonError::into_inner);
        if handlers.insert(name.clone(), handler).is_some() {
            debug!("Replaced handler for task type: {}", name);
        } else {
            debug!("Registered handler for task type: {}", name);
        }
    }

    /// Register an async closure as the handler for `name`.
    pub fn register_fn<F, Fut>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(Descriptor, Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register(name, handler_fn(f));
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<dyn TaskHandler>> {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        handlers.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        handlers.contains_key(name)
    }

    /// Registered task types, sorted.
    pub fn names(&self) -> Vec<String> {
        let handlers = self.handlers.read().unwrap_or_else(PoisonError::into_inner);
        let mut names: Vec<String> = handlers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}

static GLOBAL: OnceLock<Arc<HandlerRegistry>> = OnceLock::new();

/// The process-wide registry.
pub fn global() -> Arc<HandlerRegistry> {
    Arc::clone(GLOBAL.get_or_init(|| Arc::new(HandlerRegistry::new())))
}

/// Register `handler` for `name` in the process-wide registry.
pub fn register_handler<H>(name: impl Into<String>, handler: H)
where
    H: TaskHandler + 'static,
{
    global().register(name, handler);
}
