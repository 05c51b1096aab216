// ABOUTME: Context and descriptor types threaded through a task tree
// ABOUTME: Provides the shallow merge and derivation rules applied between parent and children

use serde_json::{Map, Value};

/// Parameters of one task, i.e. the value under its type key.
pub type Descriptor = Map<String, Value>;

/// Results of ancestor tasks keyed by task type, plus any caller supplied keys.
pub type Context = Map<String, Value>;

/// Shallow merge of a node's default context with the context handed in by
/// its invoker. Keys from `overrides` win.
pub fn merge_context(defaults: &Context, overrides: Option<Context>) -> Context {
    let mut effective = defaults.clone();
    if let Some(overrides) = overrides {
        effective.extend(overrides);
    }
    effective
}

/// Context handed to the children of a task that produced `result`.
pub fn derive_context(effective: &Context, task_type: &str, result: &Value) -> Context {
    let mut derived = effective.clone();
    derived.insert(task_type.to_string(), result.clone());
    derived
}
