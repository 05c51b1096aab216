// ABOUTME: Main library module for the automator task orchestration engine
// ABOUTME: Exports all core modules and provides the public API

pub mod cli;
pub mod engine;
pub mod params;
pub mod parser;

// Re-export commonly used types
pub use engine::{
    handler_fn, register_handler, run, task, with_timeout, Automator, Context, Descriptor,
    HandlerRegistry, TaskError, TaskFailure, TaskHandler, TaskNode, TaskState, TaskSummary,
};
pub use params::{deserialize_parameters, ensure_parameters, extract_attributes};
pub use parser::{DescriptorParser, TaskEntry};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
