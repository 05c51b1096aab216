// ABOUTME: Parser module for task descriptors
// ABOUTME: Exports descriptor loading, entry extraction, and shape validation

pub mod descriptor;
pub mod error;

pub use descriptor::{
    value_kind, DescriptorFormat, DescriptorParser, ShapeReport, TaskEntry, TaskOutline, AFTER_KEY,
};
pub use error::{ParserError, ShapeError};
