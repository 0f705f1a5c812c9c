//! Structured logging setup and NDJSON result output.

mod format;

pub use format::{LogEvent, StructuredLogger};
