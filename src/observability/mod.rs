//! Observability subsystem for aerostore
//!
//! Structured logging for data-source lifecycle and store events:
//! - Structured logs (JSON lines)
//! - Deterministic key ordering
//! - Explicit severity levels
//! - One log line = one event
//! - Synchronous, no buffering

mod logger;

pub use logger::{Logger, Severity};
