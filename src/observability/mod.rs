//! Observability subsystem
//!
//! - Structured logging (JSON lines)
//! - Typed events
//! - Validation counters
//!
//! Observability is read-only: nothing here influences a validation result.

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsRegistry, MetricsSnapshot};
