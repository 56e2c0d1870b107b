//! Observability subsystem for tabsight
//!
//! - Structured logging (JSON lines on stderr)
//! - Typed lifecycle events
//! - Scope-based begin/complete logging
//!
//! # Principles
//!
//! 1. Observability is read-only: it never changes what a run produces
//! 2. No async or background threads
//! 3. Deterministic output (no timestamps, sorted fields)
//!
//! ```ignore
//! use tabsight::observability::{log_event_with_fields, Event};
//!
//! log_event_with_fields(Event::PolicySelected, &[("policy", "orders_v1")]);
//! ```

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::ObservationScope;

fn severity_for(event: Event) -> Severity {
    if event.is_fatal() {
        Severity::Fatal
    } else if event.is_warning() {
        Severity::Warn
    } else {
        Severity::Info
    }
}

/// Log a lifecycle event
pub fn log_event(event: Event) {
    Logger::log(severity_for(event), event.as_str(), &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::log(severity_for(event), event.as_str(), fields);
}

/// Log a lifecycle event at TRACE level regardless of its usual severity
pub fn trace_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    Logger::trace(event.as_str(), fields);
}
