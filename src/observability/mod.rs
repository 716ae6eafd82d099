//! Observability subsystem
//!
//! - Structured logging (JSON lines)
//! - Process-wide counters
//! - Typed lifecycle events
//!
//! Observability is read-only: nothing here can fail or alter the
//! operation being observed.

mod events;
mod logger;
mod metrics;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{metrics, MetricsRegistry, MetricsSnapshot};

/// Log a typed event with fields.
///
/// Warning events go out at WARN, chatty per-record events at TRACE and
/// everything else at INFO.
pub fn log_event(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_warning() {
        Severity::Warn
    } else if event.is_chatty() {
        Severity::Trace
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event_does_not_panic() {
        log_event(Event::SchemasRegistered, &[("count", "3")]);
        log_event(Event::StorageDecodeAnomaly, &[("field", "age")]);
    }
}
