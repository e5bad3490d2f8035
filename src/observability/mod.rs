//! Observability for the planner
//!
//! - Structured logging (JSON lines on stderr)
//! - Monotonic counters
//! - Typed lifecycle events
//!
//! Observability is read-only: nothing here changes planning results.
//!
//! ```ignore
//! use aethra_planner::observability::{Event, Logger, ObservationScope};
//!
//! Logger::info("PLAN_RECEIVED", &[("isolate", "1")]);
//! log_event_with_fields(Event::IsolateCreated, &[("isolate", "1")]);
//! ```

mod events;
mod logger;
mod metrics;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use metrics::{MetricsSnapshot, PlannerMetrics};
pub use scope::{ObservationScope, Timer};

/// Log a lifecycle event with fields
///
/// Failure events are logged at WARN, everything else at INFO.
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_failure() {
        Severity::Warn
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_event() {
        log_event_with_fields(Event::SessionStart, &[]);
        log_event_with_fields(Event::SessionEnd, &[]);
    }

    #[test]
    fn test_log_event_with_fields() {
        log_event_with_fields(Event::IsolateCreated, &[("isolate", "7")]);
        log_event_with_fields(Event::PlanRejected, &[("code", "AETHRA_QUERY_PARSE")]);
    }
}
