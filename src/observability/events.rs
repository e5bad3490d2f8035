//! Observable planner events
//!
//! Events are explicit and typed.

use std::fmt;

/// Observable events in the planner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded
    ConfigLoaded,

    // Isolate lifecycle
    /// New isolate allocated
    IsolateCreated,
    /// Isolate released by its owner
    IsolateReleased,
    /// Isolate creation refused, registry at capacity
    IsolateExhausted,
    /// Plan request issued against an unknown or released isolate
    IsolateStale,

    // Planning
    /// Plan request accepted by an isolate
    PlanReceived,
    /// Database catalog built from the Arrow directory
    CatalogLoaded,
    /// Catalog served from the isolate cache
    CatalogCacheHit,
    /// Rule program finished
    PlanOptimised,
    /// Plan encoded for the engine
    PlanEncoded,
    /// Plan request rejected
    PlanRejected,

    // Session
    /// CLI session started
    SessionStart,
    /// CLI session ended
    SessionEnd,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",

            Event::IsolateCreated => "ISOLATE_CREATED",
            Event::IsolateReleased => "ISOLATE_RELEASED",
            Event::IsolateExhausted => "ISOLATE_EXHAUSTED",
            Event::IsolateStale => "ISOLATE_STALE",

            Event::PlanReceived => "PLAN_RECEIVED",
            Event::CatalogLoaded => "CATALOG_LOADED",
            Event::CatalogCacheHit => "CATALOG_CACHE_HIT",
            Event::PlanOptimised => "PLAN_OPTIMISED",
            Event::PlanEncoded => "PLAN_ENCODED",
            Event::PlanRejected => "PLAN_REJECTED",

            Event::SessionStart => "SESSION_START",
            Event::SessionEnd => "SESSION_END",
        }
    }

    /// Returns true if this event reports a failure
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Event::IsolateExhausted | Event::IsolateStale | Event::PlanRejected
        )
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_events_have_string_representation() {
        let events = [
            Event::ConfigLoaded,
            Event::IsolateCreated,
            Event::IsolateReleased,
            Event::IsolateExhausted,
            Event::IsolateStale,
            Event::PlanReceived,
            Event::CatalogLoaded,
            Event::CatalogCacheHit,
            Event::PlanOptimised,
            Event::PlanEncoded,
            Event::PlanRejected,
            Event::SessionStart,
            Event::SessionEnd,
        ];

        for event in events {
            let s = event.as_str();
            assert!(!s.is_empty());
            assert!(s.chars().all(|c| c.is_uppercase() || c == '_'));
        }
    }

    #[test]
    fn test_failure_events() {
        assert!(Event::PlanRejected.is_failure());
        assert!(Event::IsolateStale.is_failure());
        assert!(!Event::IsolateCreated.is_failure());
    }
}
