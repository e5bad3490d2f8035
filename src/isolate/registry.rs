//! Isolate lifecycle and plan invocation
//!
//! The registry map is held behind one mutex and each isolate behind its
//! own, so different isolates plan in parallel while one isolate admits a
//! single plan at a time.

use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroU64;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::PlannerConfig;
use crate::observability::{log_event_with_fields, Event, PlannerMetrics};

use super::errors::{IsolateError, IsolateResult};
use super::guard::IsolateGuard;
use super::request::{PlanRequest, PlanResponse};
use super::session::IsolateSession;

/// Opaque token naming one isolate.
///
/// Ids are never reused, so a handle to a released isolate stays stale
/// forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IsolateHandle(NonZeroU64);

impl IsolateHandle {
    /// Rebuilds a handle from its raw value. `0` is never a handle.
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(IsolateHandle)
    }

    pub fn as_raw(&self) -> u64 {
        self.0.get()
    }
}

impl fmt::Display for IsolateHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Creates, services and releases isolates
pub struct IsolateRegistry {
    config: PlannerConfig,
    isolates: Mutex<HashMap<u64, Arc<Mutex<IsolateSession>>>>,
    next_id: AtomicU64,
    metrics: PlannerMetrics,
}

impl IsolateRegistry {
    pub fn new(config: PlannerConfig) -> Self {
        Self {
            config,
            isolates: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            metrics: PlannerMetrics::new(),
        }
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn metrics(&self) -> &PlannerMetrics {
        &self.metrics
    }

    /// Number of isolates created and not yet released
    pub fn live_count(&self) -> usize {
        self.isolates.lock().len()
    }

    /// Allocates a new isolate.
    ///
    /// Fails with [`IsolateError::Exhausted`] when `max_isolates` are live.
    pub fn create(&self) -> IsolateResult<IsolateHandle> {
        let mut isolates = self.isolates.lock();

        if isolates.len() >= self.config.max_isolates {
            drop(isolates);
            self.metrics.increment_isolates_exhausted();
            let limit = self.config.max_isolates.to_string();
            log_event_with_fields(Event::IsolateExhausted, &[("limit", &limit)]);
            return Err(IsolateError::Exhausted {
                limit: self.config.max_isolates,
            });
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = IsolateHandle::from_raw(id).ok_or(IsolateError::Stale(id))?;
        isolates.insert(id, Arc::new(Mutex::new(IsolateSession::new(id, &self.config))));
        drop(isolates);

        self.metrics.increment_isolates_created();
        log_event_with_fields(Event::IsolateCreated, &[("isolate", &handle.to_string())]);

        Ok(handle)
    }

    /// Releases an isolate.
    ///
    /// Waits for a plan in flight on the same isolate to finish. Releasing
    /// an unknown or already released handle fails with
    /// [`IsolateError::Stale`].
    pub fn release(&self, handle: IsolateHandle) -> IsolateResult<()> {
        let removed = self.isolates.lock().remove(&handle.as_raw());

        let session = match removed {
            Some(session) => session,
            None => return Err(self.stale(handle)),
        };

        let plans_served = {
            let mut session = session.lock();
            session.mark_released();
            session.plans_served()
        };

        self.metrics.increment_isolates_released();
        log_event_with_fields(
            Event::IsolateReleased,
            &[
                ("isolate", &handle.to_string()),
                ("plans", &plans_served.to_string()),
            ],
        );

        Ok(())
    }

    /// Plans `request` on the isolate named by `handle`.
    ///
    /// Calls on the same handle are serialised. The response is a fresh
    /// value owned by the caller.
    pub fn plan(&self, handle: IsolateHandle, request: &PlanRequest) -> IsolateResult<PlanResponse> {
        let session = self.isolates.lock().get(&handle.as_raw()).cloned();

        let session = match session {
            Some(session) => session,
            None => return Err(self.stale(handle)),
        };

        let mut session = session.lock();
        if session.is_released() {
            // Released between lookup and lock
            drop(session);
            return Err(self.stale(handle));
        }

        session.plan(request, &self.metrics)
    }

    /// Creates an isolate that is released when the guard drops
    pub fn scoped(&self) -> IsolateResult<IsolateGuard<'_>> {
        let handle = self.create()?;
        Ok(IsolateGuard::new(self, handle))
    }

    fn stale(&self, handle: IsolateHandle) -> IsolateError {
        self.metrics.increment_stale_handle_uses();
        log_event_with_fields(Event::IsolateStale, &[("isolate", &handle.to_string())]);
        IsolateError::Stale(handle.as_raw())
    }
}

impl Default for IsolateRegistry {
    fn default() -> Self {
        Self::new(PlannerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::write_sales_database;
    use tempfile::TempDir;

    fn registry(max_isolates: usize) -> IsolateRegistry {
        IsolateRegistry::new(PlannerConfig {
            max_isolates,
            ..PlannerConfig::default()
        })
    }

    #[test]
    fn test_handles_are_distinct() {
        let registry = registry(8);
        let a = registry.create().unwrap();
        let b = registry.create().unwrap();
        assert_ne!(a, b);
        assert_eq!(registry.live_count(), 2);
    }

    #[test]
    fn test_exhaustion_and_recovery() {
        let registry = registry(2);
        let a = registry.create().unwrap();
        let _b = registry.create().unwrap();

        let err = registry.create().unwrap_err();
        assert!(matches!(err, IsolateError::Exhausted { limit: 2 }));

        registry.release(a).unwrap();
        assert!(registry.create().is_ok());
        assert_eq!(registry.metrics().snapshot().isolates_exhausted, 1);
    }

    #[test]
    fn test_release_twice_is_stale() {
        let registry = registry(4);
        let handle = registry.create().unwrap();
        registry.release(handle).unwrap();

        let err = registry.release(handle).unwrap_err();
        assert!(matches!(err, IsolateError::Stale(id) if id == handle.as_raw()));
    }

    #[test]
    fn test_plan_after_release_is_stale() {
        let dir = TempDir::new().unwrap();
        write_sales_database(dir.path());

        let registry = registry(4);
        let handle = registry.create().unwrap();
        let request = PlanRequest::from_text(dir.path(), "SELECT * FROM orders");
        assert!(registry.plan(handle, &request).is_ok());

        registry.release(handle).unwrap();
        let err = registry.plan(handle, &request).unwrap_err();
        assert_eq!(err.code(), "AETHRA_ISOLATE_STALE");
        assert_eq!(registry.metrics().snapshot().stale_handle_uses, 1);
    }

    #[test]
    fn test_ids_never_reused() {
        let registry = registry(1);
        let first = registry.create().unwrap();
        registry.release(first).unwrap();
        let second = registry.create().unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_zero_is_not_a_handle() {
        assert!(IsolateHandle::from_raw(0).is_none());
        assert_eq!(IsolateHandle::from_raw(7).unwrap().as_raw(), 7);
    }
}
