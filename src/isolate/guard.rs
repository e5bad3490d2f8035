//! Scoped isolate ownership

use super::errors::IsolateResult;
use super::registry::{IsolateHandle, IsolateRegistry};
use super::request::{PlanRequest, PlanResponse};

/// Owns one isolate and releases it when dropped, on every exit path
///
/// ```ignore
/// let guard = registry.scoped()?;
/// let response = guard.plan(&request)?;
/// // isolate released here
/// ```
pub struct IsolateGuard<'a> {
    registry: &'a IsolateRegistry,
    handle: IsolateHandle,
    armed: bool,
}

impl<'a> IsolateGuard<'a> {
    pub(crate) fn new(registry: &'a IsolateRegistry, handle: IsolateHandle) -> Self {
        Self {
            registry,
            handle,
            armed: true,
        }
    }

    /// The guarded handle
    pub fn handle(&self) -> IsolateHandle {
        self.handle
    }

    /// Plans on the guarded isolate
    pub fn plan(&self, request: &PlanRequest) -> IsolateResult<PlanResponse> {
        self.registry.plan(self.handle, request)
    }

    /// Releases now and reports the outcome
    pub fn release(mut self) -> IsolateResult<()> {
        self.armed = false;
        self.registry.release(self.handle)
    }
}

impl Drop for IsolateGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            // Failures are logged by the registry
            let _ = self.registry.release(self.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::PlannerConfig;
    use crate::isolate::IsolateRegistry;

    #[test]
    fn test_drop_releases() {
        let registry = IsolateRegistry::new(PlannerConfig {
            max_isolates: 1,
            ..PlannerConfig::default()
        });

        {
            let guard = registry.scoped().unwrap();
            assert_eq!(guard.handle().as_raw(), 1);
            assert_eq!(registry.live_count(), 1);
            assert!(registry.create().is_err());
        }

        assert_eq!(registry.live_count(), 0);
        assert!(registry.create().is_ok());
    }

    #[test]
    fn test_explicit_release() {
        let registry = IsolateRegistry::default();
        let guard = registry.scoped().unwrap();
        let handle = guard.handle();
        guard.release().unwrap();

        assert_eq!(registry.live_count(), 0);
        assert!(registry.release(handle).is_err());
        assert_eq!(registry.metrics().snapshot().isolates_released, 1);
    }

    #[test]
    fn test_released_on_error_path() {
        fn failing(registry: &IsolateRegistry) -> Result<(), String> {
            let _guard = registry.scoped().map_err(|e| e.to_string())?;
            Err("planning aborted".to_string())
        }

        let registry = IsolateRegistry::default();
        assert!(failing(&registry).is_err());
        assert_eq!(registry.live_count(), 0);
    }
}
