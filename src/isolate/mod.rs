//! Isolate lifecycle manager and plan invocation gateway
//!
//! An isolate is an independent planner context with its own rule program
//! and catalog cache. Callers create one, send it plan requests, and
//! release it:
//!
//! ```ignore
//! let registry = IsolateRegistry::new(config);
//! let handle = registry.create()?;
//! let response = registry.plan(handle, &PlanRequest::from_paths(db, query))?;
//! registry.release(handle)?;
//! ```
//!
//! A plan request is only serviced by a live isolate. Release waits for a
//! plan in flight on the same isolate, and any plan issued afterwards fails
//! with [`IsolateError::Stale`].

mod errors;
mod guard;
mod registry;
mod request;
mod session;

pub use errors::{IsolateError, IsolateResult};
pub use guard::IsolateGuard;
pub use registry::{IsolateHandle, IsolateRegistry};
pub use request::{PlanRequest, PlanResponse, QuerySource};
pub use session::IsolateSession;
