//! C ABI for managed-runtime callers
//!
//! All entry points share one process-wide [`IsolateRegistry`], configured
//! from the file named by `AETHRA_PLANNER_CONFIG` (defaults when unset).
//!
//! Ownership rules:
//! - strings passed in are borrowed for the duration of the call
//! - strings written to `out` / `err` belong to the caller and must be
//!   released with [`aethra_free_string`]
//! - panics are caught and reported as [`AETHRA_ERR_INTERNAL`]

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;

use once_cell::sync::Lazy;

use crate::config::PlannerConfig;
use crate::isolate::{IsolateError, IsolateHandle, IsolateRegistry, PlanRequest};
use crate::observability::{log_event_with_fields, Event, Logger};

pub const AETHRA_OK: i32 = 0;
pub const AETHRA_ERR_INVALID_ARG: i32 = -1;
pub const AETHRA_ERR_STALE_ISOLATE: i32 = -2;
pub const AETHRA_ERR_PLAN_FAILED: i32 = -3;
pub const AETHRA_ERR_EXHAUSTED: i32 = -4;
pub const AETHRA_ERR_INTERNAL: i32 = -5;

/// Bumped on any change to a signature or status code
pub const AETHRA_ABI_VERSION: u32 = 1;

static REGISTRY: Lazy<Result<IsolateRegistry, String>> = Lazy::new(|| {
    let config = PlannerConfig::from_env().map_err(|e| e.to_string())?;
    Logger::set_min_severity(config.log_severity());
    log_event_with_fields(
        Event::ConfigLoaded,
        &[("max_isolates", &config.max_isolates.to_string())],
    );
    Ok(IsolateRegistry::new(config))
});

fn registry() -> Result<&'static IsolateRegistry, &'static str> {
    match &*REGISTRY {
        Ok(registry) => Ok(registry),
        Err(reason) => {
            Logger::error("FFI_CONFIG_INVALID", &[("reason", reason.as_str())]);
            Err(reason.as_str())
        }
    }
}

#[no_mangle]
pub extern "C" fn aethra_abi_version() -> u32 {
    AETHRA_ABI_VERSION
}

/// Creates an isolate. Returns its handle, or `0` on failure.
#[no_mangle]
pub extern "C" fn aethra_create_isolate() -> u64 {
    catch_unwind(|| match registry() {
        Ok(registry) => registry.create().map(|h| h.as_raw()).unwrap_or(0),
        Err(_) => 0,
    })
    .unwrap_or(0)
}

/// Releases an isolate
#[no_mangle]
pub extern "C" fn aethra_release_isolate(handle: u64) -> i32 {
    catch_unwind(|| {
        let registry = match registry() {
            Ok(registry) => registry,
            Err(_) => return AETHRA_ERR_INTERNAL,
        };
        let handle = match IsolateHandle::from_raw(handle) {
            Some(handle) => handle,
            None => return AETHRA_ERR_STALE_ISOLATE,
        };
        match registry.release(handle) {
            Ok(()) => AETHRA_OK,
            Err(err) => status_of(&err),
        }
    })
    .unwrap_or(AETHRA_ERR_INTERNAL)
}

/// Plans the query stored at `query_path` against the Arrow database at
/// `database`.
///
/// On success writes the encoded plan to `*out`. On failure writes an
/// error message to `*err` when `err` is not null.
///
/// # Safety
///
/// `database` and `query_path` must be null or point to NUL-terminated
/// strings. `out` and `err` must be null or valid for writes.
#[no_mangle]
pub unsafe extern "C" fn aethra_plan(
    handle: u64,
    database: *const c_char,
    query_path: *const c_char,
    out: *mut *mut c_char,
    err: *mut *mut c_char,
) -> i32 {
    if !out.is_null() {
        *out = ptr::null_mut();
    }
    if !err.is_null() {
        *err = ptr::null_mut();
    }

    let result = catch_unwind(AssertUnwindSafe(|| {
        plan_inner(handle, database, query_path)
    }));

    let (status, text) = match result {
        Ok(Ok(plan)) => (AETHRA_OK, plan),
        Ok(Err((status, message))) => (status, message),
        Err(_) => (AETHRA_ERR_INTERNAL, "planner panicked".to_string()),
    };

    if status == AETHRA_OK {
        if out.is_null() {
            return AETHRA_ERR_INVALID_ARG;
        }
        *out = into_c_string(text);
    } else if !err.is_null() {
        *err = into_c_string(text);
    }

    status
}

unsafe fn plan_inner(
    handle: u64,
    database: *const c_char,
    query_path: *const c_char,
) -> Result<String, (i32, String)> {
    let database = borrow_str(database, "database")?;
    let query_path = borrow_str(query_path, "query_path")?;

    let handle = IsolateHandle::from_raw(handle).ok_or_else(|| {
        (
            AETHRA_ERR_STALE_ISOLATE,
            IsolateError::Stale(handle).to_string(),
        )
    })?;

    let registry = registry().map_err(|reason| (AETHRA_ERR_INTERNAL, reason.to_string()))?;
    let request = PlanRequest::from_paths(database, query_path);

    registry
        .plan(handle, &request)
        .map(|response| response.plan)
        .map_err(|e| (status_of(&e), format!("{}: {}", e.code(), e.message())))
}

/// Releases a string returned by [`aethra_plan`]
///
/// # Safety
///
/// `ptr` must be null or a pointer returned by this library that has not
/// been freed yet.
#[no_mangle]
pub unsafe extern "C" fn aethra_free_string(ptr: *mut c_char) {
    if ptr.is_null() {
        return;
    }
    drop(CString::from_raw(ptr));
}

unsafe fn borrow_str<'a>(ptr: *const c_char, name: &str) -> Result<&'a str, (i32, String)> {
    if ptr.is_null() {
        return Err((AETHRA_ERR_INVALID_ARG, format!("{} is null", name)));
    }
    CStr::from_ptr(ptr)
        .to_str()
        .map_err(|_| (AETHRA_ERR_INVALID_ARG, format!("{} is not valid UTF-8", name)))
}

fn into_c_string(text: String) -> *mut c_char {
    // Interior NULs cannot cross the boundary
    let text = text.replace('\0', " ");
    match CString::new(text) {
        Ok(c) => c.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

fn status_of(err: &IsolateError) -> i32 {
    match err {
        IsolateError::Stale(_) => AETHRA_ERR_STALE_ISOLATE,
        IsolateError::Exhausted { .. } => AETHRA_ERR_EXHAUSTED,
        IsolateError::InvalidRequest(_) => AETHRA_ERR_INVALID_ARG,
        IsolateError::Catalog(_) | IsolateError::Planner(_) | IsolateError::Encode(_) => {
            AETHRA_ERR_PLAN_FAILED
        }
    }
}
