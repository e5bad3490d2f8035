//! aethra-planner: an embeddable SQL planner for Arrow-backed AethraDB
//! databases
//!
//! A caller creates an isolate, sends it plan requests naming a directory
//! of Arrow IPC files and a SQL query, and receives the optimised plan in
//! the Aethra Engine Plan Format.
//!
//! ```ignore
//! use aethra_planner::isolate::{IsolateRegistry, PlanRequest};
//!
//! let registry = IsolateRegistry::default();
//! let guard = registry.scoped()?;
//! let response = guard.plan(&PlanRequest::from_paths("/data/tpch", "q3.sql"))?;
//! println!("{}", response.plan);
//! ```

pub mod catalog;
pub mod cli;
pub mod config;
pub mod encoder;
pub mod ffi;
pub mod isolate;
pub mod observability;
pub mod optimizer;
pub mod planner;
