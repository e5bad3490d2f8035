//! SQL planning: binding, logical plans and explain output
//!
//! # Pipeline
//!
//! 1. [`parse_query`] parses one SQL statement with `sqlparser`
//! 2. [`Binder`] resolves names and types against a [`Catalog`] and builds
//!    a [`LogicalPlan`]
//! 3. [`QueryPlanner`] runs the heuristic rule program over the plan
//!
//! Every failure is a [`PlannerError`] carrying a stable code.
//!
//! [`Catalog`]: crate::catalog::Catalog

mod binder;
mod errors;
mod explain;
mod expr;
mod planner;
mod rel;

pub use binder::{parse_query, Binder};
pub use errors::{PlannerError, PlannerErrorCode, PlannerResult, Severity};
pub use explain::{describe, explain};
pub use expr::{format_expr_list, Expr, Literal, Operator};
pub use planner::QueryPlanner;
pub use rel::{is_identity, uniquify, AggFunction, AggregateCall, Field, JoinType, LogicalPlan};
