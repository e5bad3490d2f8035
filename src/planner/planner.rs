//! SQL to optimised logical plan
//!
//! Planning is deterministic: the same catalog, query and rule program
//! always give the same plan.

use crate::catalog::Catalog;
use crate::observability::{Logger, Severity};
use crate::optimizer::HepPlanner;

use super::binder::Binder;
use super::errors::PlannerResult;
use super::explain::explain;
use super::rel::LogicalPlan;

/// Binds SQL against a catalog and optimises the result
pub struct QueryPlanner<'a> {
    catalog: &'a Catalog,
    optimizer: &'a HepPlanner,
}

impl<'a> QueryPlanner<'a> {
    /// Creates a planner over `catalog` using `optimizer`'s rule program
    pub fn new(catalog: &'a Catalog, optimizer: &'a HepPlanner) -> Self {
        Self { catalog, optimizer }
    }

    /// Parses, validates and converts `sql` without optimising it
    pub fn bind(&self, sql: &str) -> PlannerResult<LogicalPlan> {
        Binder::new(self.catalog).bind_sql(sql)
    }

    /// Plans `sql`: bind, then run the rule program
    pub fn plan(&self, sql: &str) -> PlannerResult<LogicalPlan> {
        let logical = self.bind(sql)?;

        if Logger::enabled(Severity::Trace) {
            Logger::trace("PLAN_BOUND", &[("plan", &explain(&logical))]);
        }

        self.optimizer.find_best_exp(logical)
    }
}
