//! Rules that turn catalog scans into Arrow scans with embedded projections

use crate::optimizer::RewriteRule;
use crate::planner::{is_identity, Expr, LogicalPlan, PlannerError, PlannerResult};

/// A Project on a TableScan becomes an ArrowTableScan reading only the
/// referenced columns, in order of first reference.
///
/// The remapped Project stays on top unless it became the identity of the
/// new scan.
pub struct ArrowTableScanProjection;

impl RewriteRule for ArrowTableScanProjection {
    fn name(&self) -> &'static str {
        "ArrowTableScanProjection"
    }

    fn apply(&self, plan: &LogicalPlan) -> PlannerResult<Option<LogicalPlan>> {
        let (table, exprs, names) = match plan {
            LogicalPlan::Project { input, exprs, names } => match input.as_ref() {
                LogicalPlan::TableScan { table } => (table, exprs, names),
                _ => return Ok(None),
            },
            _ => return Ok(None),
        };

        let mut columns = Vec::new();
        for expr in exprs {
            expr.collect_input_refs(&mut columns);
        }
        if columns.is_empty() && table.width() > 0 {
            // Constant projection still needs the row count of the table
            columns.push(0);
        }

        let new_exprs = remap_onto(exprs, &columns);
        let scan = LogicalPlan::arrow_scan(table.clone(), columns);

        if is_identity(&new_exprs, scan.width()) {
            return Ok(Some(scan));
        }
        Ok(Some(LogicalPlan::project(scan, new_exprs, names.clone())))
    }
}

/// A TableScan becomes an ArrowTableScan of every column.
pub struct ArrowTableScan;

impl RewriteRule for ArrowTableScan {
    fn name(&self) -> &'static str {
        "ArrowTableScan"
    }

    fn apply(&self, plan: &LogicalPlan) -> PlannerResult<Option<LogicalPlan>> {
        match plan {
            LogicalPlan::TableScan { table } => {
                let projects = (0..table.width()).collect();
                Ok(Some(LogicalPlan::arrow_scan(table.clone(), projects)))
            }
            _ => Ok(None),
        }
    }
}

/// A Project on a Filter on an ArrowTableScan that reads every column
/// narrows the scan to the sorted union of the columns the Project and the
/// Filter reference.
///
/// Only unprojected scans match, so a narrowed scan is never narrowed again.
pub struct ArrowTableScanFilterProject;

impl RewriteRule for ArrowTableScanFilterProject {
    fn name(&self) -> &'static str {
        "ArrowTableScanFilterProject"
    }

    fn apply(&self, plan: &LogicalPlan) -> PlannerResult<Option<LogicalPlan>> {
        let (exprs, names, condition, table, projects) = match plan {
            LogicalPlan::Project { input, exprs, names } => match input.as_ref() {
                LogicalPlan::Filter { input, condition } => match input.as_ref() {
                    LogicalPlan::ArrowTableScan { table, projects } => {
                        (exprs, names, condition, table, projects)
                    }
                    _ => return Ok(None),
                },
                _ => return Ok(None),
            },
            _ => return Ok(None),
        };

        let unprojected = projects.len() == table.width()
            && projects.iter().enumerate().all(|(i, &p)| i == p);
        if !unprojected {
            return Ok(None);
        }

        if !matches!(condition, Expr::Call { .. }) {
            return Err(PlannerError::unsupported(
                "Filter condition that is not an operator call",
            ));
        }

        let mut columns = Vec::new();
        for expr in exprs {
            expr.collect_input_refs(&mut columns);
        }
        condition.collect_input_refs(&mut columns);
        columns.sort_unstable();
        if columns.is_empty() && table.width() > 0 {
            columns.push(0);
        }

        if columns.len() == table.width() {
            return Ok(None);
        }

        let new_condition = remap_one(condition, &columns);
        let new_exprs = remap_onto(exprs, &columns);

        let scan = LogicalPlan::arrow_scan(table.clone(), columns);
        let width = scan.width();
        let filter = LogicalPlan::filter(scan, new_condition);

        if is_identity(&new_exprs, width) {
            return Ok(Some(filter));
        }
        Ok(Some(LogicalPlan::project(filter, new_exprs, names.clone())))
    }
}

/// Rewrites table column ordinals to their position in `columns`
fn remap_onto(exprs: &[Expr], columns: &[usize]) -> Vec<Expr> {
    exprs.iter().map(|e| remap_one(e, columns)).collect()
}

fn remap_one(expr: &Expr, columns: &[usize]) -> Expr {
    expr.remap(&|old| columns.iter().position(|&c| c == old).unwrap_or(old))
}
