//! Pushes column pruning below joins

use crate::optimizer::RewriteRule;
use crate::planner::{Expr, LogicalPlan, PlannerResult};

/// A Project on a Join keeps only the columns it and the join condition
/// need. Each join input that has unneeded columns gets a Project of its
/// needed columns, in column order, and the join condition and the top
/// Project are remapped onto the narrower row.
///
/// An input that needs none of its columns keeps its first column, so that
/// every join input still produces rows.
pub struct ProjectJoinTranspose;

impl RewriteRule for ProjectJoinTranspose {
    fn name(&self) -> &'static str {
        "ProjectJoinTranspose"
    }

    fn apply(&self, plan: &LogicalPlan) -> PlannerResult<Option<LogicalPlan>> {
        let (exprs, names, left, right, condition, join_type) = match plan {
            LogicalPlan::Project { input, exprs, names } => match input.as_ref() {
                LogicalPlan::Join {
                    left,
                    right,
                    condition,
                    join_type,
                } => (exprs, names, left, right, condition, *join_type),
                _ => return Ok(None),
            },
            _ => return Ok(None),
        };

        let left_width = left.width();
        let right_width = right.width();

        let mut needed = Vec::new();
        for expr in exprs {
            expr.collect_input_refs(&mut needed);
        }
        condition.collect_input_refs(&mut needed);
        needed.sort_unstable();

        let mut left_needed: Vec<usize> = needed.iter().copied().filter(|&c| c < left_width).collect();
        let mut right_needed: Vec<usize> = needed
            .iter()
            .copied()
            .filter(|&c| c >= left_width)
            .map(|c| c - left_width)
            .collect();

        if left_needed.is_empty() && left_width > 0 {
            left_needed.push(0);
        }
        if right_needed.is_empty() && right_width > 0 {
            right_needed.push(0);
        }

        if left_needed.len() == left_width && right_needed.len() == right_width {
            return Ok(None);
        }

        let new_left = prune(left, &left_needed);
        let new_right = prune(right, &right_needed);

        let new_left_width = left_needed.len();
        let mapping = |old: usize| -> usize {
            if old < left_width {
                position(&left_needed, old)
            } else {
                new_left_width + position(&right_needed, old - left_width)
            }
        };

        let join = LogicalPlan::join(new_left, new_right, condition.remap(&mapping), join_type);
        let new_exprs = exprs.iter().map(|e| e.remap(&mapping)).collect();

        Ok(Some(LogicalPlan::project(join, new_exprs, names.clone())))
    }
}

/// Project of `columns` over `input`, or `input` itself if nothing is pruned
fn prune(input: &LogicalPlan, columns: &[usize]) -> LogicalPlan {
    if columns.len() == input.width() {
        return input.clone();
    }
    let fields = input.row_type();
    let exprs = columns
        .iter()
        .map(|&c| Expr::input_ref(c, fields[c].ty))
        .collect();
    LogicalPlan::project_derived(input.clone(), exprs)
}

fn position(columns: &[usize], column: usize) -> usize {
    columns.iter().position(|&c| c == column).unwrap_or(column)
}
