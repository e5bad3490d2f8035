//! Pushes filter conjuncts into and below inner joins

use crate::optimizer::RewriteRule;
use crate::planner::{Expr, JoinType, LogicalPlan, PlannerResult};

/// Distributes the conjuncts of a Filter on an inner Join, together with
/// the conjuncts of the join condition:
///
/// - conjuncts over left columns only become a Filter on the left input
/// - conjuncts over right columns only become a Filter on the right input
/// - everything else stays in the join condition
pub struct FilterIntoJoin;

impl RewriteRule for FilterIntoJoin {
    fn name(&self) -> &'static str {
        "FilterIntoJoin"
    }

    fn apply(&self, plan: &LogicalPlan) -> PlannerResult<Option<LogicalPlan>> {
        let (filter_condition, left, right, join_condition) = match plan {
            LogicalPlan::Filter { input, condition } => match input.as_ref() {
                LogicalPlan::Join {
                    left,
                    right,
                    condition: join_condition,
                    join_type: JoinType::Inner,
                } => (condition, left, right, join_condition),
                _ => return Ok(None),
            },
            _ => return Ok(None),
        };

        let left_width = left.width();

        let mut left_conjuncts = Vec::new();
        let mut right_conjuncts = Vec::new();
        let mut join_conjuncts = Vec::new();

        let conjuncts = filter_condition
            .conjunctions()
            .into_iter()
            .chain(join_condition.conjunctions());

        for conjunct in conjuncts {
            let refs = conjunct.input_refs();
            if refs.is_empty() {
                join_conjuncts.push(conjunct);
            } else if refs.iter().all(|&r| r < left_width) {
                left_conjuncts.push(conjunct);
            } else if refs.iter().all(|&r| r >= left_width) {
                right_conjuncts.push(conjunct.shift_down(left_width));
            } else {
                join_conjuncts.push(conjunct);
            }
        }

        let new_left = push_filter(left.as_ref().clone(), left_conjuncts);
        let new_right = push_filter(right.as_ref().clone(), right_conjuncts);

        Ok(Some(LogicalPlan::join(
            new_left,
            new_right,
            Expr::and_all(join_conjuncts),
            JoinType::Inner,
        )))
    }
}

fn push_filter(input: LogicalPlan, conjuncts: Vec<Expr>) -> LogicalPlan {
    if conjuncts.is_empty() {
        input
    } else {
        LogicalPlan::filter(input, Expr::and_all(conjuncts))
    }
}
