//! Rewrites AVG into SUM and COUNT

use crate::catalog::SqlType;
use crate::optimizer::RewriteRule;
use crate::planner::{
    AggFunction, AggregateCall, Expr, LogicalPlan, Operator, PlannerResult,
};

/// `AVG(x)` becomes `SUM(x) / COUNT(x)`.
///
/// The Aggregate computes the SUM and COUNT calls (shared with any identical
/// call already present) and a Project on top restores the original row
/// type, dividing where an AVG used to be.
pub struct AggregateReduceFunctions;

impl RewriteRule for AggregateReduceFunctions {
    fn name(&self) -> &'static str {
        "AggregateReduceFunctions"
    }

    fn apply(&self, plan: &LogicalPlan) -> PlannerResult<Option<LogicalPlan>> {
        let (input, group_set, calls) = match plan {
            LogicalPlan::Aggregate {
                input,
                group_set,
                calls,
            } if calls.iter().any(|c| c.func == AggFunction::Avg) => (input, group_set, calls),
            _ => return Ok(None),
        };

        let group_count = group_set.len();
        let original_fields = plan.row_type();

        let mut new_calls: Vec<AggregateCall> = Vec::with_capacity(calls.len() + 1);
        let mut outputs: Vec<Expr> = (0..group_count)
            .map(|i| Expr::input_ref(i, original_fields[i].ty))
            .collect();

        for call in calls {
            if call.func != AggFunction::Avg {
                let index = register(&mut new_calls, call.clone(), group_count);
                outputs.push(Expr::input_ref(group_count + index, call.ty));
                continue;
            }

            let sum = AggregateCall {
                func: AggFunction::Sum,
                distinct: call.distinct,
                args: call.args.clone(),
                ty: call.ty,
                name: String::new(),
            };
            let count = AggregateCall {
                func: AggFunction::Count,
                distinct: call.distinct,
                args: call.args.clone(),
                ty: SqlType::BigInt,
                name: String::new(),
            };

            let sum_index = register(&mut new_calls, sum, group_count);
            let count_index = register(&mut new_calls, count, group_count);

            let sum_ref = Expr::input_ref(group_count + sum_index, call.ty);
            let count_ref = Expr::input_ref(group_count + count_index, SqlType::BigInt);
            let divide = Expr::call(Operator::Divide, vec![sum_ref, count_ref])?;

            outputs.push(if divide.ty() == call.ty {
                divide
            } else {
                Expr::cast(divide, call.ty)
            });
        }

        let names = original_fields.into_iter().map(|f| f.name).collect();
        let aggregate = LogicalPlan::aggregate(input.as_ref().clone(), group_set.clone(), new_calls);

        Ok(Some(LogicalPlan::project(aggregate, outputs, names)))
    }
}

/// Adds `call` unless an identical computation exists; returns its position
fn register(calls: &mut Vec<AggregateCall>, call: AggregateCall, group_count: usize) -> usize {
    if let Some(index) = calls.iter().position(|c| c.same_computation(&call)) {
        return index;
    }

    let name = if call.name.is_empty() {
        format!("$f{}", group_count + calls.len())
    } else {
        call.name.clone()
    };
    calls.push(AggregateCall { name, ..call });
    calls.len() - 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::sales_catalog;
    use crate::planner::{explain, Binder};

    fn reduce(sql: &str) -> String {
        let catalog = sales_catalog();
        let plan = Binder::new(&catalog).bind_sql(sql).unwrap();
        let mut current = plan;
        loop {
            match rewrite_anywhere(&current) {
                Some(next) => current = next,
                None => break,
            }
        }
        explain(&current)
    }

    fn rewrite_anywhere(plan: &LogicalPlan) -> Option<LogicalPlan> {
        if let Some(rewritten) = AggregateReduceFunctions.apply(plan).unwrap() {
            return Some(rewritten);
        }
        let inputs = plan.inputs();
        for (i, input) in inputs.iter().enumerate() {
            if let Some(rewritten) = rewrite_anywhere(input) {
                let mut new_inputs: Vec<LogicalPlan> = inputs.iter().map(|p| (*p).clone()).collect();
                new_inputs[i] = rewritten;
                return Some(plan.with_inputs(new_inputs));
            }
        }
        None
    }

    #[test]
    fn test_avg_becomes_sum_over_count() {
        let text = reduce("SELECT c_nation, AVG(c_id) FROM customer GROUP BY c_nation");
        assert!(text.contains("LogicalProject(c_nation=[$0], EXPR$1=[CAST(/($1, $2)):INTEGER])"));
        assert!(text.contains("LogicalAggregate(group=[{0}], $f1=[SUM($1)], $f2=[COUNT($1)])"));
    }

    #[test]
    fn test_shared_calls_are_reused() {
        let text = reduce("SELECT SUM(c_id), AVG(c_id), COUNT(c_id) FROM customer");
        assert!(text.contains(
            "LogicalAggregate(group=[{}], EXPR$0=[SUM($0)], $f1=[COUNT($0)])"
        ));
        assert!(text.contains("EXPR$2=[$1]"));
    }

    #[test]
    fn test_no_avg_no_match() {
        let catalog = sales_catalog();
        let plan = Binder::new(&catalog)
            .bind_sql("SELECT SUM(c_id) FROM customer")
            .unwrap();
        let aggregate = plan.inputs()[0].clone();
        assert!(AggregateReduceFunctions.apply(&aggregate).unwrap().is_none());
    }
}
