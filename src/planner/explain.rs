//! Explain output for logical plans
//!
//! One operator per line, inputs indented two spaces below the operator
//! that consumes them:
//!
//! ```text
//! LogicalProject(c_name=[$1], o_total=[$0])
//!   LogicalJoin(condition=[=($1, $2)], joinType=[inner])
//!     LogicalArrowTableScan(table=[[orders]], projects=[[2, 1]])
//!     LogicalArrowTableScan(table=[[customer]], projects=[[0, 1]])
//! ```

use std::fmt::Write;

use super::rel::LogicalPlan;

const INDENT: &str = "  ";

/// Renders `plan` as an explain tree. Every line ends in `\n`.
pub fn explain(plan: &LogicalPlan) -> String {
    let mut output = String::with_capacity(256);
    explain_into(plan, 0, &mut output);
    output
}

fn explain_into(plan: &LogicalPlan, depth: usize, output: &mut String) {
    for _ in 0..depth {
        output.push_str(INDENT);
    }
    output.push_str(&describe(plan));
    output.push('\n');

    for input in plan.inputs() {
        explain_into(input, depth + 1, output);
    }
}

/// Single-line description of one operator, without its inputs
pub fn describe(plan: &LogicalPlan) -> String {
    let mut line = String::new();

    // Writing to a String cannot fail
    let _ = match plan {
        LogicalPlan::TableScan { table } => {
            write!(line, "LogicalTableScan(table=[[{}]])", table.name())
        }
        LogicalPlan::ArrowTableScan { table, projects } => {
            let identity = projects.len() == table.width()
                && projects.iter().enumerate().all(|(i, p)| i == *p);
            if identity {
                write!(line, "LogicalArrowTableScan(table=[[{}]])", table.name())
            } else {
                let cols: Vec<String> = projects.iter().map(|p| p.to_string()).collect();
                write!(
                    line,
                    "LogicalArrowTableScan(table=[[{}]], projects=[[{}]])",
                    table.name(),
                    cols.join(", ")
                )
            }
        }
        LogicalPlan::Filter { condition, .. } => {
            write!(line, "LogicalFilter(condition=[{}])", condition)
        }
        LogicalPlan::Project { exprs, names, .. } => {
            let items: Vec<String> = names
                .iter()
                .zip(exprs)
                .map(|(name, expr)| format!("{}=[{}]", name, expr))
                .collect();
            write!(line, "LogicalProject({})", items.join(", "))
        }
        LogicalPlan::Join {
            condition,
            join_type,
            ..
        } => write!(
            line,
            "LogicalJoin(condition=[{}], joinType=[{}])",
            condition, join_type
        ),
        LogicalPlan::Aggregate {
            group_set, calls, ..
        } => {
            let groups: Vec<String> = group_set.iter().map(|g| g.to_string()).collect();
            let mut items = vec![format!("group=[{{{}}}]", groups.join(", "))];
            items.extend(calls.iter().map(|c| format!("{}=[{}]", c.name, c)));
            write!(line, "LogicalAggregate({})", items.join(", "))
        }
    };

    line
}
