//! Aethra Engine Plan Format
//!
//! An optimised plan is written one operator per line, inputs before the
//! operators that consume them. Lines are numbered from 0 in output order
//! and operators refer to their inputs by line number:
//!
//! ```text
//! S;{table};{projected};{columns}
//! A;{input};{group columns};{aggregate calls}
//! F;{input};{condition}
//! J;{left};{right};{lower ref};{higher ref}
//! P;{input};[{expressions}]
//! ```
//!
//! Only the operators the engine executes can be encoded. Anything else is
//! rejected with [`EncodeError`].

mod errors;

use std::fmt::Write;

pub use errors::{EncodeError, EncodeErrorCode, EncodeResult};

use crate::planner::{format_expr_list, Expr, JoinType, LogicalPlan, Operator};

const EXPECTED_PLAN_LENGTH: usize = 1024;

/// Encodes `plan` into the Aethra Engine Plan Format
pub fn encode(plan: &LogicalPlan) -> EncodeResult<String> {
    let mut encoder = PlanEncoder {
        output: String::with_capacity(EXPECTED_PLAN_LENGTH),
        next_line: 0,
    };
    encoder.encode(plan)?;
    Ok(encoder.output)
}

struct PlanEncoder {
    output: String,
    next_line: usize,
}

impl PlanEncoder {
    /// Writes `plan` and its inputs; returns the line index of `plan`
    fn encode(&mut self, plan: &LogicalPlan) -> EncodeResult<usize> {
        match plan {
            LogicalPlan::ArrowTableScan { table, projects } => {
                let projected = table.width() != projects.len();
                let line = format!(
                    "S;{};{};{}",
                    table.name(),
                    projected,
                    join_indices(projects)
                );
                Ok(self.emit(line))
            }

            LogicalPlan::Aggregate {
                input,
                group_set,
                calls,
            } => {
                if calls.iter().any(|c| c.distinct) {
                    return Err(EncodeError::unsupported(
                        "AggregationOperator",
                        "DISTINCT aggregate calls are not supported",
                    ));
                }

                let input_line = self.encode(input)?;
                let calls: Vec<String> = calls.iter().map(|c| c.to_string()).collect();
                let line = format!(
                    "A;{};{};{}",
                    input_line,
                    join_indices(group_set),
                    calls.join(",")
                );
                Ok(self.emit(line))
            }

            LogicalPlan::Filter { input, condition } => {
                let input_line = self.encode(input)?;
                Ok(self.emit(format!("F;{};{}", input_line, condition)))
            }

            LogicalPlan::Join {
                left,
                right,
                condition,
                join_type,
            } => {
                // Checked before the inputs so a rejected join writes nothing
                let (lower, higher) = equi_join_columns(condition, *join_type)?;

                let left_line = self.encode(left)?;
                let right_line = self.encode(right)?;
                let line = format!("J;{};{};{};{}", left_line, right_line, lower, higher);
                Ok(self.emit(line))
            }

            LogicalPlan::Project { input, exprs, .. } => {
                let input_line = self.encode(input)?;
                Ok(self.emit(format!("P;{};{}", input_line, format_expr_list(exprs))))
            }

            LogicalPlan::TableScan { table } => Err(EncodeError::unsupported(
                "TableScan",
                format!(
                    "The current operator type cannot be encoded: TableScan of '{}'",
                    table.name()
                ),
            )),
        }
    }

    fn emit(&mut self, line: String) -> usize {
        let index = self.next_line;
        self.next_line += 1;
        // Writing to a String cannot fail
        let _ = writeln!(self.output, "{}", line);
        index
    }
}

/// Validates an equi-join and returns its column references, lower first
fn equi_join_columns(condition: &Expr, join_type: JoinType) -> EncodeResult<(usize, usize)> {
    const OPERATOR: &str = "JoinOperator";

    if join_type != JoinType::Inner {
        return Err(EncodeError::unsupported(
            OPERATOR,
            "only inner joins are supported",
        ));
    }

    let (op, operands) = match condition {
        Expr::Call { op, operands, .. } => (op, operands),
        _ => {
            return Err(EncodeError::unsupported(
                OPERATOR,
                "only join conditions that are operator calls are supported",
            ))
        }
    };

    if *op != Operator::Eq {
        return Err(EncodeError::unsupported(
            OPERATOR,
            "only equality join conditions are supported",
        ));
    }

    if operands.len() != 2 {
        return Err(EncodeError::unsupported(
            OPERATOR,
            "only join conditions over two operands are supported",
        ));
    }

    let (first, first_ty, second, second_ty) = match (&operands[0], &operands[1]) {
        (Expr::InputRef { index: a, ty: a_ty }, Expr::InputRef { index: b, ty: b_ty }) => {
            (*a, a_ty, *b, b_ty)
        }
        _ => {
            return Err(EncodeError::unsupported(
                OPERATOR,
                "only join condition operands that refer to an input column are supported",
            ))
        }
    };

    if first_ty != second_ty {
        return Err(EncodeError::unsupported(
            OPERATOR,
            format!(
                "join condition operands must have the same type, found {} and {}",
                first_ty, second_ty
            ),
        ));
    }

    Ok((first.min(second), first.max(second)))
}

fn join_indices(indices: &[usize]) -> String {
    let parts: Vec<String> = indices.iter().map(|i| i.to_string()).collect();
    parts.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::sales_catalog;
    use crate::catalog::SqlType;
    use crate::optimizer::{default_program, HepPlanner};
    use crate::planner::QueryPlanner;

    fn optimise(sql: &str) -> LogicalPlan {
        let catalog = sales_catalog();
        let optimizer = HepPlanner::new(default_program(), 1000);
        QueryPlanner::new(&catalog, &optimizer).plan(sql).unwrap()
    }

    fn encode_sql(sql: &str) -> EncodeResult<String> {
        encode(&optimise(sql))
    }

    #[test]
    fn test_projected_scan() {
        assert_eq!(
            encode_sql("SELECT c_name FROM customer").unwrap(),
            "S;customer;true;1\n"
        );
    }

    #[test]
    fn test_full_scan_not_projected() {
        assert_eq!(
            encode_sql("SELECT * FROM customer").unwrap(),
            "S;customer;false;0,1,2\n"
        );
    }

    #[test]
    fn test_join_lines_in_post_order() {
        let encoded = encode_sql(
            "SELECT c_name, o_total FROM orders JOIN customer ON o_custkey = c_id \
             WHERE o_total > 10",
        )
        .unwrap();
        assert_eq!(
            encoded,
            "S;orders;true;1,2\n\
             F;0;>($1, 10)\n\
             S;customer;true;0,1\n\
             J;1;2;0;2\n\
             P;3;[$3, $1]\n"
        );
    }

    #[test]
    fn test_join_references_ordered() {
        let encoded = encode_sql(
            "SELECT c_name, o_total FROM orders JOIN customer ON c_id = o_custkey",
        )
        .unwrap();
        assert!(encoded.contains("J;0;1;0;2\n"));
    }

    #[test]
    fn test_aggregate() {
        assert_eq!(
            encode_sql("SELECT c_nation, SUM(c_id) FROM customer GROUP BY c_nation").unwrap(),
            "S;customer;true;2,0\n\
             A;0;0;SUM($1)\n"
        );
    }

    #[test]
    fn test_average_is_reduced() {
        assert_eq!(
            encode_sql("SELECT c_nation, AVG(c_id) FROM customer GROUP BY c_nation").unwrap(),
            "S;customer;true;2,0\n\
             A;0;0;SUM($1),COUNT($1)\n\
             P;1;[$0, CAST(/($1, $2)):INTEGER]\n"
        );
    }

    #[test]
    fn test_global_count_star() {
        assert_eq!(
            encode_sql("SELECT COUNT(*) FROM customer").unwrap(),
            "S;customer;true;0\nP;0;[0]\nA;1;;COUNT()\n"
        );
    }

    #[test]
    fn test_distinct_aggregate_rejected() {
        let err = encode_sql("SELECT COUNT(DISTINCT c_nation) FROM customer").unwrap_err();
        assert_eq!(err.code(), EncodeErrorCode::AethraEncodeUnsupported);
        assert_eq!(err.operator(), "AggregationOperator");
    }

    #[test]
    fn test_outer_join_rejected() {
        let err = encode_sql(
            "SELECT o_id, c_name FROM orders LEFT JOIN customer ON o_custkey = c_id",
        )
        .unwrap_err();
        assert!(err.message().contains("inner joins"));
    }

    #[test]
    fn test_cross_join_rejected() {
        let err = encode_sql("SELECT o_id, c_name FROM orders, customer").unwrap_err();
        assert!(err.message().contains("operator calls"));
    }

    #[test]
    fn test_non_equi_join_rejected() {
        let err = encode_sql(
            "SELECT o_id, c_name FROM orders JOIN customer ON o_custkey < c_id",
        )
        .unwrap_err();
        assert!(err.message().contains("equality"));
    }

    #[test]
    fn test_join_operand_types_must_match() {
        let catalog = sales_catalog();
        let orders = catalog.lookup("orders").unwrap().clone();
        let customer = catalog.lookup("customer").unwrap().clone();
        let condition = Expr::call(
            Operator::Eq,
            vec![
                Expr::input_ref(2, SqlType::Decimal { precision: 12, scale: 2 }),
                Expr::input_ref(4, SqlType::Integer),
            ],
        )
        .unwrap();
        let join = LogicalPlan::join(
            LogicalPlan::arrow_scan(orders, vec![0, 1, 2, 3]),
            LogicalPlan::arrow_scan(customer, vec![0, 1, 2]),
            condition,
            JoinType::Inner,
        );

        let err = encode(&join).unwrap_err();
        assert!(err.message().contains("same type"));
    }

    #[test]
    fn test_plain_table_scan_rejected() {
        let catalog = sales_catalog();
        let scan = LogicalPlan::table_scan(catalog.lookup("orders").unwrap().clone());
        let err = encode(&scan).unwrap_err();
        assert_eq!(err.operator(), "TableScan");
    }
}
