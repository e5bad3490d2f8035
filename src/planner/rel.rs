//! Logical relational operators

use std::fmt;
use std::sync::Arc;

use crate::catalog::{SqlType, Table};

use super::expr::Expr;

/// A named, typed output column of an operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub name: String,
    pub ty: SqlType,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: SqlType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JoinType::Inner => "inner",
            JoinType::Left => "left",
            JoinType::Right => "right",
            JoinType::Full => "full",
        }
    }
}

impl fmt::Display for JoinType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate functions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggFunction {
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl AggFunction {
    /// Resolves a SQL function name (case-insensitive)
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_uppercase().as_str() {
            "COUNT" => Some(AggFunction::Count),
            "SUM" => Some(AggFunction::Sum),
            "AVG" => Some(AggFunction::Avg),
            "MIN" => Some(AggFunction::Min),
            "MAX" => Some(AggFunction::Max),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AggFunction::Count => "COUNT",
            AggFunction::Sum => "SUM",
            AggFunction::Avg => "AVG",
            AggFunction::Min => "MIN",
            AggFunction::Max => "MAX",
        }
    }

    /// Result type given the argument type (None for `COUNT(*)`)
    pub fn result_type(&self, arg: Option<SqlType>) -> SqlType {
        match (self, arg) {
            (AggFunction::Count, _) => SqlType::BigInt,
            (_, Some(ty)) => ty,
            (_, None) => SqlType::Null,
        }
    }
}

/// One aggregate computed by an Aggregate operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateCall {
    pub func: AggFunction,
    pub distinct: bool,
    /// Input column ordinals
    pub args: Vec<usize>,
    pub ty: SqlType,
    /// Output column name
    pub name: String,
}

impl AggregateCall {
    /// Returns true if both calls compute the same value
    pub fn same_computation(&self, other: &AggregateCall) -> bool {
        self.func == other.func && self.distinct == other.distinct && self.args == other.args
    }
}

impl fmt::Display for AggregateCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.func.as_str())?;
        if self.distinct {
            write!(f, "DISTINCT ")?;
        }
        let args: Vec<String> = self.args.iter().map(|a| format!("${}", a)).collect();
        write!(f, "{})", args.join(", "))
    }
}

/// Logical plan tree
#[derive(Debug, Clone, PartialEq)]
pub enum LogicalPlan {
    /// Full scan of a catalog table
    TableScan { table: Arc<Table> },
    /// Scan of an Arrow table reading only `projects`, in that order
    ArrowTableScan {
        table: Arc<Table>,
        projects: Vec<usize>,
    },
    Filter {
        input: Box<LogicalPlan>,
        condition: Expr,
    },
    Project {
        input: Box<LogicalPlan>,
        exprs: Vec<Expr>,
        names: Vec<String>,
    },
    Join {
        left: Box<LogicalPlan>,
        right: Box<LogicalPlan>,
        condition: Expr,
        join_type: JoinType,
    },
    Aggregate {
        input: Box<LogicalPlan>,
        group_set: Vec<usize>,
        calls: Vec<AggregateCall>,
    },
}

impl LogicalPlan {
    pub fn table_scan(table: Arc<Table>) -> Self {
        LogicalPlan::TableScan { table }
    }

    pub fn arrow_scan(table: Arc<Table>, projects: Vec<usize>) -> Self {
        LogicalPlan::ArrowTableScan { table, projects }
    }

    pub fn filter(input: LogicalPlan, condition: Expr) -> Self {
        LogicalPlan::Filter {
            input: Box::new(input),
            condition,
        }
    }

    pub fn project(input: LogicalPlan, exprs: Vec<Expr>, names: Vec<String>) -> Self {
        LogicalPlan::Project {
            input: Box::new(input),
            exprs,
            names,
        }
    }

    /// Project whose column names are taken from the input where the
    /// expression is a plain column reference, `$f{i}` otherwise
    pub fn project_derived(input: LogicalPlan, exprs: Vec<Expr>) -> Self {
        let input_fields = input.row_type();
        let names = exprs
            .iter()
            .enumerate()
            .map(|(i, e)| match e {
                Expr::InputRef { index, .. } => input_fields
                    .get(*index)
                    .map(|f| f.name.clone())
                    .unwrap_or_else(|| format!("$f{}", i)),
                _ => format!("$f{}", i),
            })
            .collect();
        Self::project(input, exprs, uniquify(names))
    }

    pub fn join(left: LogicalPlan, right: LogicalPlan, condition: Expr, join_type: JoinType) -> Self {
        LogicalPlan::Join {
            left: Box::new(left),
            right: Box::new(right),
            condition,
            join_type,
        }
    }

    pub fn aggregate(input: LogicalPlan, group_set: Vec<usize>, calls: Vec<AggregateCall>) -> Self {
        LogicalPlan::Aggregate {
            input: Box::new(input),
            group_set,
            calls,
        }
    }

    /// Output columns of this operator
    pub fn row_type(&self) -> Vec<Field> {
        match self {
            LogicalPlan::TableScan { table } => table
                .columns()
                .iter()
                .map(|c| Field::new(c.name.clone(), c.ty))
                .collect(),
            LogicalPlan::ArrowTableScan { table, projects } => projects
                .iter()
                .filter_map(|&i| table.columns().get(i))
                .map(|c| Field::new(c.name.clone(), c.ty))
                .collect(),
            LogicalPlan::Filter { input, .. } => input.row_type(),
            LogicalPlan::Project { exprs, names, .. } => exprs
                .iter()
                .zip(names)
                .map(|(e, n)| Field::new(n.clone(), e.ty()))
                .collect(),
            LogicalPlan::Join { left, right, .. } => {
                let mut fields = left.row_type();
                fields.extend(right.row_type());
                let names = uniquify(fields.iter().map(|f| f.name.clone()).collect());
                fields
                    .into_iter()
                    .zip(names)
                    .map(|(f, name)| Field::new(name, f.ty))
                    .collect()
            }
            LogicalPlan::Aggregate {
                input,
                group_set,
                calls,
            } => {
                let input_fields = input.row_type();
                let mut fields: Vec<Field> = group_set
                    .iter()
                    .filter_map(|&i| input_fields.get(i).cloned())
                    .collect();
                fields.extend(calls.iter().map(|c| Field::new(c.name.clone(), c.ty)));
                fields
            }
        }
    }

    /// Number of output columns
    pub fn width(&self) -> usize {
        match self {
            LogicalPlan::TableScan { table } => table.width(),
            LogicalPlan::ArrowTableScan { projects, .. } => projects.len(),
            LogicalPlan::Filter { input, .. } => input.width(),
            LogicalPlan::Project { exprs, .. } => exprs.len(),
            LogicalPlan::Join { left, right, .. } => left.width() + right.width(),
            LogicalPlan::Aggregate {
                group_set, calls, ..
            } => group_set.len() + calls.len(),
        }
    }

    pub fn inputs(&self) -> Vec<&LogicalPlan> {
        match self {
            LogicalPlan::TableScan { .. } | LogicalPlan::ArrowTableScan { .. } => Vec::new(),
            LogicalPlan::Filter { input, .. }
            | LogicalPlan::Project { input, .. }
            | LogicalPlan::Aggregate { input, .. } => vec![input.as_ref()],
            LogicalPlan::Join { left, right, .. } => vec![left.as_ref(), right.as_ref()],
        }
    }

    /// Returns a copy of this operator with its inputs replaced.
    ///
    /// `inputs` must hold as many plans as `self.inputs()` returned.
    pub fn with_inputs(&self, inputs: Vec<LogicalPlan>) -> LogicalPlan {
        let mut inputs = inputs.into_iter();
        let mut next = |current: &LogicalPlan| inputs.next().unwrap_or_else(|| current.clone());

        match self {
            LogicalPlan::TableScan { .. } | LogicalPlan::ArrowTableScan { .. } => self.clone(),
            LogicalPlan::Filter { input, condition } => {
                LogicalPlan::filter(next(input.as_ref()), condition.clone())
            }
            LogicalPlan::Project { input, exprs, names } => {
                LogicalPlan::project(next(input.as_ref()), exprs.clone(), names.clone())
            }
            LogicalPlan::Aggregate {
                input,
                group_set,
                calls,
            } => LogicalPlan::aggregate(next(input.as_ref()), group_set.clone(), calls.clone()),
            LogicalPlan::Join {
                left,
                right,
                condition,
                join_type,
            } => {
                let left = next(left.as_ref());
                let right = next(right.as_ref());
                LogicalPlan::join(left, right, condition.clone(), *join_type)
            }
        }
    }

    /// Names of the tables scanned, sorted and without duplicates
    pub fn tables(&self) -> Vec<String> {
        let mut names = Vec::new();
        self.collect_tables(&mut names);
        names.sort();
        names.dedup();
        names
    }

    fn collect_tables(&self, names: &mut Vec<String>) {
        match self {
            LogicalPlan::TableScan { table } | LogicalPlan::ArrowTableScan { table, .. } => {
                names.push(table.name().to_string())
            }
            _ => {
                for input in self.inputs() {
                    input.collect_tables(names);
                }
            }
        }
    }

    /// Returns true if this Project only forwards its input unchanged
    pub fn is_identity_project(&self) -> bool {
        match self {
            LogicalPlan::Project { input, exprs, .. } => is_identity(exprs, input.width()),
            _ => false,
        }
    }
}

/// Returns true if `exprs` is exactly `$0, $1, ..., $(width-1)`
pub fn is_identity(exprs: &[Expr], width: usize) -> bool {
    exprs.len() == width
        && exprs
            .iter()
            .enumerate()
            .all(|(i, e)| matches!(e, Expr::InputRef { index, .. } if *index == i))
}

/// Makes names unique by appending a counter to later duplicates
pub fn uniquify(names: Vec<String>) -> Vec<String> {
    let mut result: Vec<String> = Vec::with_capacity(names.len());
    for name in names {
        let taken = |candidate: &str, result: &[String]| {
            result.iter().any(|n| n.eq_ignore_ascii_case(candidate))
        };
        if !taken(&name, &result) {
            result.push(name);
            continue;
        }
        let mut suffix = 0;
        loop {
            let candidate = format!("{}{}", name, suffix);
            if !taken(&candidate, &result) {
                result.push(candidate);
                break;
            }
            suffix += 1;
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Column;

    fn table(name: &str, width: usize) -> Arc<Table> {
        let columns = (0..width)
            .map(|i| Column::new(format!("c{}", i), SqlType::Integer))
            .collect();
        Arc::new(Table::new(name, format!("/db/{}.arrow", name), columns))
    }

    #[test]
    fn test_join_row_type_uniquifies_names() {
        let t = table("t", 2);
        let join = LogicalPlan::join(
            LogicalPlan::table_scan(t.clone()),
            LogicalPlan::table_scan(t),
            Expr::true_literal(),
            JoinType::Inner,
        );
        let names: Vec<String> = join.row_type().into_iter().map(|f| f.name).collect();
        assert_eq!(names, vec!["c0", "c1", "c00", "c10"]);
    }

    #[test]
    fn test_aggregate_row_type() {
        let t = table("t", 3);
        let agg = LogicalPlan::aggregate(
            LogicalPlan::table_scan(t),
            vec![1],
            vec![AggregateCall {
                func: AggFunction::Count,
                distinct: false,
                args: vec![],
                ty: SqlType::BigInt,
                name: "EXPR$1".into(),
            }],
        );
        let fields = agg.row_type();
        assert_eq!(fields[0].name, "c1");
        assert_eq!(fields[1], Field::new("EXPR$1", SqlType::BigInt));
        assert_eq!(agg.width(), 2);
    }

    #[test]
    fn test_aggregate_call_display() {
        let call = AggregateCall {
            func: AggFunction::Count,
            distinct: true,
            args: vec![0],
            ty: SqlType::BigInt,
            name: "n".into(),
        };
        assert_eq!(call.to_string(), "COUNT(DISTINCT $0)");
    }

    #[test]
    fn test_identity_detection() {
        let t = table("t", 2);
        let scan = LogicalPlan::table_scan(t);
        let identity = LogicalPlan::project_derived(
            scan.clone(),
            vec![
                Expr::input_ref(0, SqlType::Integer),
                Expr::input_ref(1, SqlType::Integer),
            ],
        );
        assert!(identity.is_identity_project());

        let swapped = LogicalPlan::project_derived(
            scan,
            vec![
                Expr::input_ref(1, SqlType::Integer),
                Expr::input_ref(0, SqlType::Integer),
            ],
        );
        assert!(!swapped.is_identity_project());
    }

    #[test]
    fn test_tables_sorted_and_deduplicated() {
        let join = LogicalPlan::join(
            LogicalPlan::table_scan(table("orders", 1)),
            LogicalPlan::join(
                LogicalPlan::table_scan(table("customer", 1)),
                LogicalPlan::table_scan(table("orders", 1)),
                Expr::true_literal(),
                JoinType::Inner,
            ),
            Expr::true_literal(),
            JoinType::Inner,
        );
        assert_eq!(join.tables(), vec!["customer", "orders"]);
    }
}
