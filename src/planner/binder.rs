//! SQL to logical plan conversion
//!
//! Parses one SELECT statement with `sqlparser`, resolves every name against
//! the catalog and produces the canonical relational shape:
//!
//! ```text
//! Project(select items)
//!   [Filter(HAVING)]
//!     [Aggregate(group keys, calls)]
//!       [Project(group keys ++ aggregate arguments)]
//!         [Filter(WHERE)]
//!           left-deep Join tree of TableScans
//! ```
//!
//! SELECT DISTINCT adds an Aggregate over the final Project.

use std::cell::RefCell;

use chrono::NaiveDate;
use sqlparser::ast::{
    BinaryOperator, DataType, Distinct, ExactNumberInfo, Expr as SqlExpr, Function, FunctionArg,
    FunctionArgExpr, GroupByExpr, Ident, JoinConstraint, JoinOperator, Query, Select, SelectItem,
    SetExpr, Statement, TableFactor, TableWithJoins, UnaryOperator, Value,
};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::Parser;

use crate::catalog::{Catalog, SqlType, MAX_DECIMAL_PRECISION};

use super::errors::{PlannerError, PlannerResult};
use super::expr::{Expr, Literal, Operator};
use super::rel::{uniquify, AggFunction, AggregateCall, JoinType, LogicalPlan};

/// Parses `sql`, which must hold exactly one query statement
pub fn parse_query(sql: &str) -> PlannerResult<Box<Query>> {
    let statements = Parser::parse_sql(&GenericDialect {}, sql).map_err(PlannerError::parse)?;

    let mut statements = statements.into_iter();
    match (statements.next(), statements.next()) {
        (Some(Statement::Query(query)), None) => Ok(query),
        (Some(_), None) => Err(PlannerError::invalid(
            "Only SELECT statements can be planned",
        )),
        (None, _) => Err(PlannerError::invalid("Query text holds no statement")),
        (Some(_), Some(_)) => Err(PlannerError::invalid(
            "Query text must hold exactly one statement",
        )),
    }
}

/// A column visible to expressions in the current FROM clause
#[derive(Debug, Clone)]
struct ScopeColumn {
    qualifier: String,
    name: String,
    ty: SqlType,
}

#[derive(Debug, Clone, Default)]
struct Scope {
    columns: Vec<ScopeColumn>,
    qualifiers: Vec<String>,
}

/// The clause an expression appears in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Clause {
    Where,
    On,
    GroupBy,
    Select,
    Having,
    AggregateArgument,
}

impl Clause {
    fn as_str(&self) -> &'static str {
        match self {
            Clause::Where => "WHERE",
            Clause::On => "ON",
            Clause::GroupBy => "GROUP BY",
            Clause::Select => "SELECT",
            Clause::Having => "HAVING",
            Clause::AggregateArgument => "aggregate argument",
        }
    }
}

/// Grouping state shared by the select list and HAVING of an aggregate query
struct AggregateContext<'s> {
    scope: &'s Scope,
    /// Distinct group keys, bound against the FROM scope
    groups: Vec<Expr>,
    /// Group keys followed by aggregate arguments
    pre_exprs: RefCell<Vec<Expr>>,
    calls: RefCell<Vec<AggregateCall>>,
}

enum Context<'s> {
    /// Expressions over the FROM scope
    Plain { scope: &'s Scope, clause: Clause },
    /// Expressions over the output of the Aggregate
    Aggregated {
        agg: &'s AggregateContext<'s>,
        clause: Clause,
    },
}

impl<'s> Context<'s> {
    fn scope(&self) -> &'s Scope {
        match self {
            Context::Plain { scope, .. } => *scope,
            Context::Aggregated { agg, .. } => agg.scope,
        }
    }

    fn clause(&self) -> Clause {
        match self {
            Context::Plain { clause, .. } | Context::Aggregated { clause, .. } => *clause,
        }
    }
}

/// One entry of the expanded select list
enum SelectTarget<'q> {
    Expr {
        expr: &'q SqlExpr,
        alias: Option<&'q Ident>,
    },
    /// Column produced by `*` or `t.*`
    Column(usize),
}

/// Resolves parsed SQL against a catalog
pub struct Binder<'a> {
    catalog: &'a Catalog,
    case_sensitive: bool,
}

impl<'a> Binder<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self {
            catalog,
            case_sensitive: catalog.is_case_sensitive(),
        }
    }

    /// Parses and converts `sql` into a logical plan
    pub fn bind_sql(&self, sql: &str) -> PlannerResult<LogicalPlan> {
        let query = parse_query(sql)?;
        self.bind_query(&query)
    }

    pub fn bind_query(&self, query: &Query) -> PlannerResult<LogicalPlan> {
        if query.with.is_some() {
            return Err(PlannerError::unsupported("WITH"));
        }
        if !query.order_by.is_empty() {
            return Err(PlannerError::unsupported("ORDER BY"));
        }
        if query.limit.is_some() {
            return Err(PlannerError::unsupported("LIMIT"));
        }
        if query.offset.is_some() {
            return Err(PlannerError::unsupported("OFFSET"));
        }
        if query.fetch.is_some() {
            return Err(PlannerError::unsupported("FETCH"));
        }

        match query.body.as_ref() {
            SetExpr::Select(select) => self.bind_select(select),
            SetExpr::Query(inner) => self.bind_query(inner),
            SetExpr::SetOperation { .. } => Err(PlannerError::unsupported(
                "Set operations (UNION, INTERSECT, EXCEPT)",
            )),
            _ => Err(PlannerError::unsupported("Query body other than SELECT")),
        }
    }

    fn bind_select(&self, select: &Select) -> PlannerResult<LogicalPlan> {
        if select.top.is_some() {
            return Err(PlannerError::unsupported("TOP"));
        }
        if select.into.is_some() {
            return Err(PlannerError::unsupported("SELECT INTO"));
        }

        let (mut plan, scope) = self.bind_from(&select.from)?;

        if let Some(selection) = &select.selection {
            let condition = self.bind_expr(
                selection,
                &Context::Plain {
                    scope: &scope,
                    clause: Clause::Where,
                },
            )?;
            expect_condition(&condition, Clause::Where)?;
            if !condition.is_always_true() {
                plan = LogicalPlan::filter(plan, condition);
            }
        }

        let group_by: &[SqlExpr] = match &select.group_by {
            GroupByExpr::Expressions(exprs) => exprs,
            GroupByExpr::All => return Err(PlannerError::unsupported("GROUP BY ALL")),
        };

        let targets = self.expand_select_items(&select.projection, &scope)?;
        let names = uniquify(
            targets
                .iter()
                .enumerate()
                .map(|(i, t)| target_name(t, i, &scope))
                .collect(),
        );

        let aggregated = !group_by.is_empty()
            || select.having.is_some()
            || targets.iter().any(|t| match t {
                SelectTarget::Expr { expr, .. } => contains_aggregate(expr),
                SelectTarget::Column(_) => false,
            });

        let (input, exprs) = if aggregated {
            self.bind_aggregation(
                plan,
                &scope,
                group_by,
                &targets,
                &names,
                select.having.as_ref(),
            )?
        } else {
            let ctx = Context::Plain {
                scope: &scope,
                clause: Clause::Select,
            };
            let exprs = targets
                .iter()
                .map(|t| self.bind_target(t, &ctx))
                .collect::<PlannerResult<Vec<_>>>()?;
            (plan, exprs)
        };

        let mut plan = LogicalPlan::project(input, exprs, names);

        match &select.distinct {
            None => {}
            Some(Distinct::Distinct) => {
                let width = plan.width();
                plan = LogicalPlan::aggregate(plan, (0..width).collect(), Vec::new());
            }
            Some(Distinct::On(_)) => return Err(PlannerError::unsupported("DISTINCT ON")),
        }

        Ok(plan)
    }

    // ---------------------------------------------------------------------
    // FROM
    // ---------------------------------------------------------------------

    fn bind_from(&self, from: &[TableWithJoins]) -> PlannerResult<(LogicalPlan, Scope)> {
        let mut result: Option<(LogicalPlan, Scope)> = None;

        for item in from {
            let (plan, scope) = self.bind_table_with_joins(item)?;
            result = Some(match result {
                None => (plan, scope),
                Some((left, left_scope)) => {
                    let scope = self.join_scopes(left_scope, scope)?;
                    (
                        LogicalPlan::join(left, plan, Expr::true_literal(), JoinType::Inner),
                        scope,
                    )
                }
            });
        }

        result.ok_or_else(|| PlannerError::unsupported("SELECT without FROM"))
    }

    fn bind_table_with_joins(&self, item: &TableWithJoins) -> PlannerResult<(LogicalPlan, Scope)> {
        let (mut plan, mut scope) = self.bind_table_factor(&item.relation)?;

        for join in &item.joins {
            let (right, right_scope) = self.bind_table_factor(&join.relation)?;
            let joined_scope = self.join_scopes(scope, right_scope)?;

            let (join_type, constraint) = match &join.join_operator {
                JoinOperator::Inner(c) => (JoinType::Inner, Some(c)),
                JoinOperator::LeftOuter(c) => (JoinType::Left, Some(c)),
                JoinOperator::RightOuter(c) => (JoinType::Right, Some(c)),
                JoinOperator::FullOuter(c) => (JoinType::Full, Some(c)),
                JoinOperator::CrossJoin => (JoinType::Inner, None),
                _ => return Err(PlannerError::unsupported("Semi, anti and apply joins")),
            };

            let condition = match constraint {
                None | Some(JoinConstraint::None) => {
                    if join_type != JoinType::Inner {
                        return Err(PlannerError::invalid(format!(
                            "{} join requires a condition",
                            join_type.as_str().to_ascii_uppercase()
                        )));
                    }
                    Expr::true_literal()
                }
                Some(JoinConstraint::On(on)) => {
                    let condition = self.bind_expr(
                        on,
                        &Context::Plain {
                            scope: &joined_scope,
                            clause: Clause::On,
                        },
                    )?;
                    expect_condition(&condition, Clause::On)?;
                    condition
                }
                Some(JoinConstraint::Using(_)) => {
                    return Err(PlannerError::unsupported("JOIN ... USING"))
                }
                Some(JoinConstraint::Natural) => {
                    return Err(PlannerError::unsupported("NATURAL JOIN"))
                }
            };

            plan = LogicalPlan::join(plan, right, condition, join_type);
            scope = joined_scope;
        }

        Ok((plan, scope))
    }

    fn bind_table_factor(&self, factor: &TableFactor) -> PlannerResult<(LogicalPlan, Scope)> {
        match factor {
            TableFactor::Table { name, alias, .. } => {
                let ident = match name.0.as_slice() {
                    [ident] => ident,
                    _ => return Err(PlannerError::unknown_table(name.to_string())),
                };

                let table = self
                    .catalog
                    .lookup(&ident.value)
                    .ok_or_else(|| PlannerError::unknown_table(ident.value.clone()))?;

                let qualifier = match alias {
                    Some(alias) if !alias.columns.is_empty() => {
                        return Err(PlannerError::unsupported("Column aliases in FROM"))
                    }
                    Some(alias) => alias.name.value.clone(),
                    None => table.name().to_string(),
                };

                let columns = table
                    .columns()
                    .iter()
                    .map(|c| ScopeColumn {
                        qualifier: qualifier.clone(),
                        name: c.name.clone(),
                        ty: c.ty,
                    })
                    .collect();

                Ok((
                    LogicalPlan::table_scan(table.clone()),
                    Scope {
                        columns,
                        qualifiers: vec![qualifier],
                    },
                ))
            }
            TableFactor::Derived { .. } => Err(PlannerError::unsupported("Subqueries")),
            TableFactor::NestedJoin { .. } => {
                Err(PlannerError::unsupported("Parenthesized joins"))
            }
            _ => Err(PlannerError::unsupported(format!("Table expression '{}'", factor))),
        }
    }

    fn join_scopes(&self, mut left: Scope, right: Scope) -> PlannerResult<Scope> {
        for qualifier in &right.qualifiers {
            if left.qualifiers.iter().any(|q| self.ident_eq(q, qualifier)) {
                return Err(PlannerError::invalid(format!(
                    "Duplicate relation name '{}' in FROM clause",
                    qualifier
                )));
            }
        }
        left.columns.extend(right.columns);
        left.qualifiers.extend(right.qualifiers);
        Ok(left)
    }

    // ---------------------------------------------------------------------
    // SELECT list and aggregation
    // ---------------------------------------------------------------------

    fn expand_select_items<'q>(
        &self,
        items: &'q [SelectItem],
        scope: &Scope,
    ) -> PlannerResult<Vec<SelectTarget<'q>>> {
        let mut targets = Vec::with_capacity(items.len());

        for item in items {
            match item {
                SelectItem::UnnamedExpr(expr) => targets.push(SelectTarget::Expr { expr, alias: None }),
                SelectItem::ExprWithAlias { expr, alias } => targets.push(SelectTarget::Expr {
                    expr,
                    alias: Some(alias),
                }),
                SelectItem::Wildcard(_) => {
                    targets.extend((0..scope.columns.len()).map(SelectTarget::Column));
                }
                SelectItem::QualifiedWildcard(name, _) => {
                    let qualifier = name
                        .0
                        .last()
                        .map(|i| i.value.as_str())
                        .unwrap_or_default();
                    if !scope.qualifiers.iter().any(|q| self.ident_eq(q, qualifier)) {
                        return Err(PlannerError::unknown_table(name.to_string()));
                    }
                    targets.extend(
                        scope
                            .columns
                            .iter()
                            .enumerate()
                            .filter(|(_, c)| self.ident_eq(&c.qualifier, qualifier))
                            .map(|(i, _)| SelectTarget::Column(i)),
                    );
                }
            }
        }

        Ok(targets)
    }

    fn bind_target(&self, target: &SelectTarget<'_>, ctx: &Context<'_>) -> PlannerResult<Expr> {
        match target {
            SelectTarget::Expr { expr, .. } => self.bind_expr(expr, ctx),
            SelectTarget::Column(index) => {
                let scope = ctx.scope();
                let column = &scope.columns[*index];
                let plain = Expr::input_ref(*index, column.ty);
                match ctx {
                    Context::Plain { .. } => Ok(plain),
                    Context::Aggregated { agg, .. } => agg
                        .groups
                        .iter()
                        .position(|g| *g == plain)
                        .map(|i| Expr::input_ref(i, column.ty))
                        .ok_or_else(|| PlannerError::not_grouped(column.name.clone())),
                }
            }
        }
    }

    fn bind_aggregation(
        &self,
        input: LogicalPlan,
        scope: &Scope,
        group_by: &[SqlExpr],
        targets: &[SelectTarget<'_>],
        names: &[String],
        having: Option<&SqlExpr>,
    ) -> PlannerResult<(LogicalPlan, Vec<Expr>)> {
        let group_ctx = Context::Plain {
            scope,
            clause: Clause::GroupBy,
        };
        let mut groups: Vec<Expr> = Vec::with_capacity(group_by.len());
        for expr in group_by {
            let bound = self.bind_expr(expr, &group_ctx)?;
            if !groups.contains(&bound) {
                groups.push(bound);
            }
        }

        let agg = AggregateContext {
            scope,
            pre_exprs: RefCell::new(groups.clone()),
            groups,
            calls: RefCell::new(Vec::new()),
        };

        let select_ctx = Context::Aggregated {
            agg: &agg,
            clause: Clause::Select,
        };
        let exprs = targets
            .iter()
            .map(|t| self.bind_target(t, &select_ctx))
            .collect::<PlannerResult<Vec<_>>>()?;

        let having = match having {
            Some(expr) => {
                let condition = self.bind_expr(
                    expr,
                    &Context::Aggregated {
                        agg: &agg,
                        clause: Clause::Having,
                    },
                )?;
                expect_condition(&condition, Clause::Having)?;
                Some(condition)
            }
            None => None,
        };

        let group_count = agg.groups.len();
        let pre_exprs = agg.pre_exprs.into_inner();
        let mut calls = agg.calls.into_inner();

        // An aggregate that is a whole select item takes that item's name
        for ((target, expr), name) in targets.iter().zip(&exprs).zip(names) {
            if let (SelectTarget::Expr { expr: sql, .. }, Expr::InputRef { index, .. }) =
                (target, expr)
            {
                if *index < group_count || !is_aggregate_function(sql) {
                    continue;
                }
                if let Some(call) = calls.get_mut(index - group_count) {
                    if call.name.starts_with("$f") {
                        call.name = name.clone();
                    }
                }
            }
        }

        // COUNT(*) with no groups still needs one input column
        let pre_exprs = if pre_exprs.is_empty() {
            vec![Expr::literal(Literal::Integer(0))]
        } else {
            pre_exprs
        };
        let pre = LogicalPlan::project_derived(input, pre_exprs);

        let mut plan = LogicalPlan::aggregate(pre, (0..group_count).collect(), calls);
        if let Some(condition) = having {
            plan = LogicalPlan::filter(plan, condition);
        }

        Ok((plan, exprs))
    }

    /// Binds an expression over the aggregate output.
    ///
    /// Returns `None` when the expression must be bound structurally, which
    /// happens for composite expressions over group keys and aggregates.
    fn bind_grouped(
        &self,
        expr: &SqlExpr,
        agg: &AggregateContext<'_>,
        clause: Clause,
    ) -> PlannerResult<Option<Expr>> {
        if let SqlExpr::Function(function) = expr {
            if let Some(func) = AggFunction::from_name(&function.name.to_string()) {
                return self.bind_aggregate_call(function, func, agg).map(Some);
            }
        }

        if contains_aggregate(expr) {
            return Ok(None);
        }

        let plain = self.bind_expr(
            expr,
            &Context::Plain {
                scope: agg.scope,
                clause,
            },
        )?;

        if let Some(i) = agg.groups.iter().position(|g| *g == plain) {
            return Ok(Some(Expr::input_ref(i, plain.ty())));
        }

        if plain.input_refs().is_empty() {
            return Ok(Some(plain));
        }

        match expr {
            SqlExpr::Identifier(_) | SqlExpr::CompoundIdentifier(_) => {
                Err(PlannerError::not_grouped(expr.to_string()))
            }
            _ => Ok(None),
        }
    }

    fn bind_aggregate_call(
        &self,
        function: &Function,
        func: AggFunction,
        agg: &AggregateContext<'_>,
    ) -> PlannerResult<Expr> {
        if function.over.is_some() {
            return Err(PlannerError::unsupported("Window functions"));
        }

        let arg = self.aggregate_argument(function, func, agg.scope)?;
        let arg_type = arg.as_ref().map(Expr::ty);

        match (func, arg_type) {
            (AggFunction::Sum | AggFunction::Avg, Some(ty)) if !ty.is_numeric() => {
                return Err(PlannerError::type_mismatch(format!(
                    "Cannot apply '{}' to arguments of type <{}>",
                    func.as_str(),
                    ty
                )));
            }
            _ => {}
        }

        let args = match arg {
            None => Vec::new(),
            Some(arg) => {
                let mut pre = agg.pre_exprs.borrow_mut();
                let index = match pre.iter().position(|e| *e == arg) {
                    Some(index) => index,
                    None => {
                        pre.push(arg);
                        pre.len() - 1
                    }
                };
                vec![index]
            }
        };

        let group_count = agg.groups.len();
        let candidate = AggregateCall {
            func,
            distinct: function.distinct,
            args,
            ty: func.result_type(arg_type),
            name: String::new(),
        };
        let ty = candidate.ty;

        let mut calls = agg.calls.borrow_mut();
        let index = match calls.iter().position(|c| c.same_computation(&candidate)) {
            Some(index) => index,
            None => {
                let name = format!("$f{}", group_count + calls.len());
                calls.push(AggregateCall { name, ..candidate });
                calls.len() - 1
            }
        };

        Ok(Expr::input_ref(group_count + index, ty))
    }

    /// Binds the single argument of an aggregate; `None` for `COUNT(*)` and `COUNT()`
    fn aggregate_argument(
        &self,
        function: &Function,
        func: AggFunction,
        scope: &Scope,
    ) -> PlannerResult<Option<Expr>> {
        let invalid_arguments = || {
            PlannerError::invalid(format!(
                "Invalid number of arguments to function '{}'",
                func.as_str()
            ))
        };

        match function.args.as_slice() {
            [] if func == AggFunction::Count && !function.distinct => Ok(None),
            [FunctionArg::Unnamed(FunctionArgExpr::Wildcard)]
                if func == AggFunction::Count && !function.distinct =>
            {
                Ok(None)
            }
            [FunctionArg::Unnamed(FunctionArgExpr::Expr(arg))] => self
                .bind_expr(
                    arg,
                    &Context::Plain {
                        scope,
                        clause: Clause::AggregateArgument,
                    },
                )
                .map(Some),
            _ => Err(invalid_arguments()),
        }
    }

    // ---------------------------------------------------------------------
    // Expressions
    // ---------------------------------------------------------------------

    fn bind_expr(&self, expr: &SqlExpr, ctx: &Context<'_>) -> PlannerResult<Expr> {
        if let Context::Aggregated { agg, clause } = ctx {
            if let Some(bound) = self.bind_grouped(expr, agg, *clause)? {
                return Ok(bound);
            }
        }

        match expr {
            SqlExpr::Identifier(ident) => self.resolve_column(ctx.scope(), None, &ident.value),
            SqlExpr::CompoundIdentifier(parts) => match parts.as_slice() {
                [name] => self.resolve_column(ctx.scope(), None, &name.value),
                [.., qualifier, name] => {
                    self.resolve_column(ctx.scope(), Some(&qualifier.value), &name.value)
                }
                [] => Err(PlannerError::invalid("Empty identifier")),
            },
            SqlExpr::Value(value) => bind_value(value),
            SqlExpr::TypedString {
                data_type, value, ..
            } => match data_type {
                DataType::Date => parse_date(value)
                    .map(|d| Expr::literal(Literal::Date(d)))
                    .ok_or_else(|| {
                        PlannerError::invalid(format!("Illegal DATE literal '{}'", value))
                    }),
                other => Err(PlannerError::unsupported(format!("{} literals", other))),
            },
            SqlExpr::Nested(inner) => self.bind_expr(inner, ctx),
            SqlExpr::BinaryOp { left, op, right } => {
                let op = binary_operator(op)?;
                let left = self.bind_expr(left, ctx)?;
                let right = self.bind_expr(right, ctx)?;
                Expr::call(op, vec![left, right])
            }
            SqlExpr::UnaryOp { op, expr: inner } => {
                let operand = self.bind_expr(inner, ctx)?;
                match op {
                    UnaryOperator::Plus => Ok(operand),
                    UnaryOperator::Minus => {
                        if let Expr::Literal(lit) = &operand {
                            if let Some(negated) = lit.negate() {
                                return Ok(Expr::literal(negated));
                            }
                        }
                        Expr::call(Operator::Negate, vec![operand])
                    }
                    UnaryOperator::Not => Expr::call(Operator::Not, vec![operand]),
                    other => Err(PlannerError::unsupported(format!("Operator '{}'", other))),
                }
            }
            SqlExpr::IsNull(inner) => {
                Expr::call(Operator::IsNull, vec![self.bind_expr(inner, ctx)?])
            }
            SqlExpr::IsNotNull(inner) => {
                Expr::call(Operator::IsNotNull, vec![self.bind_expr(inner, ctx)?])
            }
            SqlExpr::Between {
                expr: value,
                negated,
                low,
                high,
            } => {
                let value = self.bind_expr(value, ctx)?;
                let low = self.bind_expr(low, ctx)?;
                let high = self.bind_expr(high, ctx)?;
                if *negated {
                    Expr::call(
                        Operator::Or,
                        vec![
                            Expr::call(Operator::Lt, vec![value.clone(), low])?,
                            Expr::call(Operator::Gt, vec![value, high])?,
                        ],
                    )
                } else {
                    Expr::call(
                        Operator::And,
                        vec![
                            Expr::call(Operator::GtEq, vec![value.clone(), low])?,
                            Expr::call(Operator::LtEq, vec![value, high])?,
                        ],
                    )
                }
            }
            SqlExpr::InList {
                expr: value,
                list,
                negated,
            } => {
                let value = self.bind_expr(value, ctx)?;
                let (compare, combine) = if *negated {
                    (Operator::NotEq, Operator::And)
                } else {
                    (Operator::Eq, Operator::Or)
                };

                let mut terms = Vec::with_capacity(list.len());
                for item in list {
                    let item = self.bind_expr(item, ctx)?;
                    terms.push(Expr::call(compare, vec![value.clone(), item])?);
                }

                match terms.len() {
                    0 => Err(PlannerError::invalid("IN list must not be empty")),
                    1 => Ok(terms.remove(0)),
                    _ => Expr::call(combine, terms),
                }
            }
            SqlExpr::Like {
                negated,
                expr: value,
                pattern,
                ..
            } => {
                let value = self.bind_expr(value, ctx)?;
                let pattern = self.bind_expr(pattern, ctx)?;
                let like = Expr::call(Operator::Like, vec![value, pattern])?;
                if *negated {
                    Expr::call(Operator::Not, vec![like])
                } else {
                    Ok(like)
                }
            }
            SqlExpr::Cast {
                expr: value,
                data_type,
                ..
            } => {
                let operand = self.bind_expr(value, ctx)?;
                let target = sql_type_of(data_type)?;
                let source = operand.ty();
                if !can_cast(source, target) {
                    return Err(PlannerError::type_mismatch(format!(
                        "Cast function cannot convert value of type {} to type {}",
                        source, target
                    )));
                }
                Ok(Expr::cast(operand, target))
            }
            SqlExpr::Function(function) => {
                let name = function.name.to_string();
                if AggFunction::from_name(&name).is_some() {
                    return Err(match ctx.clause() {
                        Clause::AggregateArgument => {
                            PlannerError::invalid("Aggregate expressions cannot be nested")
                        }
                        clause => PlannerError::invalid(format!(
                            "Aggregate expression is illegal in {} clause",
                            clause.as_str()
                        )),
                    });
                }
                Err(PlannerError::unsupported(format!("Function '{}'", name)))
            }
            SqlExpr::Subquery(_) | SqlExpr::InSubquery { .. } | SqlExpr::Exists { .. } => {
                Err(PlannerError::unsupported("Subqueries"))
            }
            other => Err(PlannerError::unsupported(format!("Expression '{}'", other))),
        }
    }

    fn resolve_column(
        &self,
        scope: &Scope,
        qualifier: Option<&str>,
        name: &str,
    ) -> PlannerResult<Expr> {
        if let Some(q) = qualifier {
            if !scope.qualifiers.iter().any(|s| self.ident_eq(s, q)) {
                return Err(PlannerError::unknown_table(q));
            }
        }

        let mut matches = scope.columns.iter().enumerate().filter(|(_, c)| {
            self.ident_eq(&c.name, name)
                && qualifier.map_or(true, |q| self.ident_eq(&c.qualifier, q))
        });

        let display = match qualifier {
            Some(q) => format!("{}.{}", q, name),
            None => name.to_string(),
        };

        match (matches.next(), matches.next()) {
            (Some((index, column)), None) => Ok(Expr::input_ref(index, column.ty)),
            (Some(_), Some(_)) => Err(PlannerError::ambiguous_column(display)),
            (None, _) => Err(PlannerError::unknown_column(display)),
        }
    }

    fn ident_eq(&self, a: &str, b: &str) -> bool {
        if self.case_sensitive {
            a == b
        } else {
            a.eq_ignore_ascii_case(b)
        }
    }
}

fn expect_condition(condition: &Expr, clause: Clause) -> PlannerResult<()> {
    if condition.ty().is_boolean_like() {
        Ok(())
    } else {
        Err(PlannerError::type_mismatch(format!(
            "{} clause must be a condition, found type {}",
            clause.as_str(),
            condition.ty()
        )))
    }
}

fn target_name(target: &SelectTarget<'_>, ordinal: usize, scope: &Scope) -> String {
    match target {
        SelectTarget::Expr {
            alias: Some(alias), ..
        } => alias.value.clone(),
        SelectTarget::Expr { expr, .. } => match expr {
            SqlExpr::Identifier(ident) => ident.value.clone(),
            SqlExpr::CompoundIdentifier(parts) => parts
                .last()
                .map(|p| p.value.clone())
                .unwrap_or_else(|| format!("EXPR${}", ordinal)),
            _ => format!("EXPR${}", ordinal),
        },
        SelectTarget::Column(index) => scope
            .columns
            .get(*index)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("EXPR${}", ordinal)),
    }
}

fn is_aggregate_function(expr: &SqlExpr) -> bool {
    matches!(expr, SqlExpr::Function(f) if AggFunction::from_name(&f.name.to_string()).is_some())
}

fn contains_aggregate(expr: &SqlExpr) -> bool {
    is_aggregate_function(expr) || sub_expressions(expr).into_iter().any(contains_aggregate)
}

fn sub_expressions(expr: &SqlExpr) -> Vec<&SqlExpr> {
    match expr {
        SqlExpr::BinaryOp { left, right, .. } => vec![left.as_ref(), right.as_ref()],
        SqlExpr::UnaryOp { expr, .. }
        | SqlExpr::Nested(expr)
        | SqlExpr::IsNull(expr)
        | SqlExpr::IsNotNull(expr)
        | SqlExpr::Cast { expr, .. } => vec![expr.as_ref()],
        SqlExpr::Between {
            expr, low, high, ..
        } => vec![expr.as_ref(), low.as_ref(), high.as_ref()],
        SqlExpr::InList { expr, list, .. } => {
            let mut children = vec![expr.as_ref()];
            children.extend(list.iter());
            children
        }
        SqlExpr::Like { expr, pattern, .. } => vec![expr.as_ref(), pattern.as_ref()],
        SqlExpr::Function(function) => function
            .args
            .iter()
            .filter_map(|arg| match arg {
                FunctionArg::Unnamed(FunctionArgExpr::Expr(e)) => Some(e),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn binary_operator(op: &BinaryOperator) -> PlannerResult<Operator> {
    match op {
        BinaryOperator::Eq => Ok(Operator::Eq),
        BinaryOperator::NotEq => Ok(Operator::NotEq),
        BinaryOperator::Lt => Ok(Operator::Lt),
        BinaryOperator::LtEq => Ok(Operator::LtEq),
        BinaryOperator::Gt => Ok(Operator::Gt),
        BinaryOperator::GtEq => Ok(Operator::GtEq),
        BinaryOperator::And => Ok(Operator::And),
        BinaryOperator::Or => Ok(Operator::Or),
        BinaryOperator::Plus => Ok(Operator::Plus),
        BinaryOperator::Minus => Ok(Operator::Minus),
        BinaryOperator::Multiply => Ok(Operator::Multiply),
        BinaryOperator::Divide => Ok(Operator::Divide),
        BinaryOperator::Modulo => Ok(Operator::Modulo),
        other => Err(PlannerError::unsupported(format!("Operator '{}'", other))),
    }
}

fn bind_value(value: &Value) -> PlannerResult<Expr> {
    let literal = match value {
        Value::Number(text, _) => Literal::from_number(text)?,
        Value::SingleQuotedString(s) => Literal::String(s.clone()),
        Value::Boolean(b) => Literal::Boolean(*b),
        Value::Null => Literal::Null,
        other => return Err(PlannerError::unsupported(format!("Literal {}", other))),
    };
    Ok(Expr::literal(literal))
}

/// Normalises a `yyyy-mm-dd` date, rejecting impossible dates
fn parse_date(text: &str) -> Option<String> {
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .ok()
        .map(|date| date.format("%Y-%m-%d").to_string())
}

/// Maps a CAST target type onto the planner's SQL types
fn sql_type_of(data_type: &DataType) -> PlannerResult<SqlType> {
    let ty = match data_type {
        DataType::Int(_) | DataType::Integer(_) | DataType::SmallInt(_) | DataType::TinyInt(_) => {
            SqlType::Integer
        }
        DataType::BigInt(_) => SqlType::BigInt,
        DataType::Decimal(info) | DataType::Numeric(info) => {
            let (precision, scale) = match info {
                ExactNumberInfo::None => (MAX_DECIMAL_PRECISION as u64, 0),
                ExactNumberInfo::Precision(p) => (*p, 0),
                ExactNumberInfo::PrecisionAndScale(p, s) => (*p, *s),
            };
            if precision == 0 || precision > MAX_DECIMAL_PRECISION as u64 || scale > precision {
                return Err(PlannerError::invalid(format!(
                    "Invalid DECIMAL precision and scale ({}, {})",
                    precision, scale
                )));
            }
            SqlType::Decimal {
                precision: precision as u8,
                scale: scale as i8,
            }
        }
        DataType::Double | DataType::DoublePrecision | DataType::Float(_) => SqlType::Double,
        DataType::Char(length) | DataType::Character(length) => {
            let width = length
                .as_ref()
                .and_then(|l| l.to_string().parse::<u32>().ok())
                .unwrap_or(1);
            SqlType::Char(width)
        }
        DataType::Varchar(_) | DataType::CharacterVarying(_) | DataType::Text => {
            SqlType::Varchar
        }
        DataType::Date => SqlType::Date,
        DataType::Boolean => SqlType::Boolean,
        other => return Err(PlannerError::unsupported(format!("Type {}", other))),
    };
    Ok(ty)
}

fn can_cast(from: SqlType, to: SqlType) -> bool {
    from == SqlType::Null
        || from == to
        || from.is_character()
        || to.is_character()
        || (from.is_numeric() && to.is_numeric())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::sales_catalog;
    use crate::planner::explain::explain;
    use crate::planner::PlannerErrorCode;

    fn bind(sql: &str) -> PlannerResult<LogicalPlan> {
        let catalog = sales_catalog();
        Binder::new(&catalog).bind_sql(sql)
    }

    fn bind_explain(sql: &str) -> String {
        explain(&bind(sql).unwrap())
    }

    fn bind_err(sql: &str) -> PlannerErrorCode {
        bind(sql).unwrap_err().code()
    }

    #[test]
    fn test_filter_and_project() {
        assert_eq!(
            bind_explain("SELECT o_id FROM orders WHERE o_total > 100"),
            "LogicalProject(o_id=[$0])\n\
             \x20 LogicalFilter(condition=[>($2, 100)])\n\
             \x20   LogicalTableScan(table=[[orders]])\n"
        );
    }

    #[test]
    fn test_where_true_adds_no_filter() {
        assert_eq!(
            bind_explain("SELECT o_id FROM orders WHERE TRUE"),
            "LogicalProject(o_id=[$0])\n\
             \x20 LogicalTableScan(table=[[orders]])\n"
        );
    }

    #[test]
    fn test_global_count_star_projects_constant() {
        let text = bind_explain("SELECT COUNT(*) FROM orders WHERE o_total > 10");
        assert!(text.contains("LogicalAggregate(group=[{}], EXPR$0=[COUNT()])"));
        assert!(text.contains("LogicalProject($f0=[0])"));
        assert!(text.contains("LogicalFilter(condition=[>($2, 10)])"));
    }

    #[test]
    fn test_inner_join_with_aliases() {
        assert_eq!(
            bind_explain(
                "SELECT c.c_name, o.o_total FROM orders o JOIN customer c ON o.o_custkey = c.c_id"
            ),
            "LogicalProject(c_name=[$5], o_total=[$2])\n\
             \x20 LogicalJoin(condition=[=($1, $4)], joinType=[inner])\n\
             \x20   LogicalTableScan(table=[[orders]])\n\
             \x20   LogicalTableScan(table=[[customer]])\n"
        );
    }

    #[test]
    fn test_comma_join_is_inner_on_true() {
        let plan = bind("SELECT o_id FROM orders, customer WHERE o_custkey = c_id").unwrap();
        let text = explain(&plan);
        assert!(text.contains("LogicalJoin(condition=[true], joinType=[inner])"));
        assert!(text.contains("LogicalFilter(condition=[=($1, $4)])"));
    }

    #[test]
    fn test_group_by_shape() {
        assert_eq!(
            bind_explain("SELECT c_nation, COUNT(*) FROM customer GROUP BY c_nation"),
            "LogicalProject(c_nation=[$0], EXPR$1=[$1])\n\
             \x20 LogicalAggregate(group=[{0}], EXPR$1=[COUNT()])\n\
             \x20   LogicalProject(c_nation=[$2])\n\
             \x20     LogicalTableScan(table=[[customer]])\n"
        );
    }

    #[test]
    fn test_having_and_composite_aggregates() {
        assert_eq!(
            bind_explain(
                "SELECT c_nation, SUM(c_id) * 2 AS doubled FROM customer \
                 GROUP BY c_nation HAVING COUNT(*) > 1"
            ),
            "LogicalProject(c_nation=[$0], doubled=[*($1, 2)])\n\
             \x20 LogicalFilter(condition=[>($2, 1)])\n\
             \x20   LogicalAggregate(group=[{0}], $f1=[SUM($1)], $f2=[COUNT()])\n\
             \x20     LogicalProject(c_nation=[$2], c_id=[$0])\n\
             \x20       LogicalTableScan(table=[[customer]])\n"
        );
    }

    #[test]
    fn test_identical_aggregates_share_a_call() {
        let text = bind_explain("SELECT SUM(o_total), SUM(o_total) + 1 FROM orders");
        assert!(text.contains("LogicalAggregate(group=[{}], EXPR$0=[SUM($0)])"));
    }

    #[test]
    fn test_distinct_adds_aggregate() {
        let text = bind_explain("SELECT DISTINCT c_nation FROM customer");
        assert!(text.starts_with("LogicalAggregate(group=[{0}])\n  LogicalProject(c_nation=[$2])"));
    }

    #[test]
    fn test_in_list_and_between_expand() {
        let text = bind_explain(
            "SELECT o_id FROM orders WHERE o_custkey IN (1, 2) AND o_id BETWEEN 10 AND 20",
        );
        assert!(text.contains(
            "LogicalFilter(condition=[AND(OR(=($1, 1), =($1, 2)), >=($0, 10), <=($0, 20))])"
        ));
    }

    #[test]
    fn test_date_and_decimal_literals() {
        let text = bind_explain(
            "SELECT o_id FROM orders WHERE o_date < DATE '1998-12-01' AND o_total > 0.05",
        );
        assert!(text.contains("AND(<($3, 1998-12-01), >($2, 0.05:DECIMAL(3, 2)))"));
    }

    #[test]
    fn test_wildcards() {
        let text = bind_explain("SELECT c.* FROM orders o, customer c");
        assert!(text.starts_with("LogicalProject(c_id=[$4], c_name=[$5], c_nation=[$6])"));
    }

    #[test]
    fn test_duplicate_output_names_are_uniquified() {
        let text = bind_explain("SELECT o.o_id, o.o_id FROM orders o");
        assert!(text.starts_with("LogicalProject(o_id=[$0], o_id0=[$0])"));
    }

    #[test]
    fn test_validation_errors() {
        assert_eq!(bind_err("SELECT x FROM orders"), PlannerErrorCode::AethraQueryUnknownColumn);
        assert_eq!(bind_err("SELECT * FROM lineitem"), PlannerErrorCode::AethraQueryUnknownTable);
        assert_eq!(
            bind_err("SELECT o_id FROM orders a, orders b"),
            PlannerErrorCode::AethraQueryAmbiguousColumn
        );
        assert_eq!(
            bind_err("SELECT z.o_id FROM orders"),
            PlannerErrorCode::AethraQueryUnknownTable
        );
        assert_eq!(
            bind_err("SELECT SUM(c_name) FROM customer"),
            PlannerErrorCode::AethraQueryTypeMismatch
        );
        assert_eq!(
            bind_err("SELECT o_id FROM orders WHERE o_date = 5"),
            PlannerErrorCode::AethraQueryTypeMismatch
        );
        assert_eq!(
            bind_err("SELECT o_id FROM orders WHERE o_id"),
            PlannerErrorCode::AethraQueryTypeMismatch
        );
    }

    #[test]
    fn test_grouping_errors() {
        assert_eq!(
            bind_err("SELECT c_name, COUNT(*) FROM customer GROUP BY c_nation"),
            PlannerErrorCode::AethraQueryNotGrouped
        );
        assert_eq!(
            bind_err("SELECT * FROM customer GROUP BY c_nation"),
            PlannerErrorCode::AethraQueryNotGrouped
        );
        assert_eq!(
            bind_err("SELECT o_id FROM orders WHERE SUM(o_total) > 1"),
            PlannerErrorCode::AethraQueryInvalid
        );
        assert_eq!(
            bind_err("SELECT SUM(MAX(o_total)) FROM orders"),
            PlannerErrorCode::AethraQueryInvalid
        );
    }

    #[test]
    fn test_unsupported_features() {
        for sql in [
            "SELECT o_id FROM orders ORDER BY o_id",
            "SELECT o_id FROM orders LIMIT 5",
            "SELECT o_id FROM orders UNION SELECT c_id FROM customer",
            "WITH x AS (SELECT o_id FROM orders) SELECT o_id FROM x",
            "SELECT o_id FROM orders WHERE o_custkey IN (SELECT c_id FROM customer)",
            "SELECT o_id FROM orders JOIN customer USING (o_id)",
            "SELECT UPPER(c_name) FROM customer",
        ] {
            assert_eq!(
                bind_err(sql),
                PlannerErrorCode::AethraQueryUnsupported,
                "expected {} to be unsupported",
                sql
            );
        }
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(bind_err("SELEC o_id FROM orders"), PlannerErrorCode::AethraQueryParse);
        assert_eq!(
            bind_err("SELECT o_id FROM orders; SELECT c_id FROM customer"),
            PlannerErrorCode::AethraQueryInvalid
        );
        assert_eq!(bind_err("DROP TABLE orders"), PlannerErrorCode::AethraQueryInvalid);
    }

    #[test]
    fn test_case_insensitive_names() {
        let text = bind_explain("SELECT O_ID FROM ORDERS WHERE O_TOTAL > 1");
        assert!(text.contains("LogicalFilter(condition=[>($2, 1)])"));
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("1998-12-01").as_deref(), Some("1998-12-01"));
        assert_eq!(parse_date("2000-2-29").as_deref(), Some("2000-02-29"));
        assert_eq!(parse_date("1900-02-29"), None);
        assert_eq!(parse_date("1998-13-01"), None);
        assert_eq!(parse_date("yesterday"), None);
        assert_eq!(parse_date(" 2024-02-29 ").as_deref(), Some("2024-02-29"));
    }
}
