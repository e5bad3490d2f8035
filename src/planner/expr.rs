//! Row expressions
//!
//! Expressions reference the columns of their input by ordinal (`$0`, `$1`,
//! ...) and print in the same textual form the engine plan format uses.

use std::fmt;

use crate::catalog::{SqlType, MAX_DECIMAL_PRECISION};

use super::errors::{PlannerError, PlannerResult};

/// Scalar operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
    Not,
    Plus,
    Minus,
    Multiply,
    Divide,
    Modulo,
    /// Unary minus
    Negate,
    IsNull,
    IsNotNull,
    Like,
    Cast,
}

impl Operator {
    /// Printed operator name
    pub fn name(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "<>",
            Operator::Lt => "<",
            Operator::LtEq => "<=",
            Operator::Gt => ">",
            Operator::GtEq => ">=",
            Operator::And => "AND",
            Operator::Or => "OR",
            Operator::Not => "NOT",
            Operator::Plus => "+",
            Operator::Minus | Operator::Negate => "-",
            Operator::Multiply => "*",
            Operator::Divide => "/",
            Operator::Modulo => "MOD",
            Operator::IsNull => "IS NULL",
            Operator::IsNotNull => "IS NOT NULL",
            Operator::Like => "LIKE",
            Operator::Cast => "CAST",
        }
    }

    pub fn is_comparison(&self) -> bool {
        matches!(
            self,
            Operator::Eq
                | Operator::NotEq
                | Operator::Lt
                | Operator::LtEq
                | Operator::Gt
                | Operator::GtEq
        )
    }

    /// Derives the result type of applying this operator to `operands`.
    ///
    /// CAST carries its target type explicitly and is not derived here.
    pub fn derive_type(&self, operands: &[SqlType]) -> PlannerResult<SqlType> {
        let mismatch = || {
            let types: Vec<String> = operands.iter().map(|t| t.to_string()).collect();
            PlannerError::type_mismatch(format!(
                "Cannot apply '{}' to arguments of type <{}>",
                self.name(),
                types.join(", ")
            ))
        };

        match (self, operands) {
            (op, [l, r]) if op.is_comparison() => {
                if l.is_comparable_with(r) {
                    Ok(SqlType::Boolean)
                } else {
                    Err(mismatch())
                }
            }
            (Operator::And | Operator::Or, ops) if ops.len() >= 2 => {
                if ops.iter().all(|t| t.is_boolean_like()) {
                    Ok(SqlType::Boolean)
                } else {
                    Err(mismatch())
                }
            }
            (Operator::Not, [t]) if t.is_boolean_like() => Ok(SqlType::Boolean),
            (Operator::Plus | Operator::Minus, [l, r]) => {
                SqlType::additive(*l, *r).ok_or_else(mismatch)
            }
            (Operator::Multiply, [l, r]) => SqlType::multiplicative(*l, *r).ok_or_else(mismatch),
            (Operator::Divide | Operator::Modulo, [l, r]) => {
                SqlType::divisive(*l, *r).ok_or_else(mismatch)
            }
            (Operator::Negate, [t]) if t.is_numeric() => Ok(*t),
            (Operator::IsNull | Operator::IsNotNull, [_]) => Ok(SqlType::Boolean),
            (Operator::Like, [l, r])
                if (l.is_character() || *l == SqlType::Null)
                    && (r.is_character() || *r == SqlType::Null) =>
            {
                Ok(SqlType::Boolean)
            }
            _ => Err(mismatch()),
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Literal values
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    Integer(i64),
    /// Exact numeric kept as written
    Decimal(String),
    /// Approximate numeric kept as written
    Double(String),
    String(String),
    /// `yyyy-mm-dd`
    Date(String),
    Boolean(bool),
    Null,
}

impl Literal {
    pub fn ty(&self) -> SqlType {
        match self {
            Literal::Integer(v) => {
                if i32::try_from(*v).is_ok() {
                    SqlType::Integer
                } else {
                    SqlType::BigInt
                }
            }
            Literal::Decimal(text) => decimal_literal_type(text),
            Literal::Double(_) => SqlType::Double,
            Literal::String(s) => SqlType::Char(s.chars().count() as u32),
            Literal::Date(_) => SqlType::Date,
            Literal::Boolean(_) => SqlType::Boolean,
            Literal::Null => SqlType::Null,
        }
    }

    /// Parses a numeric token the way SQL types it.
    ///
    /// Exact numerics wider than `DECIMAL(38)` are rejected.
    pub fn from_number(text: &str) -> PlannerResult<Self> {
        if text.contains(['e', 'E']) {
            return Ok(Literal::Double(text.to_string()));
        }
        if !text.contains('.') {
            if let Ok(v) = text.parse::<i64>() {
                return Ok(Literal::Integer(v));
            }
        }

        let digits = decimal_digits(text);
        if digits > MAX_DECIMAL_PRECISION as usize {
            return Err(PlannerError::invalid(format!(
                "Numeric literal {} exceeds the maximum precision of {}",
                text, MAX_DECIMAL_PRECISION
            )));
        }
        Ok(Literal::Decimal(text.to_string()))
    }

    /// Returns the negated literal, if the literal is numeric
    pub fn negate(&self) -> Option<Literal> {
        match self {
            Literal::Integer(v) => v.checked_neg().map(Literal::Integer),
            Literal::Decimal(text) => Some(Literal::Decimal(negate_text(text))),
            Literal::Double(text) => Some(Literal::Double(negate_text(text))),
            _ => None,
        }
    }
}

fn negate_text(text: &str) -> String {
    match text.strip_prefix('-') {
        Some(positive) => positive.to_string(),
        None => format!("-{}", text),
    }
}

/// DECIMAL(p, s) of an exact numeric literal: p counts every digit, s the
/// digits after the point.
fn decimal_digits(text: &str) -> usize {
    text.chars().filter(|c| c.is_ascii_digit()).count()
}

fn decimal_literal_type(text: &str) -> SqlType {
    let precision = decimal_digits(text).max(1);
    let scale = text
        .split_once('.')
        .map_or(0, |(_, frac)| decimal_digits(frac));
    SqlType::Decimal {
        precision: precision as u8,
        scale: scale.min(precision) as i8,
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(v) => write!(f, "{}", v),
            Literal::Decimal(text) => write!(f, "{}:{}", text, self.ty()),
            Literal::Double(text) => write!(f, "{}:DOUBLE", text),
            Literal::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
            Literal::Date(d) => write!(f, "{}", d),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Null => write!(f, "null"),
        }
    }
}

/// A typed row expression
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    /// Reference to column `index` of the input row
    InputRef { index: usize, ty: SqlType },
    Literal(Literal),
    Call {
        op: Operator,
        operands: Vec<Expr>,
        ty: SqlType,
    },
}

impl Expr {
    pub fn input_ref(index: usize, ty: SqlType) -> Self {
        Expr::InputRef { index, ty }
    }

    pub fn literal(value: Literal) -> Self {
        Expr::Literal(value)
    }

    pub fn true_literal() -> Self {
        Expr::Literal(Literal::Boolean(true))
    }

    /// Builds a type-checked call
    pub fn call(op: Operator, operands: Vec<Expr>) -> PlannerResult<Self> {
        let types: Vec<SqlType> = operands.iter().map(Expr::ty).collect();
        let ty = op.derive_type(&types)?;
        if matches!(op, Operator::And | Operator::Or) {
            return Ok(Self::flatten(op, operands, ty));
        }
        Ok(Expr::Call { op, operands, ty })
    }

    /// Builds a CAST to `target`
    pub fn cast(operand: Expr, target: SqlType) -> Self {
        Expr::Call {
            op: Operator::Cast,
            operands: vec![operand],
            ty: target,
        }
    }

    /// Conjunction of `conjuncts`; TRUE when empty
    pub fn and_all(conjuncts: Vec<Expr>) -> Self {
        match conjuncts.len() {
            0 => Self::true_literal(),
            1 => conjuncts.into_iter().next().unwrap_or_else(Self::true_literal),
            _ => Self::flatten(Operator::And, conjuncts, SqlType::Boolean),
        }
    }

    fn flatten(op: Operator, operands: Vec<Expr>, ty: SqlType) -> Self {
        let mut flat = Vec::with_capacity(operands.len());
        for operand in operands {
            match operand {
                Expr::Call {
                    op: inner,
                    operands: nested,
                    ..
                } if inner == op => flat.extend(nested),
                other => flat.push(other),
            }
        }
        Expr::Call {
            op,
            operands: flat,
            ty,
        }
    }

    pub fn ty(&self) -> SqlType {
        match self {
            Expr::InputRef { ty, .. } => *ty,
            Expr::Literal(lit) => lit.ty(),
            Expr::Call { ty, .. } => *ty,
        }
    }

    /// Splits a condition into its top-level AND operands
    pub fn conjunctions(&self) -> Vec<Expr> {
        match self {
            Expr::Call {
                op: Operator::And,
                operands,
                ..
            } => operands.iter().flat_map(Expr::conjunctions).collect(),
            Expr::Literal(Literal::Boolean(true)) => Vec::new(),
            other => vec![other.clone()],
        }
    }

    pub fn is_always_true(&self) -> bool {
        matches!(self, Expr::Literal(Literal::Boolean(true)))
    }

    /// Column ordinals referenced, in order of first reference
    pub fn input_refs(&self) -> Vec<usize> {
        let mut refs = Vec::new();
        self.collect_input_refs(&mut refs);
        refs
    }

    pub(crate) fn collect_input_refs(&self, refs: &mut Vec<usize>) {
        match self {
            Expr::InputRef { index, .. } => {
                if !refs.contains(index) {
                    refs.push(*index);
                }
            }
            Expr::Literal(_) => {}
            Expr::Call { operands, .. } => {
                for operand in operands {
                    operand.collect_input_refs(refs);
                }
            }
        }
    }

    /// Rewrites every column reference through `mapping`
    pub fn remap(&self, mapping: &dyn Fn(usize) -> usize) -> Expr {
        match self {
            Expr::InputRef { index, ty } => Expr::InputRef {
                index: mapping(*index),
                ty: *ty,
            },
            Expr::Literal(lit) => Expr::Literal(lit.clone()),
            Expr::Call { op, operands, ty } => Expr::Call {
                op: *op,
                operands: operands.iter().map(|o| o.remap(mapping)).collect(),
                ty: *ty,
            },
        }
    }

    /// Shifts every column reference down by `offset`
    pub fn shift_down(&self, offset: usize) -> Expr {
        self.remap(&|i| i - offset)
    }

    /// Shifts every column reference up by `offset`
    pub fn shift_up(&self, offset: usize) -> Expr {
        self.remap(&|i| i + offset)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::InputRef { index, .. } => write!(f, "${}", index),
            Expr::Literal(lit) => write!(f, "{}", lit),
            Expr::Call {
                op: Operator::Cast,
                operands,
                ty,
            } => {
                write!(f, "CAST(")?;
                write_operands(f, operands)?;
                write!(f, "):{}", ty)
            }
            Expr::Call { op, operands, .. } => {
                write!(f, "{}(", op.name())?;
                write_operands(f, operands)?;
                write!(f, ")")
            }
        }
    }
}

fn write_operands(f: &mut fmt::Formatter<'_>, operands: &[Expr]) -> fmt::Result {
    for (i, operand) in operands.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", operand)?;
    }
    Ok(())
}

/// Formats a list of expressions as `[a, b, c]`
pub fn format_expr_list(exprs: &[Expr]) -> String {
    let parts: Vec<String> = exprs.iter().map(|e| e.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int_ref(index: usize) -> Expr {
        Expr::input_ref(index, SqlType::Integer)
    }

    #[test]
    fn test_call_display() {
        let eq = Expr::call(Operator::Eq, vec![int_ref(1), Expr::literal(Literal::Integer(5))])
            .unwrap();
        assert_eq!(eq.to_string(), "=($1, 5)");
        assert_eq!(eq.ty(), SqlType::Boolean);
    }

    #[test]
    fn test_literal_display() {
        assert_eq!(Literal::String("it's".into()).to_string(), "'it''s'");
        assert_eq!(Literal::Date("1998-12-01".into()).to_string(), "1998-12-01");
        assert_eq!(
            Literal::from_number("0.06").unwrap().to_string(),
            "0.06:DECIMAL(3, 2)"
        );
        assert_eq!(Literal::from_number("24").unwrap(), Literal::Integer(24));
        assert_eq!(Literal::Integer(1 << 40).ty(), SqlType::BigInt);
    }

    #[test]
    fn test_wide_numeric_literal_rejected() {
        let widest = "9".repeat(38);
        assert_eq!(
            Literal::from_number(&widest).unwrap().ty(),
            SqlType::Decimal {
                precision: 38,
                scale: 0
            }
        );

        let err = Literal::from_number(&format!("{}.5", widest)).unwrap_err();
        assert_eq!(err.code(), crate::planner::PlannerErrorCode::AethraQueryInvalid);
    }

    #[test]
    fn test_cast_display() {
        let cast = Expr::cast(int_ref(0), SqlType::Double);
        assert_eq!(cast.to_string(), "CAST($0):DOUBLE");
    }

    #[test]
    fn test_and_flattens() {
        let a = Expr::call(Operator::Gt, vec![int_ref(0), Expr::literal(Literal::Integer(1))])
            .unwrap();
        let b = Expr::call(Operator::Lt, vec![int_ref(1), Expr::literal(Literal::Integer(2))])
            .unwrap();
        let c = Expr::call(Operator::Eq, vec![int_ref(2), int_ref(3)]).unwrap();
        let ab = Expr::call(Operator::And, vec![a, b]).unwrap();
        let abc = Expr::call(Operator::And, vec![ab, c]).unwrap();

        assert_eq!(abc.to_string(), "AND(>($0, 1), <($1, 2), =($2, $3))");
        assert_eq!(abc.conjunctions().len(), 3);
    }

    #[test]
    fn test_type_mismatch_rejected() {
        let err = Expr::call(
            Operator::Plus,
            vec![int_ref(0), Expr::literal(Literal::Date("1998-01-01".into()))],
        )
        .unwrap_err();
        assert_eq!(
            err.code(),
            crate::planner::PlannerErrorCode::AethraQueryTypeMismatch
        );
    }

    #[test]
    fn test_input_refs_first_reference_order() {
        let e = Expr::call(
            Operator::Plus,
            vec![
                int_ref(3),
                Expr::call(Operator::Multiply, vec![int_ref(1), int_ref(3)]).unwrap(),
            ],
        )
        .unwrap();
        assert_eq!(e.input_refs(), vec![3, 1]);
        assert_eq!(e.remap(&|i| i * 10).to_string(), "+($30, *($10, $30))");
    }

    #[test]
    fn test_empty_conjunction_is_true() {
        assert!(Expr::and_all(Vec::new()).is_always_true());
        assert!(Expr::true_literal().conjunctions().is_empty());
    }
}
