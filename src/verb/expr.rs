use std::cmp::Ordering;

use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{query::QueryError, table::Table};

/// Leaf value in a verb expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operand {
    /// Row field lookup by key; a missing key evaluates to null.
    Field(String),
    /// Inline JSON literal.
    Lit(Value),
    /// Named parameter resolved against the table's annotation.
    Param(String),
}

impl Operand {
    pub fn eval(&self, row: &Map<String, Value>, table: &dyn Table) -> Result<Value, QueryError> {
        match self {
            Operand::Field(name) => Ok(row.get(name).cloned().unwrap_or(Value::Null)),
            Operand::Lit(value) => Ok(value.clone()),
            Operand::Param(name) => table
                .params()
                .and_then(|params| params.get(name))
                .cloned()
                .ok_or_else(|| QueryError::UnknownParam(name.clone())),
        }
    }
}

/// Scalar expression: an operand or a binary arithmetic combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Expr {
    Operand(Operand),
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl Expr {
    pub fn eval(&self, row: &Map<String, Value>, table: &dyn Table) -> Result<Value, QueryError> {
        match self {
            Expr::Operand(operand) => operand.eval(row, table),
            Expr::Binary { left, op, right } => {
                let l = left.eval(row, table)?;
                let r = right.eval(row, table)?;
                Ok(Self::arith(&l, *op, &r))
            }
        }
    }

    // Numeric arithmetic; null or non-numeric operands yield null, as does
    // division by zero. Two integers stay on the exact i64 path; overflow
    // and inexact division fall back to floating point.
    fn arith(l: &Value, op: BinaryOp, r: &Value) -> Value {
        if let (Some(x), Some(y)) = (l.as_i64(), r.as_i64()) {
            let exact = match op {
                BinaryOp::Add => x.checked_add(y),
                BinaryOp::Sub => x.checked_sub(y),
                BinaryOp::Mul => x.checked_mul(y),
                BinaryOp::Div => {
                    if y == 0 {
                        return Value::Null;
                    }
                    if x.checked_rem(y) == Some(0) {
                        x.checked_div(y)
                    } else {
                        None
                    }
                }
            };
            if let Some(out) = exact {
                return Value::Number(serde_json::Number::from(out));
            }
        }
        let (Some(x), Some(y)) = (l.as_f64(), r.as_f64()) else {
            return Value::Null;
        };
        let out = match op {
            BinaryOp::Add => x + y,
            BinaryOp::Sub => x - y,
            BinaryOp::Mul => x * y,
            BinaryOp::Div => {
                if y == 0.0 {
                    return Value::Null;
                }
                x / y
            }
        };
        serde_json::Number::from_f64(out)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}

/// Shorthand for a field-reference expression.
pub fn field(name: &str) -> Expr {
    Expr::Operand(Operand::Field(name.to_string()))
}

/// Shorthand for a literal expression.
pub fn lit(value: impl Into<Value>) -> Expr {
    Expr::Operand(Operand::Lit(value.into()))
}

/// Shorthand for a parameter-reference expression.
pub fn param(name: &str) -> Expr {
    Expr::Operand(Operand::Param(name.to_string()))
}

pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

/// Row-level comparison operator used by filters and joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    /// Null never compares true; ordering comparisons only hold between two
    /// numbers or two strings.
    pub fn test(&self, l: &Value, r: &Value) -> bool {
        if l.is_null() || r.is_null() {
            return false;
        }
        match self {
            CmpOp::Eq => value_equal(l, r),
            CmpOp::Ne => !value_equal(l, r),
            CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
                let ord = match (l, r) {
                    (Value::Number(_), Value::Number(_)) | (Value::String(_), Value::String(_)) => {
                        cmp_values(l, r)
                    }
                    _ => return false,
                };
                match self {
                    CmpOp::Lt => ord == Ordering::Less,
                    CmpOp::Le => ord != Ordering::Greater,
                    CmpOp::Gt => ord == Ordering::Greater,
                    CmpOp::Ge => ord != Ordering::Less,
                    CmpOp::Eq | CmpOp::Ne => false,
                }
            }
        }
    }
}

/// Loose scalar equality; numbers compare by value, not representation.
pub fn value_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Sort comparator over JSON values: nulls last in both directions,
/// numbers by value, strings lexicographic, mixed types by type rank.
pub fn cmp_values_for_sort(a: &Value, b: &Value, ascending: bool) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Greater,
        (_, Value::Null) => Ordering::Less,
        _ => {
            let ord = cmp_values(a, b);
            if ascending { ord } else { ord.reverse() }
        }
    }
}

fn cmp_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = OrderedFloat(x.as_f64().unwrap_or(f64::NAN));
            let y = OrderedFloat(y.as_f64().unwrap_or(f64::NAN));
            x.cmp(&y)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::Number(_) => 2,
        Value::String(_) => 3,
        Value::Array(_) => 4,
        Value::Object(_) => 5,
    }
}
