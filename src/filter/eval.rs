// Filter expression evaluator - walks the parsed tree against one row's
// field values. Field values arrive as raw strings and coerce to numbers
// when both sides of an operator are numeric.

use std::collections::HashMap;

use crate::error::{ProcessingError, Result};
use crate::filter::parser::{Expr, Op};

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Num(f64),
    Str(String),
    Bool(bool),
    Null,
}

impl Value {
    /// Strict truthiness: only a true boolean, a non-zero number or a
    /// non-empty string keeps a row.
    pub fn truthy(&self) -> bool {
        match self {
            Value::Bool(b) => *b,
            Value::Num(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Null => false,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Num(n) => Some(*n),
            Value::Str(s) => s.trim().parse::<f64>().ok(),
            Value::Bool(b) => Some(*b as i64 as f64),
            Value::Null => None,
        }
    }

    fn as_text(&self) -> String {
        match self {
            Value::Num(n) => n.to_string(),
            Value::Str(s) => s.clone(),
            Value::Bool(b) => (if *b { "True" } else { "False" }).to_string(),
            Value::Null => String::new(),
        }
    }
}

pub fn eval(expr: &Expr, values: &[String], index: &HashMap<String, usize>) -> Result<Value> {
    match expr {
        Expr::Number(n) => Ok(Value::Num(*n)),
        Expr::Text(s) => Ok(Value::Str(s.clone())),
        Expr::Bool(b) => Ok(Value::Bool(*b)),
        Expr::Null => Ok(Value::Null),
        Expr::Field(name) => {
            let position = index.get(name).copied().ok_or_else(|| {
                ProcessingError::Filter(format!("Unknown field: '{}'", name))
            })?;
            Ok(Value::Str(values.get(position).cloned().unwrap_or_default()))
        }
        Expr::Not(operand) => Ok(Value::Bool(!eval(operand, values, index)?.truthy())),
        Expr::Neg(operand) => {
            let value = eval(operand, values, index)?;
            let number = value.as_number().ok_or_else(|| {
                ProcessingError::Filter(format!("Cannot negate {:?}", value))
            })?;
            Ok(Value::Num(-number))
        }
        Expr::BinaryOp { op, left, right } => match op {
            Op::And => {
                let left = eval(left, values, index)?;
                if !left.truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(eval(right, values, index)?.truthy()))
            }
            Op::Or => {
                let left = eval(left, values, index)?;
                if left.truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(eval(right, values, index)?.truthy()))
            }
            _ => {
                let left = eval(left, values, index)?;
                let right = eval(right, values, index)?;
                apply(*op, &left, &right)
            }
        },
    }
}

fn apply(op: Op, left: &Value, right: &Value) -> Result<Value> {
    match op {
        Op::Add | Op::Sub | Op::Mul | Op::Div => {
            let (a, b) = numeric_pair(op, left, right)?;
            Ok(Value::Num(match op {
                Op::Add => a + b,
                Op::Sub => a - b,
                Op::Mul => a * b,
                Op::Div => a / b,
                _ => unreachable!(),
            }))
        }
        Op::Eq => Ok(Value::Bool(equals(left, right))),
        Op::NotEq => Ok(Value::Bool(!equals(left, right))),
        Op::Lt | Op::LtEq | Op::Gt | Op::GtEq => {
            let ordering = order(op, left, right)?;
            Ok(Value::Bool(match op {
                Op::Lt => ordering.is_lt(),
                Op::LtEq => ordering.is_le(),
                Op::Gt => ordering.is_gt(),
                Op::GtEq => ordering.is_ge(),
                _ => unreachable!(),
            }))
        }
        Op::And | Op::Or => unreachable!("logical operators short-circuit in eval"),
    }
}

fn equals(left: &Value, right: &Value) -> bool {
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return a == b;
    }
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        _ => left.as_text() == right.as_text(),
    }
}

fn order(op: Op, left: &Value, right: &Value) -> Result<std::cmp::Ordering> {
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return a.partial_cmp(&b).ok_or_else(|| {
            ProcessingError::Filter(format!("Cannot order {:?} and {:?}", left, right))
        });
    }
    if matches!(left, Value::Null) || matches!(right, Value::Null) {
        return Err(ProcessingError::Filter(format!(
            "Cannot apply {:?} to a null value",
            op
        )));
    }
    Ok(left.as_text().cmp(&right.as_text()))
}

fn numeric_pair(op: Op, left: &Value, right: &Value) -> Result<(f64, f64)> {
    match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(ProcessingError::Filter(format!(
            "Cannot apply {:?} to {:?} and {:?}",
            op, left, right
        ))),
    }
}
