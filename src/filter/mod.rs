//! Author-supplied filter predicates over a source's field names.
//!
//! Expressions are compiled once, before any row is read, into a tree that
//! resolves only the declared field names; nothing else is in scope. A syntax
//! error or a reference to an undeclared field aborts the run up front rather
//! than failing per-row.

pub mod eval;
pub mod parser;

use std::collections::HashMap;

use crate::error::{ProcessingError, Result};
use crate::filter::eval::eval;
use crate::filter::parser::{parse, tokenize, Expr};
use crate::readers::Row;

/// A compiled filter predicate bound to one source's column set.
pub struct Predicate {
    expr: Expr,
    index: HashMap<String, usize>,
}

impl Predicate {
    /// Compile an expression against the declared columns. Column names pass
    /// through [`sanitize_identifier`] so that headings with spaces or
    /// punctuation are still addressable; when two headings sanitize to the
    /// same identifier the first occurrence wins.
    pub fn compile(expression: &str, columns: &[String]) -> Result<Self> {
        let tokens = tokenize(expression)?;
        let expr = parse(&tokens)?;

        let mut index = HashMap::new();
        for (position, column) in columns.iter().enumerate() {
            index.entry(sanitize_identifier(column)).or_insert(position);
        }

        check_fields(&expr, &index)?;

        Ok(Self { expr, index })
    }

    /// Evaluate the predicate against one row. A row is kept iff the result
    /// is strictly truthy.
    pub fn matches(&self, row: &Row) -> Result<bool> {
        Ok(eval(&self.expr, row.values(), &self.index)?.truthy())
    }
}

/// An optional predicate: absent expression means every row is kept.
pub fn compile_optional(
    expression: Option<&str>,
    columns: &[String],
) -> Result<Option<Predicate>> {
    expression
        .map(|e| Predicate::compile(e, columns))
        .transpose()
}

/// Map a column heading to a valid identifier: any character outside
/// `[A-Za-z0-9_]` becomes `_`, and a leading digit is prefixed with `_`.
pub fn sanitize_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for ch in name.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(true) {
        out.insert(0, '_');
    }
    out
}

fn check_fields(expr: &Expr, index: &HashMap<String, usize>) -> Result<()> {
    match expr {
        Expr::Field(name) => {
            if !index.contains_key(name) {
                return Err(ProcessingError::Filter(format!(
                    "Unknown field: '{}'",
                    name
                )));
            }
            Ok(())
        }
        Expr::Not(operand) | Expr::Neg(operand) => check_fields(operand, index),
        Expr::BinaryOp { left, right, .. } => {
            check_fields(left, index)?;
            check_fields(right, index)
        }
        _ => Ok(()),
    }
}
