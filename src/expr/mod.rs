//! Expression language used by `set column` and `filter-row-if-true`.
//!
//! A small, side-effect-free language over the current row: literals,
//! column references, arithmetic, comparisons, boolean connectives and a
//! fixed set of builtin functions. The parser lives in [`parser`]; this
//! module holds the AST and the interpreter.
//!
//! Column references resolve against the row by first-match name lookup;
//! a reference to a column the row does not carry is an evaluation error,
//! which the executor surfaces as a step failure.

pub mod parser;

pub use parser::parse;

use thiserror::Error;

use crate::row::{Row, Value};

/// Expression evaluation errors.
#[derive(Debug, Error)]
pub enum ExprError {
    /// Expression text did not parse.
    #[error("invalid expression: {0}")]
    Syntax(String),

    /// Reference to a column the row does not carry.
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    /// Call to a function the engine does not define.
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// Wrong number of arguments to a builtin.
    #[error("function '{name}' expects {expected} argument(s), got {actual}")]
    Arity {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// Operator or function applied to unsupported operand types.
    #[error("type error: {0}")]
    Type(String),

    /// Integer division or modulo by zero.
    #[error("division by zero")]
    DivisionByZero,
}

// =============================================================================
// AST
// =============================================================================

/// Literal values appearing in expression text.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    And,
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Negate,
    Not,
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Literal),
    /// Reference to a row column by name (dotted names allowed, so the
    /// columns produced by `parse-as-json` stay addressable).
    Column(String),
    Unary {
        op: UnaryOperator,
        expr: Box<Expression>,
    },
    Binary {
        left: Box<Expression>,
        op: Operator,
        right: Box<Expression>,
    },
    Call {
        name: String,
        args: Vec<Expression>,
    },
}

impl Expression {
    /// Evaluate against a row.
    pub fn evaluate(&self, row: &Row) -> Result<Value, ExprError> {
        match self {
            Expression::Literal(lit) => Ok(literal_value(lit)),
            Expression::Column(name) => row
                .get(name)
                .cloned()
                .ok_or_else(|| ExprError::UnknownColumn(name.clone())),
            Expression::Unary { op, expr } => {
                let value = expr.evaluate(row)?;
                match op {
                    UnaryOperator::Negate => negate(&value),
                    UnaryOperator::Not => Ok(Value::Bool(!truthy(&value)?)),
                }
            }
            Expression::Binary { left, op, right } => {
                let lhs = left.evaluate(row)?;
                let rhs = right.evaluate(row)?;
                apply_binary(*op, &lhs, &rhs)
            }
            Expression::Call { name, args } => {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(arg.evaluate(row)?);
                }
                call_builtin(name, &values)
            }
        }
    }
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(f) => Value::Float(*f),
        Literal::String(s) => Value::String(s.clone()),
    }
}

/// Boolean view of a value, used by `filter-row-if-true` and the logical
/// operators: `false`, `Null`, numeric zero and the empty string are
/// falsy; containers have no boolean meaning.
pub fn truthy(value: &Value) -> Result<bool, ExprError> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Null => Ok(false),
        Value::Int(n) => Ok(*n != 0),
        Value::Float(f) => Ok(*f != 0.0),
        Value::String(s) => Ok(!s.is_empty()),
        other => Err(ExprError::Type(format!(
            "{} has no boolean meaning",
            other.type_name()
        ))),
    }
}

// =============================================================================
// Operators
// =============================================================================

fn apply_binary(op: Operator, lhs: &Value, rhs: &Value) -> Result<Value, ExprError> {
    match op {
        Operator::Add => add(lhs, rhs),
        Operator::Subtract => arithmetic(lhs, rhs, "subtract", |a, b| a - b, |a, b| Ok(a - b)),
        Operator::Multiply => arithmetic(lhs, rhs, "multiply", |a, b| a * b, |a, b| Ok(a * b)),
        Operator::Divide => arithmetic(
            lhs,
            rhs,
            "divide",
            |a, b| a / b,
            |a, b| {
                if b == 0 {
                    Err(ExprError::DivisionByZero)
                } else {
                    Ok(a / b)
                }
            },
        ),
        Operator::Modulo => arithmetic(
            lhs,
            rhs,
            "take modulo of",
            |a, b| a % b,
            |a, b| {
                if b == 0 {
                    Err(ExprError::DivisionByZero)
                } else {
                    Ok(a % b)
                }
            },
        ),
        Operator::Equal => Ok(Value::Bool(values_equal(lhs, rhs))),
        Operator::NotEqual => Ok(Value::Bool(!values_equal(lhs, rhs))),
        Operator::LessThan => compare(lhs, rhs).map(|o| Value::Bool(o == std::cmp::Ordering::Less)),
        Operator::LessThanOrEqual => {
            compare(lhs, rhs).map(|o| Value::Bool(o != std::cmp::Ordering::Greater))
        }
        Operator::GreaterThan => {
            compare(lhs, rhs).map(|o| Value::Bool(o == std::cmp::Ordering::Greater))
        }
        Operator::GreaterThanOrEqual => {
            compare(lhs, rhs).map(|o| Value::Bool(o != std::cmp::Ordering::Less))
        }
        Operator::And => Ok(Value::Bool(truthy(lhs)? && truthy(rhs)?)),
        Operator::Or => Ok(Value::Bool(truthy(lhs)? || truthy(rhs)?)),
    }
}

/// `+` adds numbers; when either side is a string it concatenates the
/// stringified operands.
fn add(lhs: &Value, rhs: &Value) -> Result<Value, ExprError> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a + b)),
        (Value::String(_), _) | (_, Value::String(_)) => {
            Ok(Value::String(format!("{}{}", lhs, rhs)))
        }
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => Ok(Value::Float(a + b)),
            _ => Err(ExprError::Type(format!(
                "cannot add {} and {}",
                lhs.type_name(),
                rhs.type_name()
            ))),
        },
    }
}

fn arithmetic(
    lhs: &Value,
    rhs: &Value,
    verb: &str,
    float_op: impl Fn(f64, f64) -> f64,
    int_op: impl Fn(i64, i64) -> Result<i64, ExprError>,
) -> Result<Value, ExprError> {
    match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => int_op(*a, *b).map(Value::Int),
        (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
            let a = lhs.as_f64().unwrap_or(f64::NAN);
            let b = rhs.as_f64().unwrap_or(f64::NAN);
            Ok(Value::Float(float_op(a, b)))
        }
        _ => Err(ExprError::Type(format!(
            "cannot {} {} and {}",
            verb,
            lhs.type_name(),
            rhs.type_name()
        ))),
    }
}

fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs, rhs) {
        (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => *a as f64 == *b,
        _ => lhs == rhs,
    }
}

fn compare(lhs: &Value, rhs: &Value) -> Result<std::cmp::Ordering, ExprError> {
    match (lhs, rhs) {
        (Value::String(a), Value::String(b)) => Ok(a.cmp(b)),
        (Value::Int(a), Value::Int(b)) => Ok(a.cmp(b)),
        _ => match (lhs.as_f64(), rhs.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b).ok_or_else(|| {
                ExprError::Type("cannot order NaN".to_string())
            }),
            _ => Err(ExprError::Type(format!(
                "cannot compare {} and {}",
                lhs.type_name(),
                rhs.type_name()
            ))),
        },
    }
}

fn negate(value: &Value) -> Result<Value, ExprError> {
    match value {
        Value::Int(n) => Ok(Value::Int(-n)),
        Value::Float(f) => Ok(Value::Float(-f)),
        other => Err(ExprError::Type(format!(
            "cannot negate {}",
            other.type_name()
        ))),
    }
}

// =============================================================================
// Builtins
// =============================================================================

fn call_builtin(name: &str, args: &[Value]) -> Result<Value, ExprError> {
    match name {
        "length" => {
            let arg = single(name, args)?;
            match arg {
                Value::String(s) => Ok(Value::Int(s.chars().count() as i64)),
                Value::Bytes(b) => Ok(Value::Int(b.len() as i64)),
                Value::List(items) => Ok(Value::Int(items.len() as i64)),
                Value::JsonArray(items) => Ok(Value::Int(items.len() as i64)),
                other => Err(ExprError::Type(format!(
                    "length() does not apply to {}",
                    other.type_name()
                ))),
            }
        }
        "lower" => string_fn(name, args, |s| s.to_lowercase()),
        "upper" => string_fn(name, args, |s| s.to_uppercase()),
        "trim" => string_fn(name, args, |s| s.trim().to_string()),
        "abs" => {
            let arg = single(name, args)?;
            match arg {
                Value::Int(n) => Ok(Value::Int(n.abs())),
                Value::Float(f) => Ok(Value::Float(f.abs())),
                other => Err(ExprError::Type(format!(
                    "abs() does not apply to {}",
                    other.type_name()
                ))),
            }
        }
        "min" | "max" => {
            expect_arity(name, args, 2)?;
            let ord = compare(&args[0], &args[1])?;
            let take_first = if name == "min" {
                ord != std::cmp::Ordering::Greater
            } else {
                ord != std::cmp::Ordering::Less
            };
            Ok(if take_first {
                args[0].clone()
            } else {
                args[1].clone()
            })
        }
        "contains" => {
            expect_arity(name, args, 2)?;
            match (&args[0], &args[1]) {
                (Value::String(s), Value::String(needle)) => {
                    Ok(Value::Bool(s.contains(needle.as_str())))
                }
                _ => Err(ExprError::Type(
                    "contains() expects two strings".to_string(),
                )),
            }
        }
        _ => Err(ExprError::UnknownFunction(name.to_string())),
    }
}

fn expect_arity(name: &str, args: &[Value], expected: usize) -> Result<(), ExprError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ExprError::Arity {
            name: name.to_string(),
            expected,
            actual: args.len(),
        })
    }
}

fn single<'a>(name: &str, args: &'a [Value]) -> Result<&'a Value, ExprError> {
    expect_arity(name, args, 1)?;
    Ok(&args[0])
}

fn string_fn(
    name: &str,
    args: &[Value],
    f: impl Fn(&str) -> String,
) -> Result<Value, ExprError> {
    match single(name, args)? {
        Value::String(s) => Ok(Value::String(f(s))),
        other => Err(ExprError::Type(format!(
            "{}() does not apply to {}",
            name,
            other.type_name()
        ))),
    }
}
