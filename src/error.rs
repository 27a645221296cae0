//! Error types for the recipe engine.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`ParseError`] - recipe parse errors (line-numbered, with usage hints)
//! - [`StepError`] - per-row execution errors raised by steps
//! - [`RecipeError`] - top-level errors surfaced to callers
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries. Parse errors and step
//! errors stay distinguishable to callers: a step error is always wrapped
//! in [`RecipeError::Step`] together with the directive text and line that
//! raised it.

use thiserror::Error;

use crate::expr::ExprError;

// =============================================================================
// Parse Errors
// =============================================================================

/// Errors raised while parsing recipe text. Every variant carries the
/// 1-based source line.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Directive name not present in the registry.
    #[error("Unknown directive '{directive}' at line {line}")]
    UnknownDirective { directive: String, line: usize },

    /// A required argument was not supplied.
    #[error("Missing field '{field}' at line {line} for directive <{directive}> (usage: {usage})")]
    MissingField {
        directive: String,
        field: String,
        usage: String,
        line: usize,
    },

    /// A numeric argument did not parse.
    #[error("Invalid number '{value}' for field '{field}' at line {line}")]
    BadNumber {
        field: String,
        value: String,
        line: usize,
    },

    /// An option the directive does not support (wildcard flatten,
    /// delimited cut, unknown format).
    #[error("{message} at line {line}")]
    UnsupportedOption { message: String, line: usize },

    /// Empty literal where a non-empty value is required.
    #[error("Field '{field}' cannot be empty at line {line}")]
    EmptyLiteral { field: String, line: usize },

    /// A delimiter escape sequence did not resolve to a character.
    #[error("Invalid delimiter '{value}' at line {line}")]
    BadDelimiter { value: String, line: usize },

    /// A regular expression argument did not compile.
    #[error("Invalid regex '{pattern}' at line {line}: {source}")]
    BadRegex {
        pattern: String,
        line: usize,
        #[source]
        source: regex::Error,
    },

    /// An expression argument did not parse.
    #[error("Invalid expression at line {line}: {source}")]
    BadExpression {
        line: usize,
        #[source]
        source: ExprError,
    },

    /// A structured argument (cut ranges, quantize buckets, sed
    /// substitutions) was malformed.
    #[error("Invalid {what} '{value}' at line {line}: {message}")]
    BadArgument {
        what: &'static str,
        value: String,
        message: String,
        line: usize,
    },
}

// =============================================================================
// Step Errors
// =============================================================================

/// Errors raised while executing a single step against a row.
#[derive(Debug, Error)]
pub enum StepError {
    /// A column the directive addresses is not in the row.
    #[error("column '{0}' does not exist")]
    MissingColumn(String),

    /// The column carries a value the step cannot operate on.
    #[error("column '{column}' has type {actual}, expected {expected}")]
    TypeMismatch {
        column: String,
        expected: &'static str,
        actual: &'static str,
    },

    /// Destination already present and force not given.
    #[error("column '{0}' already exists")]
    ColumnExists(String),

    /// `columns` received a name list whose length differs from the row.
    #[error("{expected} column name(s) for a row of {actual} column(s)")]
    ColumnCountMismatch { expected: usize, actual: usize },

    /// Value present but structurally unusable (unparseable date or
    /// JSON, record shorter than its fixed-length widths, ...).
    #[error("column '{column}': {message}")]
    Malformed { column: String, message: String },

    /// A cached pattern failed to compile at run time. Patterns are
    /// validated at parse time, so this indicates context misuse.
    #[error("invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Expression evaluation failed.
    #[error("expression failed: {0}")]
    Expression(#[from] ExprError),
}

// =============================================================================
// Recipe Errors (top-level)
// =============================================================================

/// Top-level errors returned by parsing and execution.
#[derive(Debug, Error)]
pub enum RecipeError {
    /// The recipe text did not parse.
    #[error("{0}")]
    Parse(#[from] ParseError),

    /// A step failed on a row; carries the directive text and line.
    #[error("step '{directive}' at line {line} failed: {source}")]
    Step {
        directive: String,
        line: usize,
        #[source]
        source: StepError,
    },
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for parse operations.
pub type ParseResult<T> = Result<T, ParseError>;

/// Result type for single-step execution.
pub type StepResult<T> = Result<T, StepError>;

/// Result type for whole-recipe operations.
pub type RecipeResult<T> = Result<T, RecipeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_message() {
        let err = ParseError::MissingField {
            directive: "rename".into(),
            field: "new".into(),
            usage: "rename <old> <new>".into(),
            line: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains("Missing field 'new'"));
        assert!(msg.contains("line 3"));
        assert!(msg.contains("usage: rename <old> <new>"));
    }

    #[test]
    fn test_step_error_wraps_into_recipe_error() {
        let err = RecipeError::Step {
            directive: "swap a b".into(),
            line: 1,
            source: StepError::MissingColumn("b".into()),
        };
        let msg = err.to_string();
        assert!(msg.contains("swap a b"));
        assert!(msg.contains("line 1"));
        assert!(msg.contains("'b' does not exist"));
    }

    #[test]
    fn test_parse_error_converts() {
        let parse_err = ParseError::UnknownDirective {
            directive: "frobnicate".into(),
            line: 2,
        };
        let recipe_err: RecipeError = parse_err.into();
        assert!(recipe_err.to_string().contains("frobnicate"));
    }
}
