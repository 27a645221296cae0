//! # Rowmill - recipe-driven row transformation
//!
//! Rowmill cleans, reshapes, parses, masks and enriches tabular rows as
//! they stream through a data-ingestion pipeline, driven by a compact
//! line-oriented recipe DSL.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ Recipe text │────▶│   Parser    │────▶│  Step list  │────▶│  Executor   │
//! │  (the DSL)  │     │ (validated) │     │ (immutable) │     │ (rows in/out)│
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rowmill::{Recipe, Row};
//!
//! let recipe = Recipe::parse("copy name shout\nuppercase shout").unwrap();
//! let rows = recipe.run(vec![Row::new("name", "ada")]).unwrap();
//! assert_eq!(rows[0].get("shout").unwrap().to_string(), "ADA");
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`row`] - Ordered row model and value union
//! - [`recipe`] - Tokenizer, directive registry, and parser
//! - [`steps`] - The directive implementations
//! - [`executor`] - Per-run context and execution loop
//! - [`expr`] - Expression language for `set column` and filters
//! - [`xml`] - XML-to-JSON conversion for `parse-as-xml`
//! - [`ingest`] - CSV/JSON input decoding for the CLI
//! - [`logs`] - Leveled progress log

// Core modules
pub mod error;
pub mod row;

// Recipe DSL
pub mod recipe;

// Execution
pub mod executor;
pub mod steps;

// Expression language
pub mod expr;

// XML support
pub mod xml;

// Input decoding
pub mod ingest;

// Progress logging
pub mod logs;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ParseError, RecipeError, RecipeResult, StepError};

// =============================================================================
// Re-exports - Row model
// =============================================================================

pub use row::{Row, Value};

// =============================================================================
// Re-exports - Recipe
// =============================================================================

pub use recipe::{parse, Recipe, Registry, STARTING_COLUMN};

// =============================================================================
// Re-exports - Execution
// =============================================================================

pub use executor::{execute, execute_with_context, RunContext};
pub use steps::{Step, StepKind, StepOutcome};

// =============================================================================
// Re-exports - Expressions
// =============================================================================

pub use expr::{Expression, ExprError};

#[cfg(test)]
mod tests {
    //! End-to-end scenarios: recipe text in, rows out.

    use super::*;

    #[test]
    fn test_swap_scenario() {
        let recipe = Recipe::parse("swap a b").unwrap();
        let rows = recipe
            .run(vec![Row::new("a", 1i64).with("b", "s")])
            .unwrap();
        assert_eq!(rows[0].get("a"), Some(&Value::String("s".into())));
        assert_eq!(rows[0].get("b"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_swap_missing_column_scenario() {
        let recipe = Recipe::parse("swap a b").unwrap();
        let err = recipe
            .run(vec![Row::new("a", 1i64).with("c", "s")])
            .unwrap_err();
        match err {
            RecipeError::Step {
                directive,
                line,
                source,
            } => {
                assert_eq!(directive, "swap a b");
                assert_eq!(line, 1);
                assert!(matches!(source, StepError::MissingColumn(c) if c == "b"));
            }
            other => panic!("expected a step error, got {:?}", other),
        }
    }

    #[test]
    fn test_set_format_csv_scenario() {
        let recipe = Recipe::parse("set format csv , true").unwrap();
        let rows = recipe.run(vec![Row::new("body", "x,y,z")]).unwrap();
        assert_eq!(rows[0].names(), vec!["body_1", "body_2", "body_3"]);
        assert_eq!(rows[0].get("body_1"), Some(&Value::String("x".into())));
        assert_eq!(rows[0].get("body_3"), Some(&Value::String("z".into())));
    }

    #[test]
    fn test_parse_as_json_scenario() {
        let recipe = Recipe::parse("parse-as-json body").unwrap();
        let rows = recipe
            .run(vec![Row::new(
                "body",
                r#"{"id":1,"name":{"first":"R","last":"J"}}"#,
            )])
            .unwrap();
        let row = &rows[0];
        assert!(row.get("body").is_some());
        assert_eq!(row.get("body.id"), Some(&Value::Int(1)));
        match row.get("body.name") {
            Some(Value::JsonObject(map)) => {
                assert_eq!(map.get("first"), Some(&serde_json::json!("R")));
                assert_eq!(map.get("last"), Some(&serde_json::json!("J")));
            }
            other => panic!("expected an object handle, got {:?}", other),
        }
    }

    #[test]
    fn test_indexsplit_scenario() {
        let recipe = Recipe::parse("indexsplit s 1 4 d").unwrap();
        let rows = recipe.run(vec![Row::new("s", "abcdef")]).unwrap();
        assert_eq!(rows[0].get("s"), Some(&Value::String("abcdef".into())));
        assert_eq!(rows[0].get("d"), Some(&Value::String("bcd".into())));
    }

    #[test]
    fn test_filter_scenario() {
        let recipe = Recipe::parse("filter-row-if-matched c /^x/").unwrap();
        let rows = recipe
            .run(vec![
                Row::new("c", "xa"),
                Row::new("c", "yb"),
                Row::new("c", "xc"),
            ])
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("c"), Some(&Value::String("yb".into())));
    }

    #[test]
    fn test_fan_out_pipeline() {
        let recipe = Recipe::parse(
            "split-to-rows line ,\nset column n length(line)\nfilter-row-if-true n < 2",
        )
        .unwrap();
        let rows = recipe
            .run(vec![Row::new("line", "aa,b,ccc").with("id", 1i64)])
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("line"), Some(&Value::String("aa".into())));
        assert_eq!(rows[1].get("line"), Some(&Value::String("ccc".into())));
    }

    #[test]
    fn test_order_preserved_across_surviving_rows() {
        let recipe = Recipe::parse("filter-row-if-true id % 2 == 0").unwrap();
        let rows: Vec<Row> = (1..=6).map(|i| Row::new("id", i as i64)).collect();
        let out = recipe.run(rows).unwrap();
        let ids: Vec<_> = out.iter().map(|r| r.get("id").cloned().unwrap()).collect();
        assert_eq!(ids, vec![Value::Int(1), Value::Int(3), Value::Int(5)]);
    }
}
