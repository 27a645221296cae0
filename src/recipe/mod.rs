//! Recipe DSL: tokenizer, directive registry, parser, and the parsed
//! [`Recipe`] itself.
//!
//! ```text
//! DSL text → parser → Vec<Step> → executor(rows, steps) → rows
//! ```

pub mod parser;
pub mod registry;
pub mod tokenizer;

pub use parser::{parse, parse_with_registry};
pub use registry::{DirectiveSpec, Registry};
pub use tokenizer::{Mode, Tokenizer};

use std::str::FromStr;

use crate::error::{ParseError, ParseResult, RecipeResult};
use crate::executor;
use crate::row::Row;
use crate::steps::Step;

/// Name of the column an unparsed input record starts in; `set format`
/// consumes it.
pub const STARTING_COLUMN: &str = "body";

/// An ordered, validated sequence of steps parsed from DSL text.
#[derive(Debug, Clone, PartialEq)]
pub struct Recipe {
    steps: Vec<Step>,
}

impl Recipe {
    /// Parse DSL text into a recipe.
    pub fn parse(text: &str) -> ParseResult<Recipe> {
        Ok(Recipe {
            steps: parser::parse(text)?,
        })
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run the recipe over the rows with a fresh execution context.
    pub fn run(&self, rows: Vec<Row>) -> RecipeResult<Vec<Row>> {
        executor::execute(&self.steps, rows)
    }
}

impl FromStr for Recipe {
    type Err = ParseError;

    fn from_str(text: &str) -> Result<Self, Self::Err> {
        Recipe::parse(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::row::Value;

    #[test]
    fn test_recipe_parse_and_run() {
        let recipe: Recipe = "copy a b\nuppercase b".parse().unwrap();
        assert_eq!(recipe.len(), 2);

        let out = recipe.run(vec![Row::new("a", "hi")]).unwrap();
        assert_eq!(out[0].get("a"), Some(&Value::String("hi".into())));
        assert_eq!(out[0].get("b"), Some(&Value::String("HI".into())));
    }

    #[test]
    fn test_empty_recipe_is_identity() {
        let recipe = Recipe::parse("\n\n").unwrap();
        assert!(recipe.is_empty());
        let rows = vec![Row::new("a", 1i64)];
        assert_eq!(recipe.run(rows.clone()).unwrap(), rows);
    }
}
