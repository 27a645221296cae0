//! Recipe execution: the per-run context and the KEEP/SKIP/MANY
//! working-set loop.
//!
//! One executor invocation is single-threaded and cooperative: steps
//! never suspend and never touch I/O. Callers wanting parallelism run
//! several executors over disjoint row streams, each with its own
//! [`RunContext`].

use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use regex::Regex;

use crate::error::{RecipeError, RecipeResult, StepError, StepResult};
use crate::expr::{self, Expression};
use crate::row::Row;
use crate::steps::{Step, StepOutcome};

// =============================================================================
// RunContext
// =============================================================================

/// Per-run bag of state available to steps.
///
/// Compiled regular expressions and expressions are cached here keyed
/// by their literal text, created lazily on first use and dropped with
/// the context. The shuffle alphabet is the per-run masking lookup
/// table. Contexts are never shared between concurrent runs.
pub struct RunContext {
    rows_seen: u64,
    regexes: HashMap<String, Regex>,
    expressions: HashMap<String, Rc<Expression>>,
    shuffle: Option<HashMap<char, char>>,
    seed: u64,
    cancel: Option<Arc<AtomicBool>>,
}

impl RunContext {
    /// Fresh context with a random masking seed.
    pub fn new() -> Self {
        Self::with_seed(rand::thread_rng().gen())
    }

    /// Fresh context with a fixed masking seed; runs with equal seeds
    /// mask identically.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rows_seen: 0,
            regexes: HashMap::new(),
            expressions: HashMap::new(),
            shuffle: None,
            seed,
            cancel: None,
        }
    }

    /// Attach a cooperative cancellation flag, checked between rows.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Input rows seen so far in this run.
    pub fn rows_seen(&self) -> u64 {
        self.rows_seen
    }

    fn advance_row(&mut self) {
        self.rows_seen += 1;
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map(|flag| flag.load(Ordering::Relaxed))
            .unwrap_or(false)
    }

    /// Compiled regex for a pattern, cached across rows. The clone is
    /// cheap; the compiled program is shared.
    pub fn regex(&mut self, pattern: &str) -> StepResult<Regex> {
        if let Some(re) = self.regexes.get(pattern) {
            return Ok(re.clone());
        }
        let re = Regex::new(pattern).map_err(|e| StepError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        self.regexes.insert(pattern.to_string(), re.clone());
        Ok(re)
    }

    /// Parsed expression for a source text, cached across rows.
    pub fn expression(&mut self, text: &str) -> StepResult<Rc<Expression>> {
        if let Some(expr) = self.expressions.get(text) {
            return Ok(expr.clone());
        }
        let expr = Rc::new(expr::parse(text).map_err(StepError::Expression)?);
        self.expressions.insert(text.to_string(), expr.clone());
        Ok(expr)
    }

    /// Per-run permutation of the lowercase, uppercase and digit
    /// alphabets, built lazily from the seed.
    pub fn shuffle_alphabet(&mut self) -> &HashMap<char, char> {
        let seed = self.seed;
        self.shuffle.get_or_insert_with(|| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut table = HashMap::new();
            let alphabets = [
                "abcdefghijklmnopqrstuvwxyz",
                "ABCDEFGHIJKLMNOPQRSTUVWXYZ",
                "0123456789",
            ];
            for alphabet in alphabets {
                let from: Vec<char> = alphabet.chars().collect();
                let mut to = from.clone();
                to.shuffle(&mut rng);
                for (a, b) in from.into_iter().zip(to) {
                    table.insert(a, b);
                }
            }
            table
        })
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Execution
// =============================================================================

/// Run the steps over the rows with a fresh context.
pub fn execute(steps: &[Step], rows: Vec<Row>) -> RecipeResult<Vec<Row>> {
    let mut ctx = RunContext::new();
    execute_with_context(steps, rows, &mut ctx)
}

/// Run the steps over the rows.
///
/// Each input row starts a working set of one; steps apply in textual
/// order to every row of the working set. KEEP replaces a row, SKIP
/// drops it, MANY substitutes its outputs in emission order and
/// subsequent steps run on each. A step error aborts the run,
/// surfacing the directive text and line. Output preserves input
/// order, with fan-out rows in parent-emission order.
///
/// A cancellation flag on the context stops the run at the next row
/// boundary, returning the rows completed so far.
pub fn execute_with_context(
    steps: &[Step],
    rows: Vec<Row>,
    ctx: &mut RunContext,
) -> RecipeResult<Vec<Row>> {
    let mut output = Vec::with_capacity(rows.len());

    for row in rows {
        if ctx.is_cancelled() {
            break;
        }
        ctx.advance_row();

        let mut working = vec![row];
        for step in steps {
            let mut next = Vec::with_capacity(working.len());
            for current in working {
                let outcome = step
                    .execute(current, ctx)
                    .map_err(|source| RecipeError::Step {
                        directive: step.text().to_string(),
                        line: step.line(),
                        source,
                    })?;
                match outcome {
                    StepOutcome::Keep(row) => next.push(row),
                    StepOutcome::Skip => {}
                    StepOutcome::Many(rows) => next.extend(rows),
                }
            }
            working = next;
            if working.is_empty() {
                break;
            }
        }
        output.extend(working);
    }

    Ok(output)
}
