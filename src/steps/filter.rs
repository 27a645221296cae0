//! Expression and filter steps: set column, the two row filters, and
//! quantize.
//!
//! SKIP is an outcome, not an error: filtered rows produce no
//! diagnostic and simply leave the pipeline.

use crate::error::{StepError, StepResult};
use crate::executor::RunContext;
use crate::expr::truthy;
use crate::row::{Row, Value};

use super::StepOutcome;

fn require(row: &Row, column: &str) -> StepResult<usize> {
    row.find(column)
        .ok_or_else(|| StepError::MissingColumn(column.to_string()))
}

/// Evaluate the expression over the row and write the result to the
/// column (first match replaced, otherwise appended).
pub(crate) fn set_column(
    mut row: Row,
    column: &str,
    expression: &str,
    ctx: &mut RunContext,
) -> StepResult<StepOutcome> {
    let expr = ctx.expression(expression)?;
    let value = expr.evaluate(&row)?;
    row.set_or_add(column, value);
    Ok(StepOutcome::Keep(row))
}

/// SKIP the row when the regex finds a match in the column value.
pub(crate) fn filter_row_if_matched(
    row: Row,
    column: &str,
    pattern: &str,
    ctx: &mut RunContext,
) -> StepResult<StepOutcome> {
    let pos = require(&row, column)?;
    let re = ctx.regex(pattern)?;
    if re.is_match(&row.value(pos).to_string()) {
        Ok(StepOutcome::Skip)
    } else {
        Ok(StepOutcome::Keep(row))
    }
}

/// SKIP the row when the condition evaluates truthy.
pub(crate) fn filter_row_if_true(
    row: Row,
    condition: &str,
    ctx: &mut RunContext,
) -> StepResult<StepOutcome> {
    let expr = ctx.expression(condition)?;
    let value = expr.evaluate(&row)?;
    if truthy(&value).map_err(StepError::Expression)? {
        Ok(StepOutcome::Skip)
    } else {
        Ok(StepOutcome::Keep(row))
    }
}

// =============================================================================
// Quantize
// =============================================================================

/// One half-open quantization bucket `[lower, upper) → label`.
#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub lower: f64,
    pub upper: f64,
    pub label: String,
}

/// Parse a bucket list of the form `lo:hi=label[,lo:hi=label…]`.
pub(crate) fn parse_buckets(spec: &str) -> Result<Vec<Bucket>, String> {
    let mut buckets = Vec::new();
    for part in spec.split(',') {
        let part = part.trim();
        let (range, label) = part
            .split_once('=')
            .ok_or_else(|| format!("'{}' is missing '=label'", part))?;
        let (lower, upper) = range
            .split_once(':')
            .ok_or_else(|| format!("'{}' is missing ':' between bounds", range))?;
        let lower: f64 = lower
            .trim()
            .parse()
            .map_err(|_| format!("'{}' is not a number", lower.trim()))?;
        let upper: f64 = upper
            .trim()
            .parse()
            .map_err(|_| format!("'{}' is not a number", upper.trim()))?;
        if lower >= upper {
            return Err(format!("bucket {}:{} is empty", lower, upper));
        }
        buckets.push(Bucket {
            lower,
            upper,
            label: label.trim().to_string(),
        });
    }
    if buckets.is_empty() {
        return Err("no buckets".to_string());
    }
    Ok(buckets)
}

/// Map a numeric source into the label of its first matching bucket;
/// values outside every bucket map to Null.
pub(crate) fn quantize(
    mut row: Row,
    source: &str,
    destination: &str,
    buckets: &[Bucket],
) -> StepResult<StepOutcome> {
    let pos = require(&row, source)?;
    let number = row.value(pos).as_f64().ok_or_else(|| StepError::TypeMismatch {
        column: source.to_string(),
        expected: "number",
        actual: row.value(pos).type_name(),
    })?;

    let label = buckets
        .iter()
        .find(|b| number >= b.lower && number < b.upper)
        .map(|b| Value::String(b.label.clone()))
        .unwrap_or(Value::Null);
    row.set_or_add(destination, label);
    Ok(StepOutcome::Keep(row))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keep(outcome: StepOutcome) -> Row {
        match outcome {
            StepOutcome::Keep(row) => row,
            other => panic!("expected Keep, got {:?}", other),
        }
    }

    #[test]
    fn test_set_column_replaces_or_appends() {
        let mut ctx = RunContext::with_seed(0);
        let row = Row::new("qty", 4i64).with("price", 3i64);
        let row = keep(set_column(row, "total", "qty * price", &mut ctx).unwrap());
        assert_eq!(row.get("total"), Some(&Value::Int(12)));

        let row = keep(set_column(row, "total", "total + 1", &mut ctx).unwrap());
        assert_eq!(row.get("total"), Some(&Value::Int(13)));
        assert_eq!(row.len(), 3);
    }

    #[test]
    fn test_filter_row_if_matched() {
        let mut ctx = RunContext::with_seed(0);
        let row = Row::new("c", "xa");
        assert_eq!(
            filter_row_if_matched(row, "c", "^x", &mut ctx).unwrap(),
            StepOutcome::Skip
        );

        let row = Row::new("c", "yb");
        assert!(matches!(
            filter_row_if_matched(row, "c", "^x", &mut ctx).unwrap(),
            StepOutcome::Keep(_)
        ));
    }

    #[test]
    fn test_filter_row_if_true() {
        let mut ctx = RunContext::with_seed(0);
        let row = Row::new("age", 10i64);
        assert_eq!(
            filter_row_if_true(row, "age < 18", &mut ctx).unwrap(),
            StepOutcome::Skip
        );

        let row = Row::new("age", 30i64);
        assert!(matches!(
            filter_row_if_true(row, "age < 18", &mut ctx).unwrap(),
            StepOutcome::Keep(_)
        ));
    }

    #[test]
    fn test_parse_buckets() {
        let buckets = parse_buckets("0:10=low, 10:20=mid, 20:100=high").unwrap();
        assert_eq!(buckets.len(), 3);
        assert_eq!(buckets[1].label, "mid");
        assert!(parse_buckets("1:2").is_err());
        assert!(parse_buckets("5:1=bad").is_err());
        assert!(parse_buckets("a:b=c").is_err());
    }

    #[test]
    fn test_quantize_half_open_buckets() {
        let buckets = parse_buckets("0:10=low,10:20=high").unwrap();

        let row = Row::new("v", 10i64);
        let row = keep(quantize(row, "v", "band", &buckets).unwrap());
        assert_eq!(row.get("band"), Some(&Value::String("high".into())));

        let row = Row::new("v", 9.99f64);
        let row = keep(quantize(row, "v", "band", &buckets).unwrap());
        assert_eq!(row.get("band"), Some(&Value::String("low".into())));

        let row = Row::new("v", 50i64);
        let row = keep(quantize(row, "v", "band", &buckets).unwrap());
        assert_eq!(row.get("band"), Some(&Value::Null));
    }

    #[test]
    fn test_quantize_rejects_non_numeric() {
        let buckets = parse_buckets("0:1=x").unwrap();
        let row = Row::new("v", "abc");
        assert!(matches!(
            quantize(row, "v", "band", &buckets).unwrap_err(),
            StepError::TypeMismatch { .. }
        ));
    }
}
