//! Value-parsing steps: CSV, fixed-length records, and regex splits
//! into rows or columns.
//!
//! Generated columns are named `<column>_1 … <column>_n`, matching the
//! naming every downstream directive expects.

use crate::error::{StepError, StepResult};
use crate::executor::RunContext;
use crate::row::{Row, Value};

use super::StepOutcome;

fn require(row: &Row, column: &str) -> StepResult<usize> {
    row.find(column)
        .ok_or_else(|| StepError::MissingColumn(column.to_string()))
}

fn text_of(row: &Row, column: &str, pos: usize) -> StepResult<String> {
    match row.value(pos) {
        Value::List(_) | Value::Map(_) | Value::JsonObject(_) | Value::JsonArray(_) => {
            Err(StepError::TypeMismatch {
                column: column.to_string(),
                expected: "string",
                actual: row.value(pos).type_name(),
            })
        }
        other => Ok(other.to_string()),
    }
}

/// Split a column's value on the delimiter, appending one column per
/// field. With `skip_empty`, a blank value drops the whole row. With
/// `drop_source` (the `set format csv` form) the source column is
/// removed afterwards.
pub(crate) fn parse_as_csv(
    mut row: Row,
    column: &str,
    delimiter: char,
    skip_empty: bool,
    drop_source: bool,
) -> StepResult<StepOutcome> {
    let pos = require(&row, column)?;
    let text = text_of(&row, column, pos)?;

    if skip_empty && text.trim().is_empty() {
        return Ok(StepOutcome::Skip);
    }

    for (index, field) in text.split(delimiter).enumerate() {
        let field = field.trim().trim_matches('"');
        row.add(format!("{}_{}", column, index + 1), Value::String(field.to_string()));
    }
    if drop_source {
        row.remove(pos);
    }
    Ok(StepOutcome::Keep(row))
}

/// Cut a fixed-length record into its fields, trimming the padding from
/// each. A record shorter than the combined widths is unusable.
pub(crate) fn parse_as_fixed_length(
    mut row: Row,
    column: &str,
    widths: &[usize],
    padding: &str,
) -> StepResult<StepOutcome> {
    let pos = require(&row, column)?;
    let chars: Vec<char> = text_of(&row, column, pos)?.chars().collect();

    let total: usize = widths.iter().sum();
    if chars.len() < total {
        return Err(StepError::Malformed {
            column: column.to_string(),
            message: format!(
                "record of length {} is shorter than the combined field width {}",
                chars.len(),
                total
            ),
        });
    }

    let mut offset = 0;
    for (index, width) in widths.iter().enumerate() {
        let field: String = chars[offset..offset + width].iter().collect();
        let field = field.trim_matches(|c| padding.contains(c));
        row.add(format!("{}_{}", column, index + 1), Value::String(field.to_string()));
        offset += width;
    }
    Ok(StepOutcome::Keep(row))
}

/// Fan out: one output row per regex-split piece, each a copy of the
/// input with the column replaced by its piece, in piece order.
pub(crate) fn split_to_rows(
    row: Row,
    column: &str,
    pattern: &str,
    ctx: &mut RunContext,
) -> StepResult<StepOutcome> {
    let pos = require(&row, column)?;
    let text = text_of(&row, column, pos)?;
    let re = ctx.regex(pattern)?;

    let rows: Vec<Row> = re
        .split(&text)
        .map(|piece| {
            let mut out = row.clone();
            out.set_value(pos, Value::String(piece.to_string()));
            out
        })
        .collect();
    Ok(StepOutcome::Many(rows))
}

/// Append one new column per regex-split piece.
pub(crate) fn split_to_columns(
    mut row: Row,
    column: &str,
    pattern: &str,
    ctx: &mut RunContext,
) -> StepResult<StepOutcome> {
    let pos = require(&row, column)?;
    let text = text_of(&row, column, pos)?;
    let re = ctx.regex(pattern)?;

    let pieces: Vec<String> = re.split(&text).map(str::to_string).collect();
    for (index, piece) in pieces.into_iter().enumerate() {
        row.add(format!("{}_{}", column, index + 1), Value::String(piece));
    }
    Ok(StepOutcome::Keep(row))
}
