//! Column-shape steps: rename, drop, copy, swap, merge, columns,
//! flatten, fill-null-or-empty.
//!
//! Missing columns are handled uniformly: any column a directive
//! addresses must exist, except `fill-null-or-empty`, which creates its
//! column when absent.

use crate::error::{StepError, StepResult};
use crate::row::{Row, Value};

use super::StepOutcome;

fn require(row: &Row, column: &str) -> StepResult<usize> {
    row.find(column)
        .ok_or_else(|| StepError::MissingColumn(column.to_string()))
}

/// Rename the first column named `old` in place; position and value are
/// untouched.
pub(crate) fn rename(mut row: Row, old: &str, new: &str) -> StepResult<StepOutcome> {
    let pos = require(&row, old)?;
    row.rename(pos, new);
    Ok(StepOutcome::Keep(row))
}

pub(crate) fn drop(mut row: Row, column: &str) -> StepResult<StepOutcome> {
    let pos = require(&row, column)?;
    row.remove(pos);
    Ok(StepOutcome::Keep(row))
}

/// Copy `source` to `destination`. An existing destination is an error
/// unless `force` is set, in which case it is overwritten in place.
pub(crate) fn copy(
    mut row: Row,
    source: &str,
    destination: &str,
    force: bool,
) -> StepResult<StepOutcome> {
    let src = require(&row, source)?;
    let value = row.value(src).clone();
    match row.find(destination) {
        Some(dest) if force => row.set_value(dest, value),
        Some(_) => return Err(StepError::ColumnExists(destination.to_string())),
        None => row.add(destination, value),
    }
    Ok(StepOutcome::Keep(row))
}

/// Exchange the values of two columns; both must exist.
pub(crate) fn swap(mut row: Row, first: &str, second: &str) -> StepResult<StepOutcome> {
    let a = require(&row, first)?;
    let b = require(&row, second)?;
    row.swap_values(a, b);
    Ok(StepOutcome::Keep(row))
}

/// Append `destination` = stringified `first` + separator + stringified
/// `second`.
pub(crate) fn merge(
    mut row: Row,
    first: &str,
    second: &str,
    destination: &str,
    separator: &str,
) -> StepResult<StepOutcome> {
    let a = require(&row, first)?;
    let b = require(&row, second)?;
    let merged = format!("{}{}{}", row.value(a), separator, row.value(b));
    row.add(destination, merged);
    Ok(StepOutcome::Keep(row))
}

/// Replace all column names in order; the name count must match the row.
pub(crate) fn columns(mut row: Row, names: &[String]) -> StepResult<StepOutcome> {
    if names.len() != row.len() {
        return Err(StepError::ColumnCountMismatch {
            expected: names.len(),
            actual: row.len(),
        });
    }
    for (pos, name) in names.iter().enumerate() {
        row.rename(pos, name.clone());
    }
    Ok(StepOutcome::Keep(row))
}

fn element_count(value: &Value) -> usize {
    match value {
        Value::List(items) => items.len(),
        Value::JsonArray(items) => items.len(),
        _ => 1,
    }
}

fn element_at(value: &Value, index: usize) -> Value {
    match value {
        Value::List(items) => items.get(index).cloned().unwrap_or(Value::Null),
        Value::JsonArray(items) => items
            .get(index)
            .cloned()
            .map(Value::from_json)
            .unwrap_or(Value::Null),
        other => other.clone(),
    }
}

/// Fan out one row per element of the longest listed column. List-valued
/// columns contribute their i-th element (Null past their end);
/// non-list columns are copied unchanged.
pub(crate) fn flatten(row: Row, columns: &[String]) -> StepResult<StepOutcome> {
    let mut positions = Vec::with_capacity(columns.len());
    for column in columns {
        positions.push(require(&row, column)?);
    }

    let fan_out = positions
        .iter()
        .map(|&pos| element_count(row.value(pos)))
        .max()
        .unwrap_or(1);

    let mut rows = Vec::with_capacity(fan_out);
    for index in 0..fan_out {
        let mut out = row.clone();
        for &pos in &positions {
            out.set_value(pos, element_at(row.value(pos), index));
        }
        rows.push(out);
    }
    Ok(StepOutcome::Many(rows))
}

/// Replace a null or empty value with a fixed string; an absent column
/// is created.
pub(crate) fn fill_null_or_empty(
    mut row: Row,
    column: &str,
    value: &str,
) -> StepResult<StepOutcome> {
    match row.find(column) {
        None => row.add(column, value),
        Some(pos) => {
            if row.value(pos).is_null_or_empty() {
                row.set_value(pos, Value::String(value.to_string()));
            }
        }
    }
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
    fn test_rename_preserves_position_and_length() {
        let row = Row::new("a", 1i64).with("b", 2i64).with("c", 3i64);
        let row = keep(rename(row, "b", "renamed").unwrap());
        assert_eq!(row.names(), vec!["a", "renamed", "c"]);
        assert_eq!(row.value(1), &Value::Int(2));
    }

    #[test]
    fn test_rename_missing_column() {
        let err = rename(Row::new("a", 1i64), "x", "y").unwrap_err();
        assert!(matches!(err, StepError::MissingColumn(c) if c == "x"));
    }

    #[test]
    fn test_copy_then_drop_is_identity() {
        let original = Row::new("a", "v").with("b", 2i64);
        let copied = keep(copy(original.clone(), "a", "c", false).unwrap());
        assert_eq!(copied.get("c"), Some(&Value::String("v".into())));
        let restored = keep(drop(copied, "c").unwrap());
        assert_eq!(restored, original);
    }

    #[test]
    fn test_copy_existing_destination_needs_force() {
        let row = Row::new("a", 1i64).with("b", 2i64);
        let err = copy(row.clone(), "a", "b", false).unwrap_err();
        assert!(matches!(err, StepError::ColumnExists(c) if c == "b"));

        let forced = keep(copy(row, "a", "b", true).unwrap());
        assert_eq!(forced.get("b"), Some(&Value::Int(1)));
        assert_eq!(forced.len(), 2);
    }

    #[test]
    fn test_swap_exchanges_values() {
        let row = Row::new("a", 1i64).with("b", "s");
        let row = keep(swap(row, "a", "b").unwrap());
        assert_eq!(row.get("a"), Some(&Value::String("s".into())));
        assert_eq!(row.get("b"), Some(&Value::Int(1)));
    }

    #[test]
    fn test_swap_missing_column_fails() {
        let row = Row::new("a", 1i64).with("c", "s");
        let err = swap(row, "a", "b").unwrap_err();
        assert!(matches!(err, StepError::MissingColumn(c) if c == "b"));
    }

    #[test]
    fn test_merge_concatenates_stringified() {
        let row = Row::new("a", 1i64).with("b", "x");
        let row = keep(merge(row, "a", "b", "ab", "|").unwrap());
        assert_eq!(row.get("ab"), Some(&Value::String("1|x".into())));
        assert_eq!(row.len(), 3);
    }

    #[test]
    fn test_columns_renames_all() {
        let row = Row::new("a", 1i64).with("b", 2i64);
        let names = vec!["x".to_string(), "y".to_string()];
        let row = keep(columns(row, &names).unwrap());
        assert_eq!(row.names(), vec!["x", "y"]);
    }

    #[test]
    fn test_columns_count_mismatch() {
        let row = Row::new("a", 1i64);
        let names = vec!["x".to_string(), "y".to_string()];
        let err = columns(row, &names).unwrap_err();
        assert!(matches!(
            err,
            StepError::ColumnCountMismatch {
                expected: 2,
                actual: 1
            }
        ));
    }

    #[test]
    fn test_flatten_fans_out_in_element_order() {
        let row = Row::new(
            "tags",
            Value::List(vec![Value::from("a"), Value::from("b")]),
        )
        .with("id", 7i64);
        let outcome = flatten(row, &["tags".to_string()]).unwrap();
        match outcome {
            StepOutcome::Many(rows) => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0].get("tags"), Some(&Value::String("a".into())));
                assert_eq!(rows[1].get("tags"), Some(&Value::String("b".into())));
                assert_eq!(rows[0].get("id"), Some(&Value::Int(7)));
            }
            other => panic!("expected Many, got {:?}", other),
        }
    }

    #[test]
    fn test_flatten_uneven_lists_pad_with_null() {
        let row = Row::new("a", Value::List(vec![Value::Int(1), Value::Int(2)]))
            .with("b", Value::List(vec![Value::Int(9)]));
        let outcome = flatten(row, &["a".to_string(), "b".to_string()]).unwrap();
        match outcome {
            StepOutcome::Many(rows) => {
                assert_eq!(rows[1].get("a"), Some(&Value::Int(2)));
                assert_eq!(rows[1].get("b"), Some(&Value::Null));
            }
            other => panic!("expected Many, got {:?}", other),
        }
    }

    #[test]
    fn test_fill_null_or_empty() {
        let row = Row::new("a", Value::Null).with("b", "kept");
        let row = keep(fill_null_or_empty(row, "a", "filled").unwrap());
        assert_eq!(row.get("a"), Some(&Value::String("filled".into())));

        let row = keep(fill_null_or_empty(row, "b", "filled").unwrap());
        assert_eq!(row.get("b"), Some(&Value::String("kept".into())));

        let row = keep(fill_null_or_empty(row, "new", "created").unwrap());
        assert_eq!(row.get("new"), Some(&Value::String("created".into())));
    }
}
