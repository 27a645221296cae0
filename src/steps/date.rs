//! Date-reshaping steps.
//!
//! Patterns are chrono `strftime` patterns. `format-date` tries a full
//! datetime parse first and falls back to a bare date at midnight, so
//! both `%Y-%m-%d %H:%M:%S` and `%d/%m/%Y` inputs work.

use std::fmt::Write as _;

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::{StepError, StepResult};
use crate::row::{Row, Value};

use super::StepOutcome;

fn require(row: &Row, column: &str) -> StepResult<usize> {
    row.find(column)
        .ok_or_else(|| StepError::MissingColumn(column.to_string()))
}

fn malformed(column: &str, message: impl Into<String>) -> StepError {
    StepError::Malformed {
        column: column.to_string(),
        message: message.into(),
    }
}

/// Re-parse the column under `source_pattern` and re-render it under
/// `destination_pattern`, in place.
pub(crate) fn format_date(
    mut row: Row,
    column: &str,
    source_pattern: &str,
    destination_pattern: &str,
) -> StepResult<StepOutcome> {
    let pos = require(&row, column)?;
    let text = match row.value(pos) {
        Value::String(s) => s.clone(),
        other => {
            return Err(StepError::TypeMismatch {
                column: column.to_string(),
                expected: "string",
                actual: other.type_name(),
            })
        }
    };

    let parsed = match NaiveDateTime::parse_from_str(&text, source_pattern) {
        Ok(datetime) => datetime,
        Err(_) => NaiveDate::parse_from_str(&text, source_pattern)
            .map_err(|e| {
                malformed(
                    column,
                    format!(
                        "'{}' does not match date pattern '{}': {}",
                        text, source_pattern, e
                    ),
                )
            })?
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| malformed(column, "cannot anchor date at midnight"))?,
    };

    let mut rendered = String::new();
    write!(rendered, "{}", parsed.format(destination_pattern))
        .map_err(|_| malformed(column, format!("invalid date pattern '{}'", destination_pattern)))?;

    row.set_value(pos, Value::String(rendered));
    Ok(StepOutcome::Keep(row))
}

/// Render an integer epoch-seconds column under the destination
/// pattern, in UTC, in place.
pub(crate) fn format_unix_timestamp(
    mut row: Row,
    column: &str,
    destination_pattern: &str,
) -> StepResult<StepOutcome> {
    let pos = require(&row, column)?;
    let seconds = match row.value(pos) {
        Value::Int(n) => *n,
        Value::String(s) => s.trim().parse::<i64>().map_err(|_| {
            malformed(column, format!("'{}' is not an epoch timestamp", s))
        })?,
        other => {
            return Err(StepError::TypeMismatch {
                column: column.to_string(),
                expected: "int or string",
                actual: other.type_name(),
            })
        }
    };

    let timestamp = DateTime::from_timestamp(seconds, 0)
        .ok_or_else(|| malformed(column, format!("timestamp {} is out of range", seconds)))?;

    let mut rendered = String::new();
    write!(rendered, "{}", timestamp.format(destination_pattern))
        .map_err(|_| malformed(column, format!("invalid date pattern '{}'", destination_pattern)))?;

    row.set_value(pos, Value::String(rendered));
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
    fn test_format_date_datetime() {
        let row = Row::new("ts", "2024-03-15 10:20:30");
        let row = keep(format_date(row, "ts", "%Y-%m-%d %H:%M:%S", "%d/%m/%Y").unwrap());
        assert_eq!(row.get("ts"), Some(&Value::String("15/03/2024".into())));
    }

    #[test]
    fn test_format_date_bare_date_falls_back_to_midnight() {
        let row = Row::new("d", "15/03/2024");
        let row = keep(format_date(row, "d", "%d/%m/%Y", "%Y-%m-%dT%H:%M:%S").unwrap());
        assert_eq!(
            row.get("d"),
            Some(&Value::String("2024-03-15T00:00:00".into()))
        );
    }

    #[test]
    fn test_format_date_unparseable_input() {
        let row = Row::new("d", "not a date");
        let err = format_date(row, "d", "%Y-%m-%d", "%Y").unwrap_err();
        assert!(matches!(err, StepError::Malformed { .. }));
    }

    #[test]
    fn test_format_unix_timestamp() {
        let row = Row::new("t", 0i64);
        let row = keep(format_unix_timestamp(row, "t", "%Y-%m-%d").unwrap());
        assert_eq!(row.get("t"), Some(&Value::String("1970-01-01".into())));

        let row = Row::new("t", "1700000000");
        let row = keep(format_unix_timestamp(row, "t", "%Y").unwrap());
        assert_eq!(row.get("t"), Some(&Value::String("2023".into())));
    }

    #[test]
    fn test_format_unix_timestamp_rejects_non_numbers() {
        let row = Row::new("t", "soon");
        assert!(matches!(
            format_unix_timestamp(row, "t", "%Y").unwrap_err(),
            StepError::Malformed { .. }
        ));
    }
}
