//! JSON-aware steps: parse-as-json (also serving parse-xml-element),
//! json-path (also serving xml-path), and parse-as-xml.

use serde_json::Value as Json;

use crate::error::{StepError, StepResult};
use crate::row::{Row, Value};
use crate::xml::xml_to_json;

use super::StepOutcome;

fn require(row: &Row, column: &str) -> StepResult<usize> {
    row.find(column)
        .ok_or_else(|| StepError::MissingColumn(column.to_string()))
}

/// JSON view of a column: JSON text in a string, or an existing handle.
fn json_of(row: &Row, column: &str, pos: usize) -> StepResult<Json> {
    match row.value(pos) {
        Value::String(s) => serde_json::from_str(s).map_err(|e| StepError::Malformed {
            column: column.to_string(),
            message: format!("not valid JSON: {}", e),
        }),
        Value::JsonObject(map) => Ok(Json::Object(map.clone())),
        Value::JsonArray(items) => Ok(Json::Array(items.clone())),
        other => Err(StepError::TypeMismatch {
            column: column.to_string(),
            expected: "string, json-object or json-array",
            actual: other.type_name(),
        }),
    }
}

/// Expand a JSON object one level: one appended column per top-level
/// key, named `<column>.<key>`, types preserved; nested containers stay
/// opaque handles, so re-applying the directive to a generated column
/// expands one more level. Arrays and scalars replace the column value
/// in place. `delete_column` removes the original column after an
/// object expansion.
pub(crate) fn parse_as_json(
    mut row: Row,
    column: &str,
    delete_column: bool,
) -> StepResult<StepOutcome> {
    let pos = require(&row, column)?;
    match json_of(&row, column, pos)? {
        Json::Object(map) => {
            for (key, value) in map {
                row.add(format!("{}.{}", column, key), Value::from_json(value));
            }
            if delete_column {
                row.remove(pos);
            }
        }
        Json::Array(items) => row.set_value(pos, Value::JsonArray(items)),
        scalar => row.set_value(pos, Value::from_json(scalar)),
    }
    Ok(StepOutcome::Keep(row))
}

/// Parse an XML element tree into a JSON object handle in place.
pub(crate) fn parse_as_xml(mut row: Row, column: &str) -> StepResult<StepOutcome> {
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
    let object = xml_to_json(&text).map_err(|message| StepError::Malformed {
        column: column.to_string(),
        message,
    })?;
    row.set_value(pos, Value::JsonObject(object));
    Ok(StepOutcome::Keep(row))
}

/// Evaluate a dotted-path expression against the source column and
/// write the result to the destination, creating it when absent.
pub(crate) fn json_path(
    mut row: Row,
    source: &str,
    destination: &str,
    path: &str,
) -> StepResult<StepOutcome> {
    let pos = require(&row, source)?;
    let json = json_of(&row, source, pos)?;
    let result = evaluate_path(&json, path).map_err(|message| StepError::Malformed {
        column: source.to_string(),
        message,
    })?;
    row.set_or_add(destination, Value::from_json(result));
    Ok(StepOutcome::Keep(row))
}

// =============================================================================
// Path evaluation
// =============================================================================

#[derive(Debug, PartialEq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Evaluate a path of the form `$.a.b[0].c` (the `$` is optional).
fn evaluate_path(root: &Json, path: &str) -> Result<Json, String> {
    let mut current = root;
    for segment in parse_path(path)? {
        current = match &segment {
            Segment::Key(key) => current
                .get(key)
                .ok_or_else(|| format!("path key '{}' not found", key))?,
            Segment::Index(index) => current
                .get(index)
                .ok_or_else(|| format!("path index [{}] out of bounds", index))?,
        };
    }
    Ok(current.clone())
}

fn parse_path(path: &str) -> Result<Vec<Segment>, String> {
    let mut rest = path.trim();
    rest = rest.strip_prefix('$').unwrap_or(rest);

    let mut segments = Vec::new();
    while !rest.is_empty() {
        if let Some(after) = rest.strip_prefix('.') {
            rest = after;
            continue;
        }
        if let Some(after) = rest.strip_prefix('[') {
            let close = after
                .find(']')
                .ok_or_else(|| "unclosed '[' in path".to_string())?;
            let inside = after[..close].trim();
            let segment = if let Some(quoted) = inside
                .strip_prefix('\'')
                .and_then(|s| s.strip_suffix('\''))
            {
                Segment::Key(quoted.to_string())
            } else {
                Segment::Index(
                    inside
                        .parse::<usize>()
                        .map_err(|_| format!("'{}' is not an array index", inside))?,
                )
            };
            segments.push(segment);
            rest = &after[close + 1..];
            continue;
        }
        let end = rest
            .find(|c| c == '.' || c == '[')
            .unwrap_or(rest.len());
        if end == 0 {
            return Err(format!("empty path segment in '{}'", path));
        }
        segments.push(Segment::Key(rest[..end].to_string()));
        rest = &rest[end..];
    }

    if segments.is_empty() {
        return Err("empty path".to_string());
    }
    Ok(segments)
}
