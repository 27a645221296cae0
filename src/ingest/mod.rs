//! Input decoding for the CLI: CSV and JSON files into rows, with
//! encoding and delimiter auto-detection for CSV.
//!
//! No recipe logic here; this is the boundary between files on disk and
//! the engine's row model.

use std::fmt;

use serde_json::Value as Json;

use crate::row::{Row, Value};

/// Input decoding error with line context.
#[derive(Debug, Clone)]
pub struct IngestError {
    pub line: usize,
    pub message: String,
}

impl IngestError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line > 0 {
            write!(f, "Line {}: {}", self.line, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for IngestError {}

/// Result of decoding an input file.
#[derive(Debug, Clone)]
pub struct IngestResult {
    pub rows: Vec<Row>,
    pub headers: Vec<String>,
    /// Detected or assumed encoding.
    pub encoding: String,
    /// Detected or assumed delimiter (CSV only).
    pub delimiter: char,
}

/// Detect the encoding of raw bytes.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let (charset, _, _) = chardet::detect(bytes);
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        other => other.to_string(),
    }
}

/// Decode bytes under the given encoding name.
pub fn decode_content(bytes: &[u8], encoding: &str) -> String {
    match encoding.to_lowercase().as_str() {
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.to_string()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.to_string(),
        _ => String::from_utf8_lossy(bytes).to_string(),
    }
}

/// Detect the delimiter by counting candidates in the first line.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let candidates = [';', ',', '\t', '|'];
    let mut best = ',';
    let mut best_count = 0;

    for &candidate in &candidates {
        let count = first_line.matches(candidate).count();
        if count > best_count {
            best_count = count;
            best = candidate;
        }
    }
    best
}

/// Decode CSV bytes with auto-detection of encoding and delimiter.
pub fn rows_from_csv_auto(bytes: &[u8]) -> Result<IngestResult, IngestError> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding);
    let delimiter = detect_delimiter(&content);
    rows_from_csv(&content, delimiter, encoding)
}

/// Decode CSV text with an explicit delimiter. The first line is the
/// header; every field lands as a string column; short records pad
/// with empty strings; blank lines are skipped.
pub fn rows_from_csv(
    content: &str,
    delimiter: char,
    encoding: String,
) -> Result<IngestResult, IngestError> {
    let mut lines = content.lines();

    let header_line = lines
        .next()
        .ok_or_else(|| IngestError::new(1, "Empty CSV file"))?;
    let headers: Vec<String> = header_line
        .split(delimiter)
        .map(|h| h.trim().trim_matches('"').to_string())
        .collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(IngestError::new(1, "No headers found"));
    }

    let mut rows = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split(delimiter).collect();
        let mut row = Row::empty();
        for (i, header) in headers.iter().enumerate() {
            let field = fields
                .get(i)
                .map(|f| f.trim().trim_matches('"'))
                .unwrap_or("");
            row.add(header.clone(), Value::String(field.to_string()));
        }
        rows.push(row);
    }

    Ok(IngestResult {
        rows,
        headers,
        encoding,
        delimiter,
    })
}

/// Decode a JSON array of objects into rows, preserving key order and
/// value types.
pub fn rows_from_json(content: &str) -> Result<Vec<Row>, IngestError> {
    let json: Json = serde_json::from_str(content)
        .map_err(|e| IngestError::new(e.line(), format!("Invalid JSON: {}", e)))?;
    let items = match json {
        Json::Array(items) => items,
        _ => return Err(IngestError::new(0, "Expected a JSON array of objects")),
    };

    let mut rows = Vec::with_capacity(items.len());
    for (index, item) in items.into_iter().enumerate() {
        match item {
            Json::Object(obj) => rows.push(Row::from_json_object(obj)),
            other => {
                return Err(IngestError::new(
                    0,
                    format!(
                        "Element {} is {}, expected an object",
                        index,
                        type_of(&other)
                    ),
                ))
            }
        }
    }
    Ok(rows)
}

/// Wrap each line of plain text in a single starting column, ready for
/// `set format`.
pub fn rows_from_lines(content: &str, column: &str) -> Vec<Row> {
    content
        .lines()
        .map(|line| Row::new(column, Value::String(line.to_string())))
        .collect()
}

fn type_of(json: &Json) -> &'static str {
    match json {
        Json::Null => "null",
        Json::Bool(_) => "a boolean",
        Json::Number(_) => "a number",
        Json::String(_) => "a string",
        Json::Array(_) => "an array",
        Json::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_csv() {
        let result = rows_from_csv("name;age\nAlice;30\nBob;25", ';', "utf-8".into()).unwrap();
        assert_eq!(result.headers, vec!["name", "age"]);
        assert_eq!(result.rows.len(), 2);
        assert_eq!(
            result.rows[0].get("name"),
            Some(&Value::String("Alice".into()))
        );
        assert_eq!(result.rows[1].get("age"), Some(&Value::String("25".into())));
    }

    #[test]
    fn test_missing_and_extra_fields() {
        let result = rows_from_csv("a;b;c\n1;;3\n1;2;3;4", ';', "utf-8".into()).unwrap();
        assert_eq!(result.rows[0].get("b"), Some(&Value::String("".into())));
        assert_eq!(result.rows[1].len(), 3);
    }

    #[test]
    fn test_blank_lines_skipped() {
        let result = rows_from_csv("a;b\n1;2\n\n3;4\n", ';', "utf-8".into()).unwrap();
        assert_eq!(result.rows.len(), 2);
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(rows_from_csv("", ';', "utf-8".into()).is_err());
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter("a;b;c\n1;2;3"), ';');
        assert_eq!(detect_delimiter("a,b,c"), ',');
        assert_eq!(detect_delimiter("a\tb\tc"), '\t');
        assert_eq!(detect_delimiter("a|b|c"), '|');
    }

    #[test]
    fn test_auto_detection() {
        let result = rows_from_csv_auto("name,age\nAda,36".as_bytes()).unwrap();
        assert_eq!(result.delimiter, ',');
        assert_eq!(result.encoding, "utf-8");
        assert_eq!(result.rows.len(), 1);
    }

    #[test]
    fn test_latin1_decoding() {
        // "Société" in ISO-8859-1
        let bytes: &[u8] = &[0x53, 0x6F, 0x63, 0x69, 0xE9, 0x74, 0xE9];
        let decoded = decode_content(bytes, "iso-8859-1");
        assert!(decoded.starts_with("Soci"));
    }

    #[test]
    fn test_rows_from_json() {
        let rows = rows_from_json(r#"[{"id": 1, "name": "a"}, {"id": 2}]"#).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("id"), Some(&Value::Int(1)));

        assert!(rows_from_json(r#"{"not": "array"}"#).is_err());
        assert!(rows_from_json("[1,2]").is_err());
    }

    #[test]
    fn test_rows_from_lines() {
        let rows = rows_from_lines("x,y\nz", "body");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("body"), Some(&Value::String("x,y".into())));
    }
}
