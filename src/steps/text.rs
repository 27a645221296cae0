//! String-oriented steps: case conversion, slicing, splitting,
//! character cuts, masking and sed substitution.

use crate::error::{StepError, StepResult};
use crate::executor::RunContext;
use crate::row::{Row, Value};

use super::StepOutcome;

fn require(row: &Row, column: &str) -> StepResult<usize> {
    row.find(column)
        .ok_or_else(|| StepError::MissingColumn(column.to_string()))
}

/// Stringified view of a scalar column; containers are a type mismatch.
fn scalar_text(row: &Row, column: &str, pos: usize) -> StepResult<String> {
    match row.value(pos) {
        Value::Null
        | Value::Bool(_)
        | Value::Int(_)
        | Value::Float(_)
        | Value::String(_)
        | Value::Bytes(_) => Ok(row.value(pos).to_string()),
        other => Err(StepError::TypeMismatch {
            column: column.to_string(),
            expected: "string",
            actual: other.type_name(),
        }),
    }
}

// =============================================================================
// Case conversion
// =============================================================================

fn apply_case(
    mut row: Row,
    column: &str,
    f: impl Fn(&str) -> String,
) -> StepResult<StepOutcome> {
    let pos = require(&row, column)?;
    let text = scalar_text(&row, column, pos)?;
    row.set_value(pos, Value::String(f(&text)));
    Ok(StepOutcome::Keep(row))
}

pub(crate) fn uppercase(row: Row, column: &str) -> StepResult<StepOutcome> {
    apply_case(row, column, |s| s.to_uppercase())
}

pub(crate) fn lowercase(row: Row, column: &str) -> StepResult<StepOutcome> {
    apply_case(row, column, |s| s.to_lowercase())
}

/// First letter of each word upper, the rest lower; word boundaries are
/// non-alphanumeric characters.
pub(crate) fn titlecase(row: Row, column: &str) -> StepResult<StepOutcome> {
    apply_case(row, column, |s| {
        let mut out = String::with_capacity(s.len());
        let mut word_start = true;
        for c in s.chars() {
            if c.is_alphanumeric() {
                if word_start {
                    out.extend(c.to_uppercase());
                } else {
                    out.extend(c.to_lowercase());
                }
                word_start = false;
            } else {
                out.push(c);
                word_start = true;
            }
        }
        out
    })
}

// =============================================================================
// Slicing and splitting
// =============================================================================

/// Substring `[start, end)` of `source`, clamped to its bounds, written
/// to `destination`.
pub(crate) fn index_split(
    mut row: Row,
    source: &str,
    start: usize,
    end: usize,
    destination: &str,
) -> StepResult<StepOutcome> {
    let pos = require(&row, source)?;
    let chars: Vec<char> = scalar_text(&row, source, pos)?.chars().collect();
    let start = start.min(chars.len());
    let end = end.min(chars.len()).max(start);
    let piece: String = chars[start..end].iter().collect();
    row.set_or_add(destination, Value::String(piece));
    Ok(StepOutcome::Keep(row))
}

/// Split at the first occurrence of the delimiter: the head goes to
/// `first`, everything after it (extras included) to `second`, which is
/// Null when the delimiter never occurs.
pub(crate) fn split(
    mut row: Row,
    source: &str,
    delimiter: &str,
    first: &str,
    second: &str,
) -> StepResult<StepOutcome> {
    let pos = require(&row, source)?;
    let text = scalar_text(&row, source, pos)?;
    match text.find(delimiter) {
        Some(at) => {
            let head = text[..at].to_string();
            let tail = text[at + delimiter.len()..].to_string();
            row.add(first, Value::String(head));
            row.add(second, Value::String(tail));
        }
        None => {
            row.add(first, Value::String(text));
            row.add(second, Value::Null);
        }
    }
    Ok(StepOutcome::Keep(row))
}

// =============================================================================
// Character cut
// =============================================================================

/// One cut(1)-style range over 1-based character positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharRange {
    /// `N`
    Single(usize),
    /// `N-M`, inclusive.
    Closed(usize, usize),
    /// `N-`
    From(usize),
    /// `-M`
    To(usize),
}

/// Parse a comma-separated cut range list (`1-5,7,12-`).
pub(crate) fn parse_ranges(spec: &str) -> Result<Vec<CharRange>, String> {
    let mut ranges = Vec::new();
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            return Err("empty range".to_string());
        }
        let range = match part.split_once('-') {
            None => CharRange::Single(parse_position(part)?),
            Some(("", hi)) => CharRange::To(parse_position(hi)?),
            Some((lo, "")) => CharRange::From(parse_position(lo)?),
            Some((lo, hi)) => {
                let (lo, hi) = (parse_position(lo)?, parse_position(hi)?);
                if lo > hi {
                    return Err(format!("range {}-{} is inverted", lo, hi));
                }
                CharRange::Closed(lo, hi)
            }
        };
        ranges.push(range);
    }
    Ok(ranges)
}

fn parse_position(text: &str) -> Result<usize, String> {
    match text.trim().parse::<usize>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(format!("'{}' is not a position (1-based)", text.trim())),
    }
}

/// Extract the characters selected by the ranges, in range order, into
/// `destination`.
pub(crate) fn character_cut(
    mut row: Row,
    source: &str,
    destination: &str,
    ranges: &[CharRange],
) -> StepResult<StepOutcome> {
    let pos = require(&row, source)?;
    let chars: Vec<char> = scalar_text(&row, source, pos)?.chars().collect();
    let mut out = String::new();
    for range in ranges {
        let (lo, hi) = match *range {
            CharRange::Single(n) => (n, n),
            CharRange::Closed(lo, hi) => (lo, hi),
            CharRange::From(lo) => (lo, chars.len()),
            CharRange::To(hi) => (1, hi),
        };
        let lo = lo.saturating_sub(1).min(chars.len());
        let hi = hi.min(chars.len());
        out.extend(&chars[lo..hi]);
    }
    row.set_or_add(destination, Value::String(out));
    Ok(StepOutcome::Keep(row))
}

// =============================================================================
// Masking
// =============================================================================

/// Walk the pattern against the value: `#` reveals the corresponding
/// input character, every other pattern character replaces it. Stops
/// when the value runs out.
pub(crate) fn mask_number(mut row: Row, column: &str, pattern: &str) -> StepResult<StepOutcome> {
    let pos = require(&row, column)?;
    let text = scalar_text(&row, column, pos)?;
    let mut input = text.chars();
    let mut out = String::with_capacity(pattern.len());
    for mask in pattern.chars() {
        match input.next() {
            Some(c) if mask == '#' => out.push(c),
            Some(_) => out.push(mask),
            None => break,
        }
    }
    row.set_value(pos, Value::String(out));
    Ok(StepOutcome::Keep(row))
}

/// Map every letter and digit through the run's shuffle alphabet; the
/// same run always masks the same character the same way.
pub(crate) fn mask_shuffle(
    mut row: Row,
    column: &str,
    ctx: &mut RunContext,
) -> StepResult<StepOutcome> {
    let pos = require(&row, column)?;
    let text = scalar_text(&row, column, pos)?;
    let alphabet = ctx.shuffle_alphabet();
    let masked: String = text
        .chars()
        .map(|c| alphabet.get(&c).copied().unwrap_or(c))
        .collect();
    row.set_value(pos, Value::String(masked));
    Ok(StepOutcome::Keep(row))
}

// =============================================================================
// Sed
// =============================================================================

/// A parsed `s/pattern/replacement/[g]` substitution. The replacement is
/// stored pre-translated for the regex crate (`\1` → `${1}`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SedExpr {
    pub pattern: String,
    pub replacement: String,
    pub global: bool,
}

/// Parse a sed substitution. Any single-character delimiter may follow
/// the `s`; the delimiter can appear inside parts when escaped.
pub(crate) fn parse_sed(expr: &str) -> Result<SedExpr, String> {
    let mut chars = expr.chars();
    if chars.next() != Some('s') {
        return Err("substitution must start with 's'".to_string());
    }
    let delim = chars
        .next()
        .ok_or_else(|| "missing delimiter after 's'".to_string())?;

    let mut parts: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut escaped = false;
    for c in chars {
        if escaped {
            if c != delim {
                current.push('\\');
            }
            current.push(c);
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == delim {
            parts.push(std::mem::take(&mut current));
        } else {
            current.push(c);
        }
    }
    if escaped {
        return Err("dangling escape".to_string());
    }
    parts.push(current);

    let (pattern, replacement, flags) = match parts.len() {
        2 => (parts[0].clone(), parts[1].clone(), String::new()),
        3 => (parts[0].clone(), parts[1].clone(), parts[2].clone()),
        _ => return Err("expected s<delim>pattern<delim>replacement<delim>[flags]".to_string()),
    };

    let mut global = false;
    for flag in flags.chars() {
        match flag {
            'g' => global = true,
            other => return Err(format!("unsupported flag '{}'", other)),
        }
    }

    Ok(SedExpr {
        pattern,
        replacement: translate_replacement(&replacement),
        global,
    })
}

/// Rewrite sed backreferences (`\1`..`\9`) into the regex crate's
/// `${n}` form, keeping literal dollars literal.
fn translate_replacement(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.peek() {
                Some(d @ '1'..='9') => {
                    out.push_str("${");
                    out.push(*d);
                    out.push('}');
                    chars.next();
                }
                Some(_) => {
                    if let Some(next) = chars.next() {
                        out.push(next);
                    }
                }
                None => out.push('\\'),
            },
            '$' => out.push_str("$$"),
            other => out.push(other),
        }
    }
    out
}

/// Apply a sed substitution to the column value.
pub(crate) fn sed(
    mut row: Row,
    column: &str,
    substitution: &SedExpr,
    ctx: &mut RunContext,
) -> StepResult<StepOutcome> {
    let pos = require(&row, column)?;
    let text = scalar_text(&row, column, pos)?;
    let re = ctx.regex(&substitution.pattern)?;
    let replaced = if substitution.global {
        re.replace_all(&text, substitution.replacement.as_str())
    } else {
        re.replace(&text, substitution.replacement.as_str())
    };
    row.set_value(pos, Value::String(replaced.into_owned()));
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
    fn test_case_conversions() {
        let row = Row::new("c", "hello World");
        assert_eq!(
            keep(uppercase(row.clone(), "c").unwrap()).get("c"),
            Some(&Value::String("HELLO WORLD".into()))
        );
        assert_eq!(
            keep(lowercase(row.clone(), "c").unwrap()).get("c"),
            Some(&Value::String("hello world".into()))
        );
        assert_eq!(
            keep(titlecase(row, "c").unwrap()).get("c"),
            Some(&Value::String("Hello World".into()))
        );
    }

    #[test]
    fn test_case_rejects_containers() {
        let row = Row::new("c", Value::List(vec![]));
        let err = uppercase(row, "c").unwrap_err();
        assert!(matches!(err, StepError::TypeMismatch { .. }));
    }

    #[test]
    fn test_index_split_clamps() {
        let row = Row::new("s", "abcdef");
        let row = keep(index_split(row, "s", 1, 4, "d").unwrap());
        assert_eq!(row.get("s"), Some(&Value::String("abcdef".into())));
        assert_eq!(row.get("d"), Some(&Value::String("bcd".into())));

        let row = keep(index_split(row, "s", 4, 100, "e").unwrap());
        assert_eq!(row.get("e"), Some(&Value::String("ef".into())));
    }

    #[test]
    fn test_split_first_occurrence() {
        let row = Row::new("s", "a:b:c");
        let row = keep(split(row, "s", ":", "h", "t").unwrap());
        assert_eq!(row.get("h"), Some(&Value::String("a".into())));
        assert_eq!(row.get("t"), Some(&Value::String("b:c".into())));
    }

    #[test]
    fn test_split_without_delimiter() {
        let row = Row::new("s", "abc");
        let row = keep(split(row, "s", ":", "h", "t").unwrap());
        assert_eq!(row.get("h"), Some(&Value::String("abc".into())));
        assert_eq!(row.get("t"), Some(&Value::Null));
    }

    #[test]
    fn test_parse_ranges() {
        assert_eq!(
            parse_ranges("1-3,5,7-,-2").unwrap(),
            vec![
                CharRange::Closed(1, 3),
                CharRange::Single(5),
                CharRange::From(7),
                CharRange::To(2)
            ]
        );
        assert!(parse_ranges("0-3").is_err());
        assert!(parse_ranges("5-2").is_err());
        assert!(parse_ranges("a-b").is_err());
    }

    #[test]
    fn test_character_cut() {
        let row = Row::new("s", "abcdefghij");
        let ranges = parse_ranges("1-3,8-").unwrap();
        let row = keep(character_cut(row, "s", "d", &ranges).unwrap());
        assert_eq!(row.get("d"), Some(&Value::String("abchij".into())));
    }

    #[test]
    fn test_mask_number() {
        let row = Row::new("card", "1234567890");
        let row = keep(mask_number(row, "card", "##xx-xx##").unwrap());
        assert_eq!(row.get("card"), Some(&Value::String("12xx-xx89".into())));
    }

    #[test]
    fn test_mask_shuffle_is_deterministic_per_run() {
        let mut ctx = RunContext::with_seed(42);
        let row = Row::new("c", "abc-123");
        let first = keep(mask_shuffle(row.clone(), "c", &mut ctx).unwrap());
        let second = keep(mask_shuffle(row.clone(), "c", &mut ctx).unwrap());
        assert_eq!(first, second);

        // Digits stay digits, letters stay letters, punctuation survives.
        match first.get("c") {
            Some(Value::String(s)) => {
                assert_eq!(s.chars().count(), 7);
                assert_eq!(s.chars().nth(3), Some('-'));
                assert!(s.chars().take(3).all(|c| c.is_ascii_lowercase()));
                assert!(s.chars().skip(4).all(|c| c.is_ascii_digit()));
            }
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[test]
    fn test_parse_sed() {
        let s = parse_sed("s/ab/cd/g").unwrap();
        assert_eq!(s.pattern, "ab");
        assert_eq!(s.replacement, "cd");
        assert!(s.global);

        let s = parse_sed("s|a/b|c|").unwrap();
        assert_eq!(s.pattern, "a/b");

        assert!(parse_sed("x/a/b/").is_err());
        assert!(parse_sed("s/a/b/q").is_err());
    }

    #[test]
    fn test_sed_backreferences() {
        let mut ctx = RunContext::with_seed(0);
        let subst = parse_sed(r"s/(\w+)@(\w+)/\2 at \1/").unwrap();
        let row = Row::new("c", "user@example");
        let row = keep(sed(row, "c", &subst, &mut ctx).unwrap());
        assert_eq!(row.get("c"), Some(&Value::String("example at user".into())));
    }

    #[test]
    fn test_sed_global_vs_first() {
        let mut ctx = RunContext::with_seed(0);
        let row = Row::new("c", "aaa");

        let first_only = parse_sed("s/a/b/").unwrap();
        let out = keep(sed(row.clone(), "c", &first_only, &mut ctx).unwrap());
        assert_eq!(out.get("c"), Some(&Value::String("baa".into())));

        let all = parse_sed("s/a/b/g").unwrap();
        let out = keep(sed(row, "c", &all, &mut ctx).unwrap());
        assert_eq!(out.get("c"), Some(&Value::String("bbb".into())));
    }
}
