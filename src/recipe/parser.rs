//! Recipe text → validated step list.
//!
//! One directive per line, split on LF (a trailing CR is tolerated).
//! Blank lines advance the line counter but produce no step, so every
//! reported line number matches the source text. Parsing is a pure
//! function of the text: equal recipes produce equal step lists.

use crate::error::{ParseError, ParseResult};
use crate::steps::Step;

use super::registry::Registry;
use super::tokenizer::{Mode, Tokenizer};

/// Parse recipe text against the standard registry.
pub fn parse(text: &str) -> ParseResult<Vec<Step>> {
    parse_with_registry(text, &Registry::standard())
}

/// Parse recipe text against a caller-supplied registry.
pub fn parse_with_registry(text: &str, registry: &Registry) -> ParseResult<Vec<Step>> {
    let mut steps = Vec::new();

    for (index, raw_line) in text.split('\n').enumerate() {
        let line_number = index + 1;
        let line = raw_line.trim_end();
        if line.trim().is_empty() {
            continue;
        }

        let mut tokenizer = Tokenizer::new(line);
        let first = match tokenizer.next(Mode::Whitespace) {
            Some(token) => token,
            None => continue,
        };

        // The `set` family dispatches on two tokens.
        let name = if first == "set" {
            match tokenizer.next(Mode::Whitespace) {
                Some(sub) => format!("set {}", sub),
                None => {
                    return Err(ParseError::MissingField {
                        directive: "set".to_string(),
                        field: "sub-directive".to_string(),
                        usage: "set <format|column|columns> ...".to_string(),
                        line: line_number,
                    })
                }
            }
        } else {
            first.to_string()
        };

        let spec = registry
            .get(&name)
            .ok_or_else(|| ParseError::UnknownDirective {
                directive: name.clone(),
                line: line_number,
            })?;

        let mut args = Args {
            tokenizer,
            directive: spec.name,
            usage: spec.usage,
            line: line_number,
        };
        let kind = (spec.parse)(&mut args)?;
        steps.push(Step::new(line_number, line.trim(), kind));
    }

    Ok(steps)
}

/// Tokenizer plus the context a constructor needs to raise precise
/// errors.
pub struct Args<'a> {
    tokenizer: Tokenizer<'a>,
    directive: &'static str,
    usage: &'static str,
    pub line: usize,
}

impl<'a> Args<'a> {
    /// Next token; its absence is a missing-field error quoting the
    /// directive's usage template.
    pub fn required(&mut self, field: &str, mode: Mode) -> ParseResult<&'a str> {
        self.tokenizer
            .next(mode)
            .ok_or_else(|| ParseError::MissingField {
                directive: self.directive.to_string(),
                field: field.to_string(),
                usage: self.usage.to_string(),
                line: self.line,
            })
    }

    /// Next token, or None when the line is exhausted.
    pub fn optional(&mut self, mode: Mode) -> Option<&'a str> {
        self.tokenizer.next(mode)
    }
}

/// Standard string-escape resolution for delimiter-style arguments
/// (`\t`, `\n`, `\r`, `\\`, `\"`, `\'`, `\0`).
pub fn unescape(raw: &str) -> Result<String, String> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some(other) => return Err(format!("unknown escape '\\{}'", other)),
            None => return Err("dangling escape".to_string()),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::steps::StepKind;

    #[test]
    fn test_parse_is_deterministic() {
        let text = "rename a b\ndrop c";
        let first = parse(text).unwrap();
        let second = parse(text).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[test]
    fn test_blank_lines_advance_line_counter() {
        let text = "rename a b\n\n   \ndrop c";
        let steps = parse(text).unwrap();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[0].line(), 1);
        assert_eq!(steps[1].line(), 4);
    }

    #[test]
    fn test_unknown_directive_names_line() {
        let err = parse("rename a b\nfrobnicate x").unwrap_err();
        match err {
            ParseError::UnknownDirective { directive, line } => {
                assert_eq!(directive, "frobnicate");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_field_quotes_usage() {
        let err = parse("rename a").unwrap_err();
        match err {
            ParseError::MissingField {
                directive,
                field,
                usage,
                line,
            } => {
                assert_eq!(directive, "rename");
                assert_eq!(field, "new");
                assert_eq!(usage, "rename <old> <new>");
                assert_eq!(line, 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_set_family_dispatch() {
        let steps = parse("set format csv , true\nset column t price * 2\nset columns a,b").unwrap();
        assert!(matches!(
            steps[0].kind(),
            StepKind::ParseAsCsv {
                drop_source: true,
                delimiter: ',',
                skip_empty: true,
                ..
            }
        ));
        assert!(matches!(steps[1].kind(), StepKind::SetColumn { .. }));
        assert!(matches!(steps[2].kind(), StepKind::Columns { names } if names.len() == 2));
    }

    #[test]
    fn test_set_format_rejects_unknown_format() {
        let err = parse("set format avro , true").unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedOption { .. }));
    }

    #[test]
    fn test_escaped_delimiter() {
        let steps = parse("parse-as-csv body \\t false").unwrap();
        assert!(matches!(
            steps[0].kind(),
            StepKind::ParseAsCsv {
                delimiter: '\t',
                skip_empty: false,
                ..
            }
        ));

        let err = parse("parse-as-csv body \\q false").unwrap_err();
        assert!(matches!(err, ParseError::BadDelimiter { .. }));
    }

    #[test]
    fn test_flatten_rejects_wildcard() {
        assert!(matches!(
            parse("flatten *").unwrap_err(),
            ParseError::UnsupportedOption { .. }
        ));
        assert!(matches!(
            parse("flatten a,*,b").unwrap_err(),
            ParseError::UnsupportedOption { .. }
        ));
    }

    #[test]
    fn test_fixed_length_width_validation() {
        let steps = parse("parse-as-fixed-length rec 4,6,2").unwrap();
        assert!(matches!(
            steps[0].kind(),
            StepKind::ParseAsFixedLength { widths, padding, .. }
                if widths == &vec![4, 6, 2] && padding == " "
        ));

        let err = parse("parse-as-fixed-length rec 4,x,2").unwrap_err();
        assert!(matches!(
            err,
            ParseError::BadNumber { value, .. } if value == "x"
        ));
    }

    #[test]
    fn test_fill_null_or_empty_rejects_empty_literal() {
        let err = parse("fill-null-or-empty c \"\"").unwrap_err();
        assert!(matches!(err, ParseError::EmptyLiteral { .. }));
    }

    #[test]
    fn test_character_cut_options() {
        let steps = parse("character-cut s d -c 1-4,7").unwrap();
        assert!(matches!(
            steps[0].kind(),
            StepKind::CharacterCut { ranges, .. } if ranges.len() == 2
        ));

        let err = parse("character-cut s d -d ,").unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedOption { .. }));
    }

    #[test]
    fn test_filter_regex_unwraps_slashes() {
        let steps = parse("filter-row-if-matched c /^x/").unwrap();
        assert!(matches!(
            steps[0].kind(),
            StepKind::FilterRowIfMatched { pattern, .. } if pattern == "^x"
        ));

        let err = parse("filter-row-if-matched c /(/").unwrap_err();
        assert!(matches!(err, ParseError::BadRegex { .. }));
    }

    #[test]
    fn test_bad_expression_is_a_parse_error() {
        let err = parse("filter-row-if-true a +").unwrap_err();
        assert!(matches!(err, ParseError::BadExpression { .. }));
    }

    #[test]
    fn test_sed_and_quantize_validation() {
        assert!(parse("sed c s/a/b/g").is_ok());
        assert!(matches!(
            parse("sed c x/a/b/").unwrap_err(),
            ParseError::BadArgument { .. }
        ));

        assert!(parse("quantize v band 0:10=low,10:20=high").is_ok());
        assert!(matches!(
            parse("quantize v band 10:0=bad").unwrap_err(),
            ParseError::BadArgument { .. }
        ));
    }

    #[test]
    fn test_directive_text_and_line_recorded() {
        let steps = parse("  swap a b  ").unwrap();
        assert_eq!(steps[0].text(), "swap a b");
        assert_eq!(steps[0].line(), 1);
    }

    #[test]
    fn test_unescape() {
        assert_eq!(unescape(r"\t").unwrap(), "\t");
        assert_eq!(unescape(r"\\").unwrap(), "\\");
        assert_eq!(unescape(r"a\nb").unwrap(), "a\nb");
        assert!(unescape(r"\q").is_err());
        assert!(unescape("trailing\\").is_err());
    }
}
