//! Directive registry: canonical names, usage templates, and the
//! parse constructors that turn a tokenized line into a [`StepKind`].
//!
//! The usage template is quoted verbatim in missing-argument errors, so
//! the text here is user-facing. Constructors perform all
//! directive-specific validation; whatever reaches the executor has
//! already been checked.

use std::collections::HashMap;

use regex::Regex;

use crate::error::{ParseError, ParseResult};
use crate::expr;
use crate::steps::text::{parse_ranges, parse_sed};
use crate::steps::filter::parse_buckets;
use crate::steps::StepKind;

use super::parser::{unescape, Args};
use super::tokenizer::Mode;
use super::STARTING_COLUMN;

/// Parse constructor: tokenizer positioned after the directive name,
/// plus line/usage context, to a validated step kind.
pub(crate) type ParseFn = fn(&mut Args<'_>) -> ParseResult<StepKind>;

/// One registered directive.
pub struct DirectiveSpec {
    pub name: &'static str,
    pub usage: &'static str,
    pub(crate) parse: ParseFn,
}

/// Name → directive table. The `set` family registers under two-token
/// names (`set format`, `set column`, `set columns`).
pub struct Registry {
    entries: HashMap<&'static str, DirectiveSpec>,
}

impl Registry {
    /// The full standard directive set.
    pub fn standard() -> Self {
        let mut registry = Registry {
            entries: HashMap::new(),
        };
        for spec in standard_specs() {
            registry.entries.insert(spec.name, spec);
        }
        registry
    }

    pub fn get(&self, name: &str) -> Option<&DirectiveSpec> {
        self.entries.get(name)
    }

    /// All directives, sorted by name. Drives the CLI listing.
    pub fn specs(&self) -> Vec<&DirectiveSpec> {
        let mut specs: Vec<&DirectiveSpec> = self.entries.values().collect();
        specs.sort_by_key(|s| s.name);
        specs
    }
}

fn standard_specs() -> Vec<DirectiveSpec> {
    vec![
        DirectiveSpec {
            name: "set format",
            usage: "set format csv <delimiter> <skip empty lines - true or false>",
            parse: parse_set_format,
        },
        DirectiveSpec {
            name: "set column",
            usage: "set column <column> <expression>",
            parse: parse_set_column,
        },
        DirectiveSpec {
            name: "set columns",
            usage: "set columns <column-1>,<column-2>,...",
            parse: parse_columns,
        },
        DirectiveSpec {
            name: "columns",
            usage: "columns <column-1>,<column-2>,...",
            parse: parse_columns,
        },
        DirectiveSpec {
            name: "rename",
            usage: "rename <old> <new>",
            parse: parse_rename,
        },
        DirectiveSpec {
            name: "drop",
            usage: "drop <column>",
            parse: parse_drop,
        },
        DirectiveSpec {
            name: "copy",
            usage: "copy <source> <destination> [force]",
            parse: parse_copy,
        },
        DirectiveSpec {
            name: "swap",
            usage: "swap <first> <second>",
            parse: parse_swap,
        },
        DirectiveSpec {
            name: "merge",
            usage: "merge <first> <second> <new-column> <separator>",
            parse: parse_merge,
        },
        DirectiveSpec {
            name: "flatten",
            usage: "flatten <column>[,<column>,...]",
            parse: parse_flatten,
        },
        DirectiveSpec {
            name: "fill-null-or-empty",
            usage: "fill-null-or-empty <column> <fixed-value>",
            parse: parse_fill_null_or_empty,
        },
        DirectiveSpec {
            name: "uppercase",
            usage: "uppercase <column>",
            parse: |args| parse_case(args, CaseKind::Upper),
        },
        DirectiveSpec {
            name: "lowercase",
            usage: "lowercase <column>",
            parse: |args| parse_case(args, CaseKind::Lower),
        },
        DirectiveSpec {
            name: "titlecase",
            usage: "titlecase <column>",
            parse: |args| parse_case(args, CaseKind::Title),
        },
        DirectiveSpec {
            name: "indexsplit",
            usage: "indexsplit <source> <start> <end> <destination>",
            parse: parse_index_split,
        },
        DirectiveSpec {
            name: "split",
            usage: "split <source> <delimiter> <new-column-1> <new-column-2>",
            parse: parse_split,
        },
        DirectiveSpec {
            name: "split-to-rows",
            usage: "split-to-rows <column> <regex>",
            parse: parse_split_to_rows,
        },
        DirectiveSpec {
            name: "split-to-columns",
            usage: "split-to-columns <column> <regex>",
            parse: parse_split_to_columns,
        },
        DirectiveSpec {
            name: "character-cut",
            usage: "character-cut <source> <destination> -c <range>[,<range>,...]",
            parse: parse_character_cut,
        },
        DirectiveSpec {
            name: "parse-as-csv",
            usage: "parse-as-csv <column> <delimiter> <skip-if-empty - true or false>",
            parse: parse_parse_as_csv,
        },
        DirectiveSpec {
            name: "parse-as-json",
            usage: "parse-as-json <column> [<delete-column - true or false>]",
            parse: parse_parse_as_json,
        },
        DirectiveSpec {
            name: "parse-xml-element",
            usage: "parse-xml-element <column> [<delete-column - true or false>]",
            parse: parse_parse_as_json,
        },
        DirectiveSpec {
            name: "parse-as-fixed-length",
            usage: "parse-as-fixed-length <column> <width-1>,<width-2>,... [<padding>]",
            parse: parse_parse_as_fixed_length,
        },
        DirectiveSpec {
            name: "parse-as-xml",
            usage: "parse-as-xml <column>",
            parse: parse_parse_as_xml,
        },
        DirectiveSpec {
            name: "json-path",
            usage: "json-path <source> <destination> <json-path>",
            parse: parse_json_path,
        },
        DirectiveSpec {
            name: "xml-path",
            usage: "xml-path <source> <destination> <path>",
            parse: parse_json_path,
        },
        DirectiveSpec {
            name: "format-date",
            usage: "format-date <column> <source-pattern> <destination-pattern>",
            parse: parse_format_date,
        },
        DirectiveSpec {
            name: "format-unix-timestamp",
            usage: "format-unix-timestamp <column> <destination-pattern>",
            parse: parse_format_unix_timestamp,
        },
        DirectiveSpec {
            name: "mask-number",
            usage: "mask-number <column> <mask-pattern>",
            parse: parse_mask_number,
        },
        DirectiveSpec {
            name: "mask-shuffle",
            usage: "mask-shuffle <column>",
            parse: parse_mask_shuffle,
        },
        DirectiveSpec {
            name: "filter-row-if-matched",
            usage: "filter-row-if-matched <column> <regex>",
            parse: parse_filter_row_if_matched,
        },
        DirectiveSpec {
            name: "filter-row-if-true",
            usage: "filter-row-if-true <condition>",
            parse: parse_filter_row_if_true,
        },
        DirectiveSpec {
            name: "sed",
            usage: "sed <column> <expression>",
            parse: parse_sed_directive,
        },
        DirectiveSpec {
            name: "quantize",
            usage: "quantize <source> <destination> <lower>:<upper>=<label>[,<lower>:<upper>=<label>]*",
            parse: parse_quantize,
        },
    ]
}

// =============================================================================
// Constructors
// =============================================================================

fn parse_set_format(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let format = args.required("format", Mode::Whitespace)?;
    if !format.eq_ignore_ascii_case("csv") {
        return Err(ParseError::UnsupportedOption {
            message: format!("Unknown format '{}' specified", format),
            line: args.line,
        });
    }
    let delimiter = parse_delimiter(args, "delimiter")?;
    let skip_empty = args
        .required("skip empty lines", Mode::Whitespace)?
        .eq_ignore_ascii_case("true");
    Ok(StepKind::ParseAsCsv {
        column: STARTING_COLUMN.to_string(),
        delimiter,
        skip_empty,
        drop_source: true,
    })
}

fn parse_set_column(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let column = args.required("column", Mode::Whitespace)?.to_string();
    let expression = args.required("expression", Mode::ToEndOfLine)?.to_string();
    expr::parse(&expression).map_err(|source| ParseError::BadExpression {
        line: args.line,
        source,
    })?;
    Ok(StepKind::SetColumn { column, expression })
}

fn parse_columns(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let list = args.required("columns", Mode::ToEndOfLine)?;
    let mut names = Vec::new();
    for name in list.split(',') {
        let name = name.trim();
        if name.is_empty() {
            return Err(ParseError::EmptyLiteral {
                field: "columns".to_string(),
                line: args.line,
            });
        }
        names.push(name.to_string());
    }
    Ok(StepKind::Columns { names })
}

fn parse_rename(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let old = args.required("old", Mode::Whitespace)?.to_string();
    let new = args.required("new", Mode::Whitespace)?.to_string();
    Ok(StepKind::Rename { old, new })
}

fn parse_drop(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let column = args.required("column", Mode::Whitespace)?.to_string();
    Ok(StepKind::Drop { column })
}

fn parse_copy(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let source = args.required("source", Mode::Whitespace)?.to_string();
    let destination = args.required("destination", Mode::Whitespace)?.to_string();
    let force = args
        .optional(Mode::ToEndOfLine)
        .map(|t| t.eq_ignore_ascii_case("true") || t.eq_ignore_ascii_case("force"))
        .unwrap_or(false);
    Ok(StepKind::Copy {
        source,
        destination,
        force,
    })
}

fn parse_swap(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let first = args.required("first", Mode::Whitespace)?.to_string();
    let second = args.required("second", Mode::Whitespace)?.to_string();
    Ok(StepKind::Swap { first, second })
}

fn parse_merge(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let first = args.required("first", Mode::Whitespace)?.to_string();
    let second = args.required("second", Mode::Whitespace)?.to_string();
    let destination = args.required("new-column", Mode::Whitespace)?.to_string();
    let separator = args.required("separator", Mode::Whitespace)?;
    let separator = if separator.starts_with('\\') {
        unescape(separator).map_err(|_| ParseError::BadDelimiter {
            value: separator.to_string(),
            line: args.line,
        })?
    } else {
        separator.to_string()
    };
    Ok(StepKind::Merge {
        first,
        second,
        destination,
        separator,
    })
}

fn parse_flatten(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let list = args.required("columns", Mode::ToEndOfLine)?;
    let mut columns = Vec::new();
    for name in list.split(',') {
        let name = name.trim();
        if name == "*" {
            return Err(ParseError::UnsupportedOption {
                message:
                    "Flatten does not support wildcard ('*') flattening, specify column names"
                        .to_string(),
                line: args.line,
            });
        }
        if name.is_empty() {
            return Err(ParseError::EmptyLiteral {
                field: "columns".to_string(),
                line: args.line,
            });
        }
        columns.push(name.to_string());
    }
    Ok(StepKind::Flatten { columns })
}

fn parse_fill_null_or_empty(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let column = args.required("column", Mode::Whitespace)?.to_string();
    let raw = args.required("fixed-value", Mode::ToEndOfLine)?;
    let value = raw
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(raw);
    if value.is_empty() {
        return Err(ParseError::EmptyLiteral {
            field: "fixed-value".to_string(),
            line: args.line,
        });
    }
    Ok(StepKind::FillNullOrEmpty {
        column,
        value: value.to_string(),
    })
}

enum CaseKind {
    Upper,
    Lower,
    Title,
}

fn parse_case(args: &mut Args<'_>, kind: CaseKind) -> ParseResult<StepKind> {
    let column = args.required("column", Mode::Whitespace)?.to_string();
    Ok(match kind {
        CaseKind::Upper => StepKind::Uppercase { column },
        CaseKind::Lower => StepKind::Lowercase { column },
        CaseKind::Title => StepKind::Titlecase { column },
    })
}

fn parse_index_split(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let source = args.required("source", Mode::Whitespace)?.to_string();
    let start = parse_number(args, "start")?;
    let end = parse_number(args, "end")?;
    let destination = args.required("destination", Mode::Whitespace)?.to_string();
    Ok(StepKind::IndexSplit {
        source,
        start,
        end,
        destination,
    })
}

fn parse_split(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let source = args.required("source", Mode::Whitespace)?.to_string();
    let delimiter = args.required("delimiter", Mode::Whitespace)?;
    let delimiter = if delimiter.starts_with('\\') {
        unescape(delimiter).map_err(|_| ParseError::BadDelimiter {
            value: delimiter.to_string(),
            line: args.line,
        })?
    } else {
        delimiter.to_string()
    };
    let first = args.required("new-column-1", Mode::Whitespace)?.to_string();
    let second = args.required("new-column-2", Mode::Whitespace)?.to_string();
    Ok(StepKind::Split {
        source,
        delimiter,
        first,
        second,
    })
}

fn parse_split_to_rows(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let column = args.required("column", Mode::Whitespace)?.to_string();
    let pattern = parse_regex(args, "regex")?;
    Ok(StepKind::SplitToRows { column, pattern })
}

fn parse_split_to_columns(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let column = args.required("column", Mode::Whitespace)?.to_string();
    let pattern = parse_regex(args, "regex")?;
    Ok(StepKind::SplitToColumns { column, pattern })
}

fn parse_character_cut(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let source = args.required("source", Mode::Whitespace)?.to_string();
    let destination = args.required("destination", Mode::Whitespace)?.to_string();
    let option = args.required("option", Mode::Whitespace)?;
    if option.eq_ignore_ascii_case("-d") {
        return Err(ParseError::UnsupportedOption {
            message: "Delimited cut (-d) is not supported, use character ranges (-c)".to_string(),
            line: args.line,
        });
    }
    if !option.eq_ignore_ascii_case("-c") {
        return Err(ParseError::UnsupportedOption {
            message: format!(
                "Unknown option '{}' specified, only character ranges (-c) are supported",
                option
            ),
            line: args.line,
        });
    }
    let spec = args.required("range", Mode::ToEndOfLine)?;
    let ranges = parse_ranges(spec).map_err(|message| ParseError::BadArgument {
        what: "range",
        value: spec.to_string(),
        message,
        line: args.line,
    })?;
    Ok(StepKind::CharacterCut {
        source,
        destination,
        ranges,
    })
}

fn parse_parse_as_csv(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let column = args.required("column", Mode::Whitespace)?.to_string();
    let delimiter = parse_delimiter(args, "delimiter")?;
    let skip_empty = args
        .required("skip-if-empty", Mode::Whitespace)?
        .eq_ignore_ascii_case("true");
    Ok(StepKind::ParseAsCsv {
        column,
        delimiter,
        skip_empty,
        drop_source: false,
    })
}

fn parse_parse_as_json(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let column = args.required("column", Mode::Whitespace)?.to_string();
    let delete_column = args
        .optional(Mode::ToEndOfLine)
        .map(|t| t.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    Ok(StepKind::ParseAsJson {
        column,
        delete_column,
    })
}

fn parse_parse_as_fixed_length(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let column = args.required("column", Mode::Whitespace)?.to_string();
    let width_list = args.required("widths", Mode::Whitespace)?;
    let mut widths = Vec::new();
    for width in width_list.split(',') {
        let width = width.trim();
        widths.push(width.parse::<usize>().map_err(|_| ParseError::BadNumber {
            field: "widths".to_string(),
            value: width.to_string(),
            line: args.line,
        })?);
    }
    let padding = match args.optional(Mode::ToEndOfLine) {
        Some(padding) if !padding.is_empty() => padding.to_string(),
        _ => " ".to_string(),
    };
    Ok(StepKind::ParseAsFixedLength {
        column,
        widths,
        padding,
    })
}

fn parse_parse_as_xml(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let column = args.required("column", Mode::Whitespace)?.to_string();
    Ok(StepKind::ParseAsXml { column })
}

fn parse_json_path(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let source = args.required("source", Mode::Whitespace)?.to_string();
    let destination = args.required("destination", Mode::Whitespace)?.to_string();
    let path = args.required("json-path", Mode::ToEndOfLine)?.to_string();
    Ok(StepKind::JsonPath {
        source,
        destination,
        path,
    })
}

fn parse_format_date(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let column = args.required("column", Mode::Whitespace)?.to_string();
    let source_pattern = args.required("source-pattern", Mode::Whitespace)?.to_string();
    let destination_pattern = args
        .required("destination-pattern", Mode::ToEndOfLine)?
        .to_string();
    Ok(StepKind::FormatDate {
        column,
        source_pattern,
        destination_pattern,
    })
}

fn parse_format_unix_timestamp(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let column = args.required("column", Mode::Whitespace)?.to_string();
    let destination_pattern = args
        .required("destination-pattern", Mode::ToEndOfLine)?
        .to_string();
    Ok(StepKind::FormatUnixTimestamp {
        column,
        destination_pattern,
    })
}

fn parse_mask_number(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let column = args.required("column", Mode::Whitespace)?.to_string();
    let pattern = args.required("mask-pattern", Mode::Whitespace)?.to_string();
    Ok(StepKind::MaskNumber { column, pattern })
}

fn parse_mask_shuffle(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let column = args.required("column", Mode::Whitespace)?.to_string();
    Ok(StepKind::MaskShuffle { column })
}

fn parse_filter_row_if_matched(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let column = args.required("column", Mode::Whitespace)?.to_string();
    let raw = args.required("regex", Mode::ToEndOfLine)?;
    // A /…/-wrapped pattern is unwrapped; the slashes are DSL syntax.
    let pattern = raw
        .strip_prefix('/')
        .and_then(|p| p.strip_suffix('/'))
        .filter(|p| !p.is_empty())
        .unwrap_or(raw)
        .to_string();
    compile_check(&pattern, args.line)?;
    Ok(StepKind::FilterRowIfMatched { column, pattern })
}

fn parse_filter_row_if_true(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let condition = args.required("condition", Mode::ToEndOfLine)?.to_string();
    expr::parse(&condition).map_err(|source| ParseError::BadExpression {
        line: args.line,
        source,
    })?;
    Ok(StepKind::FilterRowIfTrue { condition })
}

fn parse_sed_directive(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let column = args.required("column", Mode::Whitespace)?.to_string();
    let expression = args.required("expression", Mode::ToEndOfLine)?;
    let substitution = parse_sed(expression).map_err(|message| ParseError::BadArgument {
        what: "substitution",
        value: expression.to_string(),
        message,
        line: args.line,
    })?;
    compile_check(&substitution.pattern, args.line)?;
    Ok(StepKind::Sed {
        column,
        substitution,
    })
}

fn parse_quantize(args: &mut Args<'_>) -> ParseResult<StepKind> {
    let source = args.required("source", Mode::Whitespace)?.to_string();
    let destination = args.required("destination", Mode::Whitespace)?.to_string();
    let spec = args.required("ranges", Mode::ToEndOfLine)?;
    let buckets = parse_buckets(spec).map_err(|message| ParseError::BadArgument {
        what: "quantization",
        value: spec.to_string(),
        message,
        line: args.line,
    })?;
    Ok(StepKind::Quantize {
        source,
        destination,
        buckets,
    })
}

// =============================================================================
// Shared argument helpers
// =============================================================================

/// Single-character delimiter argument with backslash-escape support.
fn parse_delimiter(args: &mut Args<'_>, field: &str) -> ParseResult<char> {
    let raw = args.required(field, Mode::Whitespace)?;
    let resolved = if raw.starts_with('\\') {
        unescape(raw).map_err(|_| ParseError::BadDelimiter {
            value: raw.to_string(),
            line: args.line,
        })?
    } else {
        raw.to_string()
    };
    resolved.chars().next().ok_or_else(|| ParseError::BadDelimiter {
        value: raw.to_string(),
        line: args.line,
    })
}

fn parse_number(args: &mut Args<'_>, field: &str) -> ParseResult<usize> {
    let raw = args.required(field, Mode::Whitespace)?;
    raw.parse::<usize>().map_err(|_| ParseError::BadNumber {
        field: field.to_string(),
        value: raw.to_string(),
        line: args.line,
    })
}

fn parse_regex(args: &mut Args<'_>, field: &str) -> ParseResult<String> {
    let pattern = args.required(field, Mode::ToEndOfLine)?.to_string();
    compile_check(&pattern, args.line)?;
    Ok(pattern)
}

fn compile_check(pattern: &str, line: usize) -> ParseResult<()> {
    Regex::new(pattern).map_err(|source| ParseError::BadRegex {
        pattern: pattern.to_string(),
        line,
        source,
    })?;
    Ok(())
}
