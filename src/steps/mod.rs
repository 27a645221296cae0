//! The step library: compiled directives and their execution dispatch.
//!
//! A [`Step`] is the immutable, parse-time-validated form of one
//! directive line. The directive kinds are a tagged variant
//! ([`StepKind`]) so dispatch stays exhaustive; each variant's runtime
//! behavior lives in a submodule grouped by concern.
//!
//! Every step shares one contract:
//! `execute(row, ctx) → Keep(row) | Skip | Many(rows)`, failing with a
//! [`StepError`](crate::error::StepError) when the row is structurally
//! unsuitable.

pub mod column;
pub mod date;
pub mod filter;
pub mod json;
pub mod parse;
pub mod text;

pub use filter::Bucket;
pub use text::{CharRange, SedExpr};

use crate::error::StepResult;
use crate::executor::RunContext;
use crate::row::Row;

/// Outcome of executing one step on one row.
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// Row survives, possibly transformed.
    Keep(Row),
    /// Row is dropped without error; remaining steps do not see it.
    Skip,
    /// Fan-out: the row became several rows, in emission order.
    Many(Vec<Row>),
}

/// Compiled, validated representation of one directive.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    line: usize,
    text: String,
    kind: StepKind,
}

/// Directive kinds with their parse-time-validated parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum StepKind {
    // Column shape
    Rename { old: String, new: String },
    Drop { column: String },
    Copy { source: String, destination: String, force: bool },
    Swap { first: String, second: String },
    Merge { first: String, second: String, destination: String, separator: String },
    Columns { names: Vec<String> },
    Flatten { columns: Vec<String> },
    FillNullOrEmpty { column: String, value: String },

    // Case / string
    Uppercase { column: String },
    Lowercase { column: String },
    Titlecase { column: String },

    // Slice / split
    IndexSplit { source: String, start: usize, end: usize, destination: String },
    Split { source: String, delimiter: String, first: String, second: String },
    SplitToRows { column: String, pattern: String },
    SplitToColumns { column: String, pattern: String },
    CharacterCut { source: String, destination: String, ranges: Vec<CharRange> },

    // Parsing
    ParseAsCsv { column: String, delimiter: char, skip_empty: bool, drop_source: bool },
    ParseAsJson { column: String, delete_column: bool },
    ParseAsFixedLength { column: String, widths: Vec<usize>, padding: String },
    ParseAsXml { column: String },
    JsonPath { source: String, destination: String, path: String },

    // Dates
    FormatDate { column: String, source_pattern: String, destination_pattern: String },
    FormatUnixTimestamp { column: String, destination_pattern: String },

    // Masking
    MaskNumber { column: String, pattern: String },
    MaskShuffle { column: String },

    // Expression / filter
    SetColumn { column: String, expression: String },
    FilterRowIfMatched { column: String, pattern: String },
    FilterRowIfTrue { condition: String },
    Sed { column: String, substitution: SedExpr },
    Quantize { source: String, destination: String, buckets: Vec<Bucket> },
}

impl Step {
    pub fn new(line: usize, text: impl Into<String>, kind: StepKind) -> Self {
        Self {
            line,
            text: text.into(),
            kind,
        }
    }

    /// 1-based line of the directive in its recipe.
    pub fn line(&self) -> usize {
        self.line
    }

    /// Original directive text.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn kind(&self) -> &StepKind {
        &self.kind
    }

    /// Execute this step on one row.
    pub fn execute(&self, row: Row, ctx: &mut RunContext) -> StepResult<StepOutcome> {
        match &self.kind {
            StepKind::Rename { old, new } => column::rename(row, old, new),
            StepKind::Drop { column } => column::drop(row, column),
            StepKind::Copy { source, destination, force } => {
                column::copy(row, source, destination, *force)
            }
            StepKind::Swap { first, second } => column::swap(row, first, second),
            StepKind::Merge { first, second, destination, separator } => {
                column::merge(row, first, second, destination, separator)
            }
            StepKind::Columns { names } => column::columns(row, names),
            StepKind::Flatten { columns } => column::flatten(row, columns),
            StepKind::FillNullOrEmpty { column, value } => {
                column::fill_null_or_empty(row, column, value)
            }

            StepKind::Uppercase { column } => text::uppercase(row, column),
            StepKind::Lowercase { column } => text::lowercase(row, column),
            StepKind::Titlecase { column } => text::titlecase(row, column),

            StepKind::IndexSplit { source, start, end, destination } => {
                text::index_split(row, source, *start, *end, destination)
            }
            StepKind::Split { source, delimiter, first, second } => {
                text::split(row, source, delimiter, first, second)
            }
            StepKind::SplitToRows { column, pattern } => {
                parse::split_to_rows(row, column, pattern, ctx)
            }
            StepKind::SplitToColumns { column, pattern } => {
                parse::split_to_columns(row, column, pattern, ctx)
            }
            StepKind::CharacterCut { source, destination, ranges } => {
                text::character_cut(row, source, destination, ranges)
            }

            StepKind::ParseAsCsv { column, delimiter, skip_empty, drop_source } => {
                parse::parse_as_csv(row, column, *delimiter, *skip_empty, *drop_source)
            }
            StepKind::ParseAsJson { column, delete_column } => {
                json::parse_as_json(row, column, *delete_column)
            }
            StepKind::ParseAsFixedLength { column, widths, padding } => {
                parse::parse_as_fixed_length(row, column, widths, padding)
            }
            StepKind::ParseAsXml { column } => json::parse_as_xml(row, column),
            StepKind::JsonPath { source, destination, path } => {
                json::json_path(row, source, destination, path)
            }

            StepKind::FormatDate { column, source_pattern, destination_pattern } => {
                date::format_date(row, column, source_pattern, destination_pattern)
            }
            StepKind::FormatUnixTimestamp { column, destination_pattern } => {
                date::format_unix_timestamp(row, column, destination_pattern)
            }

            StepKind::MaskNumber { column, pattern } => text::mask_number(row, column, pattern),
            StepKind::MaskShuffle { column } => text::mask_shuffle(row, column, ctx),

            StepKind::SetColumn { column, expression } => {
                filter::set_column(row, column, expression, ctx)
            }
            StepKind::FilterRowIfMatched { column, pattern } => {
                filter::filter_row_if_matched(row, column, pattern, ctx)
            }
            StepKind::FilterRowIfTrue { condition } => {
                filter::filter_row_if_true(row, condition, ctx)
            }
            StepKind::Sed { column, substitution } => text::sed(row, column, substitution, ctx),
            StepKind::Quantize { source, destination, buckets } => {
                filter::quantize(row, source, destination, buckets)
            }
        }
    }
}
