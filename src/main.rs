//! Rowmill CLI - apply transformation recipes to tabular data
//!
//! # Main Commands
//!
//! ```bash
//! rowmill apply recipe.txt input.csv      # Transform a CSV file
//! rowmill check recipe.txt                # Validate a recipe
//! rowmill parse input.csv                 # Just decode CSV to JSON rows
//! rowmill directives                      # List available directives
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use rowmill::ingest::{rows_from_csv, rows_from_csv_auto, rows_from_json, rows_from_lines};
use rowmill::logs::{log_error, log_info, log_success};
use rowmill::{Recipe, Registry, Row, STARTING_COLUMN};

#[derive(Parser)]
#[command(name = "rowmill")]
#[command(about = "Apply transformation recipes to tabular data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a recipe and run it over an input file
    Apply {
        /// Recipe file (one directive per line)
        recipe: PathBuf,

        /// Input file (.csv, .json, or raw lines with --lines)
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Treat the input as raw lines, one row per line in the
        /// starting column
        #[arg(long)]
        lines: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a recipe without running it
    Check {
        /// Recipe file
        recipe: PathBuf,
    },

    /// Decode a CSV file and output JSON rows
    Parse {
        /// Input CSV file
        input: PathBuf,

        /// CSV delimiter (auto-detect if not specified)
        #[arg(short, long)]
        delimiter: Option<char>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List available directives
    Directives,
}

fn main() {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Apply {
            recipe,
            input,
            delimiter,
            lines,
            output,
        } => cmd_apply(&recipe, &input, delimiter, lines, output.as_deref()),
        Commands::Check { recipe } => cmd_check(&recipe),
        Commands::Parse {
            input,
            delimiter,
            output,
        } => cmd_parse(&input, delimiter, output.as_deref()),
        Commands::Directives => cmd_directives(),
    };

    if let Err(e) = result {
        log_error(format!("{}", e));
        process::exit(1);
    }
}

fn cmd_apply(
    recipe_path: &Path,
    input: &Path,
    delimiter: Option<char>,
    lines: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    log_info(format!("Reading recipe: {}", recipe_path.display()));
    let recipe_text = fs::read_to_string(recipe_path)?;
    let recipe = Recipe::parse(&recipe_text)?;
    log_success(format!("{} step(s)", recipe.len()));

    let rows = load_rows(input, delimiter, lines)?;
    log_success(format!("Read {} row(s)", rows.len()));

    let transformed = recipe.run(rows)?;
    log_success(format!("Transformed into {} row(s)", transformed.len()));

    write_rows(&transformed, output)?;
    Ok(())
}

fn cmd_check(recipe_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let recipe_text = fs::read_to_string(recipe_path)?;
    match Recipe::parse(&recipe_text) {
        Ok(recipe) => {
            log_success(format!(
                "{}: {} step(s), no problems found",
                recipe_path.display(),
                recipe.len()
            ));
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

fn cmd_parse(
    input: &Path,
    delimiter: Option<char>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    log_info(format!("Decoding CSV: {}", input.display()));
    let bytes = fs::read(input)?;
    let result = match delimiter {
        Some(d) => {
            let content = String::from_utf8_lossy(&bytes).to_string();
            rows_from_csv(&content, d, "utf-8".to_string())?
        }
        None => rows_from_csv_auto(&bytes)?,
    };

    log_info(format!("Encoding: {}", result.encoding));
    log_info(format!(
        "Delimiter: '{}'",
        format_delimiter(result.delimiter)
    ));
    log_info(format!("Columns: {}", result.headers.join(", ")));
    log_success(format!("Decoded {} row(s)", result.rows.len()));

    write_rows(&result.rows, output)?;
    Ok(())
}

fn cmd_directives() -> Result<(), Box<dyn std::error::Error>> {
    let registry = Registry::standard();
    println!("Available directives:\n");
    for spec in registry.specs() {
        println!("  {:24} {}", spec.name, spec.usage);
    }
    Ok(())
}

fn load_rows(
    input: &Path,
    delimiter: Option<char>,
    lines: bool,
) -> Result<Vec<Row>, Box<dyn std::error::Error>> {
    if lines {
        let content = fs::read_to_string(input)?;
        return Ok(rows_from_lines(&content, STARTING_COLUMN));
    }

    let is_json = input
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        let content = fs::read_to_string(input)?;
        Ok(rows_from_json(&content)?)
    } else {
        let bytes = fs::read(input)?;
        let result = match delimiter {
            Some(d) => {
                let content = String::from_utf8_lossy(&bytes).to_string();
                rows_from_csv(&content, d, "utf-8".to_string())?
            }
            None => rows_from_csv_auto(&bytes)?,
        };
        log_info(format!(
            "Encoding: {}, delimiter: '{}'",
            result.encoding,
            format_delimiter(result.delimiter)
        ));
        Ok(result.rows)
    }
}

fn write_rows(rows: &[Row], output: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let json: Vec<serde_json::Value> = rows.iter().map(Row::to_json).collect();
    let rendered = serde_json::to_string_pretty(&json)?;
    match output {
        Some(path) => {
            fs::write(path, rendered)?;
            log_success(format!("Output written to: {}", path.display()));
        }
        None => println!("{}", rendered),
    }
    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}
