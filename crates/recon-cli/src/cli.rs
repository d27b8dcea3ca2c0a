//! CLI argument definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use clap_verbosity_flag::{Verbosity, WarnLevel};
use colorchoice_clap::Color;

#[derive(Parser)]
#[command(
    name = "recon",
    version,
    about = "Map messy CSV exports onto a canonical schema and clean them",
    long_about = "Map the columns of a tabular export onto a fixed canonical schema,\n\
                  normalize values per field, and propose reversible row-level fixes.\n\
                  Accepted mappings, kept columns and fixes can be promoted to a rule\n\
                  store so later runs reuse them."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for info, -vv for debug, -q for errors only).
    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,

    /// Control ANSI color output (auto, always, never).
    #[command(flatten)]
    pub color: Color,

    /// Explicit log level (overrides -v/-q flags).
    #[arg(long = "log-level", value_enum, global = true)]
    pub log_level: Option<LogLevelArg>,

    /// Log output format (pretty for human, json for machine parsing).
    #[arg(long = "log-format", value_enum, default_value = "pretty", global = true)]
    pub log_format: LogFormatArg,

    /// Write logs to a file instead of stderr.
    #[arg(long = "log-file", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    /// Allow cell values in trace-level logs.
    #[arg(long = "log-data", global = true)]
    pub log_data: bool,

    /// Configuration file (TOML).
    #[arg(long = "config", value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Rule store holding learned mappings, kept columns, defaults and cleaning rules.
    #[arg(
        long = "rules",
        value_name = "PATH",
        default_value = "mapping_rules.json",
        global = true
    )]
    pub rules: PathBuf,

    /// Canonical schema CSV (canonical_name,description[,kind]).
    #[arg(long = "schema", value_name = "PATH", global = true)]
    pub schema: Option<PathBuf>,

    /// Extra header variations as a JSON object of field -> [variation].
    #[arg(long = "variations", value_name = "PATH", global = true)]
    pub variations: Option<PathBuf>,

    /// Minimum heuristic confidence accepted without the fallback.
    #[arg(long = "threshold", value_name = "0..1", global = true)]
    pub threshold: Option<f32>,

    /// External program classifying low-confidence headers.
    #[arg(long = "fallback-command", value_name = "PROGRAM", global = true)]
    pub fallback_command: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// List the canonical schema.
    Fields,

    /// Show mapping suggestions for an input file.
    Map(MapArgs),

    /// Map, clean and fix an input file.
    Clean(CleanArgs),

    /// Promote a column mapping for future runs.
    Learn(LearnArgs),

    /// Keep a non-canonical column in future runs.
    Keep(KeepArgs),

    /// Save a default-value rule for a column.
    Default(DefaultArgs),

    /// Show the rule store.
    Rules,
}

#[derive(Args)]
pub struct MapArgs {
    /// Input CSV file.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,
}

#[derive(Args)]
pub struct CleanArgs {
    /// Input CSV file.
    #[arg(value_name = "INPUT")]
    pub input: PathBuf,

    /// Cleaned output (default: <INPUT>_cleaned.csv).
    #[arg(long = "output", short = 'o', value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Also write every canonical field, unmapped ones left missing.
    #[arg(long = "complete-output", value_name = "PATH")]
    pub complete_output: Option<PathBuf>,

    /// Map a source column to a field, overriding suggestions.
    #[arg(long = "map", value_name = "SRC=FIELD", value_parser = parse_assignment)]
    pub map: Vec<(String, String)>,

    /// Keep a source column verbatim, optionally renamed.
    #[arg(long = "keep", value_name = "COL[=NAME]", value_parser = parse_keep)]
    pub keep: Vec<(String, Option<String>)>,

    /// Apply every detected fix.
    #[arg(long = "apply-fixes")]
    pub apply_fixes: bool,

    /// Save detected fixes as cleaning rules.
    #[arg(long = "promote-fixes")]
    pub promote_fixes: bool,

    /// Report without writing output files.
    #[arg(long = "dry-run")]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct LearnArgs {
    /// Source column header.
    pub source: String,

    /// Canonical field it maps to.
    pub field: String,

    #[arg(long = "confidence", default_value_t = 1.0)]
    pub confidence: f32,
}

#[derive(Args)]
pub struct KeepArgs {
    /// Source column header.
    pub column: String,

    /// Output name (default: the column header).
    #[arg(long = "as", value_name = "NAME")]
    pub name: Option<String>,
}

#[derive(Args)]
pub struct DefaultArgs {
    /// Output column the default applies to.
    pub column: String,

    /// Constant fill value.
    #[arg(long = "value", required_unless_present = "current_date", conflicts_with = "current_date")]
    pub value: Option<String>,

    /// Fill with the date of each run.
    #[arg(long = "current-date")]
    pub current_date: bool,
}

/// CLI log level choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogLevelArg {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// CLI log format choices.
#[derive(Clone, Copy, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Compact,
    Json,
}

fn parse_assignment(value: &str) -> Result<(String, String), String> {
    let (source, field) = value
        .rsplit_once('=')
        .ok_or_else(|| format!("expected SRC=FIELD, got '{value}'"))?;
    let (source, field) = (source.trim(), field.trim());
    if source.is_empty() || field.is_empty() {
        return Err(format!("expected SRC=FIELD, got '{value}'"));
    }
    Ok((source.to_string(), field.to_string()))
}

fn parse_keep(value: &str) -> Result<(String, Option<String>), String> {
    match value.rsplit_once('=') {
        Some((column, name)) if !column.trim().is_empty() && !name.trim().is_empty() => {
            Ok((column.trim().to_string(), Some(name.trim().to_string())))
        }
        Some(_) => Err(format!("expected COL[=NAME], got '{value}'")),
        None if value.trim().is_empty() => Err("column name is empty".to_string()),
        None => Ok((value.trim().to_string(), None)),
    }
}
