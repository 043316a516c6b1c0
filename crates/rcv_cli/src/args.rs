// crates/rcv_cli/src/args.rs
//
// Offline CLI argument surface for `rcv-tab`.
// - Inputs are local files only (no scheme://).
// - Seed override: decimal u64 or 0x-hex up to 16 nybbles.
// - Scripted tie choices replace the console prompt.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use clap::{ArgAction, Parser};
use rcv_core::CandidateId;

/// Parsed CLI arguments.
#[derive(Debug, Parser, Clone)]
#[command(
    name = "rcv-tab",
    disable_help_subcommand = true,
    about = "Tabulate a ranked-choice contest from a local contest file"
)]
pub struct Args {
    /// Contest JSON: `{ "rules": {...}, "ballots": [...] }`.
    #[arg(value_name = "CONTEST")]
    pub contest: PathBuf,

    /// Tie RNG seed override. Accepts decimal u64 or 0x-hex (≤16 hex digits).
    #[arg(long, value_parser = parse_seed)]
    pub seed: Option<u64>,

    /// Answer for an interactive tie, in the order ties occur. Repeatable.
    /// When given, the console is never prompted.
    #[arg(long = "tie-choice", value_name = "CANDIDATE", value_parser = parse_candidate)]
    pub tie_choices: Vec<CandidateId>,

    /// Write the outcome as JSON to this path.
    #[arg(long, value_name = "PATH")]
    pub json: Option<PathBuf>,

    /// Only print the winners; log errors only.
    #[arg(long, short = 'q', conflicts_with = "verbose")]
    pub quiet: bool,

    /// More log output (-v info, -vv per-ballot audit).
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}

/// Errors surfaced by argument validation. Messages are short and stable.
#[derive(Debug)]
pub enum CliError {
    NonLocalPath(String),
    NotFound(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::NonLocalPath(p) => write!(f, "path must be a local file (no scheme): {p}"),
            CliError::NotFound(p) => write!(f, "file not found: {p}"),
        }
    }
}

impl std::error::Error for CliError {}

/// Entry point used by main.rs.
pub fn parse_and_validate() -> Result<Args, CliError> {
    validate(Args::parse())
}

pub fn validate(args: Args) -> Result<Args, CliError> {
    ensure_local_path(&args.contest)?;
    if let Some(out) = &args.json {
        ensure_local_path(out)?;
    }
    let is_file = fs::metadata(&args.contest).map(|m| m.is_file()).unwrap_or(false);
    if !is_file {
        return Err(CliError::NotFound(args.contest.display().to_string()));
    }
    Ok(args)
}

/// Seed parser: decimal u64 or 0x-hex (1..=16 nybbles).
pub fn parse_seed(s: &str) -> Result<u64, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty seed".into());
    }
    if let Some(rest) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        if rest.is_empty() || rest.len() > 16 || !rest.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err("hex seed must be 1..16 hex digits".into());
        }
        u64::from_str_radix(rest, 16).map_err(|_| "hex seed out of range".into())
    } else {
        s.parse::<u64>().map_err(|_| "decimal seed must be a valid u64".into())
    }
}

fn parse_candidate(s: &str) -> Result<CandidateId, String> {
    CandidateId::new(s).map_err(|e| e.to_string())
}

#[inline]
fn has_scheme(s: &str) -> bool {
    let lower = s.trim().to_ascii_lowercase();
    lower.contains("://") || lower.starts_with("http:") || lower.starts_with("https:") || lower.starts_with("file:")
}

#[inline]
fn ensure_local_path(p: &Path) -> Result<(), CliError> {
    match p.to_str() {
        Some(s) if has_scheme(s) => Err(CliError::NonLocalPath(s.to_string())),
        _ => Ok(()),
    }
}
