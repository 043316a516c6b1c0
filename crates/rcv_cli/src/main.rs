// crates/rcv_cli/src/main.rs
//
// rcv-tab: load a contest file → tabulate → print rounds → optional outcome JSON.
// Exit codes are stable for scripts.

mod args;
mod oracle;

mod exitcodes {
    pub const OK: u8 = 0;
    pub const VALIDATION: u8 = 2;
    pub const IO: u8 = 4;
    pub const ABORTED: u8 = 5;
    pub const CANCELLED: u8 = 6;
}

use std::io::{self, Write};
use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use args::{parse_and_validate as parse_cli, Args};
use oracle::ConsoleOracle;
use rcv_algo::{
    tabulate_contest, AbortReason, ContestOutcome, ScriptedOracle, TabulationError, TabulationOutcome,
    TieBreakOracle,
};
use rcv_io::{IoError, LoadOptions};

/// Central error type for CLI → exit-code mapping.
#[derive(Debug)]
enum MainError {
    /// Malformed contest file or rules that do not validate.
    Validation(String),
    /// Read/write/path/limit failures.
    Io(String),
    /// The engine stopped before finishing.
    Aborted(String),
    /// The operator cancelled an interactive tie.
    Cancelled,
}

impl MainError {
    fn exit_code(&self) -> u8 {
        match self {
            MainError::Validation(_) => exitcodes::VALIDATION,
            MainError::Io(_) => exitcodes::IO,
            MainError::Aborted(_) => exitcodes::ABORTED,
            MainError::Cancelled => exitcodes::CANCELLED,
        }
    }

    fn message(&self) -> String {
        match self {
            MainError::Validation(m) => format!("invalid input: {m}"),
            MainError::Io(m) => format!("io: {m}"),
            MainError::Aborted(m) => format!("tabulation aborted: {m}"),
            MainError::Cancelled => "tabulation cancelled at a tie".to_string(),
        }
    }
}

fn main() -> ExitCode {
    let args = match parse_cli() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("rcv-tab: error: {e}");
            return ExitCode::from(exitcodes::VALIDATION);
        }
    };
    init_logging(&args);

    match run_once(&args) {
        Ok(()) => ExitCode::from(exitcodes::OK),
        Err(e) => {
            error!(code = e.exit_code(), "{}", e.message());
            eprintln!("rcv-tab: error: {}", e.message());
            ExitCode::from(e.exit_code())
        }
    }
}

fn init_logging(args: &Args) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter()));
    // A second init (tests) keeps the first subscriber.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).try_init();
}

fn run_once(args: &Args) -> Result<(), MainError> {
    let opts = LoadOptions { seed: args.seed, ..LoadOptions::default() };
    let loaded = rcv_io::load_contest(&args.contest, &opts).map_err(map_io_err)?;

    let outcome = if args.tie_choices.is_empty() {
        let stdin = io::stdin();
        let mut console = ConsoleOracle::new(stdin.lock(), io::stderr());
        tabulate(&loaded, &mut console)?
    } else {
        let mut scripted = ScriptedOracle::new(args.tie_choices.iter().cloned());
        tabulate(&loaded, &mut scripted)?
    };

    print_summary(&outcome, &loaded.digest, args.quiet).map_err(|e| MainError::Io(format!("stdout: {e}")))?;

    if let Some(path) = &args.json {
        let value = rcv_io::render_outcome_json(&outcome, Some(&loaded.digest)).map_err(map_io_err)?;
        rcv_io::write_outcome_json(path, &value).map_err(map_io_err)?;
        info!(path = %path.display(), "outcome written");
    }
    Ok(())
}

fn tabulate(loaded: &rcv_io::LoadedContest, oracle: &mut dyn TieBreakOracle) -> Result<ContestOutcome, MainError> {
    tabulate_contest(&loaded.rules, &loaded.ballots, oracle).map_err(map_tab_err)
}

fn print_summary(outcome: &ContestOutcome, digest: &str, quiet: bool) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if !quiet {
        writeln!(out, "Contest: {} (sha256 {digest})", outcome.contest_name)?;
        let numbered = outcome.passes.len() > 1;
        for (i, pass) in outcome.passes.iter().enumerate() {
            if numbered {
                writeln!(out, "Seat {}", i + 1)?;
            }
            print_pass(&mut out, pass)?;
        }
    }
    let winners: Vec<&str> = outcome.winners.iter().map(|c| c.as_str()).collect();
    writeln!(out, "Winners: {}", winners.join(", "))
}

fn print_pass(out: &mut impl Write, pass: &TabulationOutcome) -> io::Result<()> {
    for tally in &pass.rounds {
        let round = tally.round();
        writeln!(out, "Round {round} (threshold {})", tally.winning_threshold().normalized())?;
        for (cand, votes) in tally.sorted_candidates_by_tally(None) {
            let mark = if pass.elected_round.get(&cand) == Some(&round) {
                "  elected"
            } else if pass.eliminated_round.get(&cand) == Some(&round) {
                "  eliminated"
            } else {
                ""
            };
            writeln!(out, "  {:<24} {}{mark}", cand.as_str(), votes.normalized())?;
        }
        writeln!(out, "  {:<24} {}", "(inactive)", tally.inactive_ballot_sum().normalized())?;
    }
    Ok(())
}

fn map_io_err(e: IoError) -> MainError {
    match e {
        IoError::Json { pointer, msg } => MainError::Validation(format!("json {pointer}: {msg}")),
        IoError::Rules(c) => MainError::Validation(c.to_string()),
        IoError::Path(m) => MainError::Io(format!("path: {m}")),
        IoError::Limit(m) => MainError::Io(format!("limit: {m}")),
    }
}

fn map_tab_err(e: TabulationError) -> MainError {
    match e {
        TabulationError::Cancelled => MainError::Cancelled,
        TabulationError::Aborted(AbortReason::InvalidRules(c)) => MainError::Validation(c.to_string()),
        TabulationError::Aborted(reason) => MainError::Aborted(reason.to_string()),
    }
}
