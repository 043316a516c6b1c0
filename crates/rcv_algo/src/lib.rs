//! rcv_algo — Ballot model, per-round tallies, tie resolution, and the
//! round-by-round tabulation engine.
//!
//! The engine consumes normalized [`Ballot`]s and validated
//! [`rcv_core::ContestRules`]; it performs no I/O. Progress is reported
//! through `tracing` (round headers at `info`, per-ballot movement at
//! `debug` on the `rcv::audit` target).

#![forbid(unsafe_code)]

pub mod ballot;
pub mod engine;
pub mod errors;
pub mod ledger;
pub mod ranking;
pub mod round_tally;
pub mod sequential;
pub mod tiebreak;

pub use ballot::{Ballot, BallotStatus, InactiveReason};
pub use engine::{
    batch_elimination, tabulate, winning_threshold, BallotSnapshot, CandidateStatus, SliceBooks,
    TabulationEngine, TabulationOutcome,
};
pub use errors::{AbortReason, TabulationError};
pub use ledger::{LedgerNode, TallyLedger};
pub use ranking::{Rank, RankingSet};
pub use round_tally::RoundTally;
pub use sequential::{tabulate_contest, ContestOutcome};
pub use tiebreak::{
    Cancelled, ScriptedOracle, TieBreakOracle, TieBreakRecord, TiePurpose, TiebreakResolver,
};

/// `tracing` target for per-ballot audit events.
pub const AUDIT_TARGET: &str = "rcv::audit";
