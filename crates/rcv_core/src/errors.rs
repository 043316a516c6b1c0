//! Error sets for core-domain parsing and rule validation.

use thiserror::Error;

use crate::ids::CandidateId;

/// Minimal error set for core-domain validation & parsing.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum CoreError {
    #[error("invalid id: {0:?}")]
    InvalidId(String),
    #[error("invalid decimal literal: {0:?}")]
    InvalidDecimal(String),
    #[error("rank must be at least 1")]
    InvalidRank,
    #[error("empty choice set")]
    EmptyChoiceSet,
}

/// Rule combinations rejected before any ballot is counted.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum ConfigError {
    #[error("contest declares no candidates")]
    NoCandidates,
    #[error("candidate {0} is declared more than once")]
    DuplicateCandidate(CandidateId),
    #[error("number of winners must be at least 1")]
    ZeroWinners,
    #[error("{winners} winner(s) requested but only {candidates} candidate(s) can win")]
    TooManyWinners { winners: u32, candidates: usize },
    #[error("election mode {mode} requires exactly one winner")]
    ModeRequiresSingleWinner { mode: &'static str },
    #[error("election mode {mode} requires more than one winner")]
    ModeRequiresMultipleWinners { mode: &'static str },
    #[error("bottoms-up percentage must be in (0, 1], got {0}")]
    PercentageOutOfRange(String),
    #[error("tiebreak mode {mode} requires a random seed")]
    MissingRandomSeed { mode: &'static str },
    #[error("candidate permutation must list every declared candidate exactly once")]
    PermutationMismatch,
    #[error("excluded candidate {0} is not declared")]
    ExcludedNotDeclared(CandidateId),
    #[error("decimal places for vote arithmetic must be at most {max}, got {got}")]
    DecimalPlacesOutOfRange { got: u32, max: u32 },
    #[error("{option} is only valid in single-winner contests")]
    SingleWinnerOnly { option: &'static str },
    #[error("overvote label cannot be combined with the exhaust-if-multiple-continuing rule")]
    OvervoteLabelUnsupportedRule,
    #[error("label {0} collides with a declared candidate or another label")]
    LabelCollision(CandidateId),
    #[error("minimum vote threshold must not be negative")]
    NegativeMinimumThreshold,
    #[error("stop-after-round must be at least 1")]
    StopAfterRoundZero,
    #[error("max rankings allowed must be at least 1")]
    ZeroMaxRankings,
}
