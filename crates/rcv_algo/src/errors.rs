//! Tabulation errors: structured aborts versus operator cancellation.

use thiserror::Error;

use rcv_core::{CandidateId, ConfigError, SliceKind};

use crate::tiebreak::Cancelled;

/// Why a tabulation stopped without producing a result.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum AbortReason {
    #[error("invalid contest rules: {0}")]
    InvalidRules(#[from] ConfigError),
    #[error("tabulation by {0} is enabled but no ballot carries a {0} key")]
    EmptySlice(SliceKind),
    #[error("ballot {ballot} ranks undeclared candidate {candidate}")]
    UnknownCandidate { ballot: String, candidate: CandidateId },
    #[error("round {round}: every continuing candidate is below the minimum vote threshold")]
    AllCandidatesBelowMinimum { round: u32 },
    #[error("round {round}: no candidate can be eliminated")]
    NoEliminationCandidate { round: u32 },
    #[error("ballot {ballot} combines the overvote label with other candidates at rank {rank}")]
    OvervoteLabelMixed { ballot: String, rank: u32 },
    #[error("the overvote label cannot be used with rule {rule}")]
    OvervoteLabelUnsupported { rule: &'static str },
    #[error("tie choice {choice} is not among the tied candidates")]
    InvalidTieChoice { choice: CandidateId },
    #[error("sequential pass for seat {seat} elected nobody")]
    SequentialPassWithoutWinner { seat: u32 },
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum TabulationError {
    #[error("tabulation aborted: {0}")]
    Aborted(#[from] AbortReason),
    #[error("tabulation cancelled by operator")]
    Cancelled,
}

impl From<Cancelled> for TabulationError {
    fn from(_: Cancelled) -> Self {
        TabulationError::Cancelled
    }
}

impl From<ConfigError> for TabulationError {
    fn from(e: ConfigError) -> Self {
        TabulationError::Aborted(AbortReason::InvalidRules(e))
    }
}
