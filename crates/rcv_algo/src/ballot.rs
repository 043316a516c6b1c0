//! A normalized ballot plus the state the engine keeps on it between rounds.

use std::collections::BTreeMap;
use std::fmt;

use smol_str::SmolStr;

use rcv_core::{BallotId, CandidateId, Decimal, SliceKind, VoteArithmetic};

use crate::ranking::{Rank, RankingSet};

/// Why a ballot stopped counting toward any candidate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InactiveReason {
    /// No rankings at all.
    Undervote,
    Overvote,
    SkippedRanking,
    RepeatedRanking,
    /// Every remaining ranked candidate is out.
    ExhaustedChoice,
    /// Surplus left on a ballot after the last seat was filled.
    FinalRoundSurplus,
}

impl InactiveReason {
    pub const ALL: [InactiveReason; 6] = [
        InactiveReason::Undervote,
        InactiveReason::Overvote,
        InactiveReason::SkippedRanking,
        InactiveReason::RepeatedRanking,
        InactiveReason::ExhaustedChoice,
        InactiveReason::FinalRoundSurplus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InactiveReason::Undervote => "undervote",
            InactiveReason::Overvote => "overvote",
            InactiveReason::SkippedRanking => "skipped_ranking",
            InactiveReason::RepeatedRanking => "repeated_ranking",
            InactiveReason::ExhaustedChoice => "exhausted_choice",
            InactiveReason::FinalRoundSurplus => "final_round_surplus",
        }
    }
}

impl fmt::Display for InactiveReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BallotStatus {
    Active,
    Inactive(InactiveReason),
}

#[derive(Clone, Debug)]
pub struct Ballot {
    id: Option<BallotId>,
    rankings: RankingSet,
    slices: BTreeMap<SliceKind, SmolStr>,
    recipient: Option<CandidateId>,
    last_rank: Rank,
    status: BallotStatus,
    winner_allocations: BTreeMap<CandidateId, Decimal>,
}

impl Ballot {
    pub fn new(rankings: RankingSet) -> Self {
        Self {
            id: None,
            rankings,
            slices: BTreeMap::new(),
            recipient: None,
            last_rank: 0,
            status: BallotStatus::Active,
            winner_allocations: BTreeMap::new(),
        }
    }

    /// Shorthand for a ballot ranking `choices` one per rank.
    pub fn ranked<I>(choices: I) -> Self
    where
        I: IntoIterator<Item = CandidateId>,
    {
        Self::new(RankingSet::from_ordered(choices))
    }

    pub fn with_id(mut self, id: BallotId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_slice(mut self, kind: SliceKind, key: &str) -> Self {
        self.slices.insert(kind, SmolStr::new(key));
        self
    }

    pub fn id(&self) -> Option<&BallotId> {
        self.id.as_ref()
    }

    pub fn rankings(&self) -> &RankingSet {
        &self.rankings
    }

    pub fn slice_key(&self, kind: SliceKind) -> Option<&str> {
        self.slices.get(&kind).map(SmolStr::as_str)
    }

    pub fn current_recipient(&self) -> Option<&CandidateId> {
        self.recipient.as_ref()
    }

    /// Highest rank already considered by the ballot walk (0 before round 1).
    pub fn last_rank_considered(&self) -> Rank {
        self.last_rank
    }

    pub fn status(&self) -> BallotStatus {
        self.status
    }

    pub fn is_active(&self) -> bool {
        self.status == BallotStatus::Active
    }

    pub fn winner_allocations(&self) -> &BTreeMap<CandidateId, Decimal> {
        &self.winner_allocations
    }

    /// Share of this ballot not yet retained by any winner: `1 − Σ allocations`.
    pub fn fractional_transfer_value(&self) -> Decimal {
        let allocated: Decimal = self.winner_allocations.values().sum();
        &Decimal::one() - &allocated
    }

    /// Apply a winner's surplus fraction: the ballot keeps
    /// `ftv × surplus_fraction` (rounded down) transferable, and the winner
    /// retains the rest.
    pub fn record_winner(
        &mut self,
        winner: CandidateId,
        surplus_fraction: &Decimal,
        arith: &VoteArithmetic,
    ) {
        let ftv = self.fractional_transfer_value();
        let transfer = arith.multiply(&ftv, surplus_fraction);
        self.winner_allocations.insert(winner, &ftv - &transfer);
    }

    pub(crate) fn assign(&mut self, candidate: CandidateId, rank: Rank) {
        self.recipient = Some(candidate);
        self.last_rank = rank;
    }

    pub(crate) fn exhaust(&mut self, reason: InactiveReason, rank: Rank) {
        self.recipient = None;
        self.last_rank = rank;
        self.status = BallotStatus::Inactive(reason);
    }
}
