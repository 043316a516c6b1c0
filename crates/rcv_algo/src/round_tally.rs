//! One round's vote totals, with a lock protocol.
//!
//! `Building → lock() → Locked → unlock_for_surplus_adjustment() → Adjusting → relock() → Locked`.
//! Misuse of the protocol is a programming error and panics.

use std::collections::BTreeMap;

use rcv_core::{CandidateId, Decimal};

use crate::ballot::InactiveReason;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Building,
    Locked,
    Adjusting,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RoundTally {
    round: u32,
    phase: Phase,
    candidate_tallies: BTreeMap<CandidateId, Decimal>,
    inactive: BTreeMap<InactiveReason, Decimal>,
    active_sum: Decimal,
    inactive_sum: Decimal,
    threshold: Option<Decimal>,
}

impl RoundTally {
    /// Start a round with a zero tally for each listed candidate.
    pub fn new<I>(round: u32, candidates: I) -> Self
    where
        I: IntoIterator<Item = CandidateId>,
    {
        Self {
            round,
            phase: Phase::Building,
            candidate_tallies: candidates.into_iter().map(|c| (c, Decimal::zero())).collect(),
            inactive: InactiveReason::ALL.iter().map(|r| (*r, Decimal::zero())).collect(),
            active_sum: Decimal::zero(),
            inactive_sum: Decimal::zero(),
            threshold: None,
        }
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    fn assert_building(&self, op: &str) {
        assert!(self.phase == Phase::Building, "RoundTally::{op} called after lock (round {})", self.round);
    }

    fn assert_readable(&self, op: &str) {
        assert!(self.phase != Phase::Building, "RoundTally::{op} called before lock (round {})", self.round);
    }

    pub fn add_to_candidate_tally(&mut self, candidate: &CandidateId, amount: &Decimal) {
        self.assert_building("add_to_candidate_tally");
        *self.candidate_tallies.entry(candidate.clone()).or_default() += amount;
    }

    pub fn add_inactive_ballot(&mut self, reason: InactiveReason, amount: &Decimal) {
        self.assert_building("add_inactive_ballot");
        *self.inactive.entry(reason).or_default() += amount;
    }

    /// Freeze the totals: active = Σ candidate tallies, inactive = Σ buckets.
    pub fn lock(&mut self) {
        self.assert_building("lock");
        self.active_sum = self.candidate_tallies.values().sum();
        self.inactive_sum = self.inactive.values().sum();
        self.phase = Phase::Locked;
    }

    pub fn is_locked(&self) -> bool {
        self.phase == Phase::Locked
    }

    pub fn unlock_for_surplus_adjustment(&mut self) {
        assert!(self.phase == Phase::Locked, "RoundTally::unlock_for_surplus_adjustment requires a locked tally");
        self.phase = Phase::Adjusting;
    }

    /// Overwrite one candidate's total. Active/inactive sums are not recomputed.
    pub fn set_candidate_tally(&mut self, candidate: &CandidateId, amount: Decimal) {
        assert!(self.phase == Phase::Adjusting, "RoundTally::set_candidate_tally outside the adjustment window");
        self.candidate_tallies.insert(candidate.clone(), amount);
    }

    pub fn relock(&mut self) {
        assert!(self.phase == Phase::Adjusting, "RoundTally::relock without unlock");
        self.phase = Phase::Locked;
    }

    /// Write-once; only after lock.
    pub fn set_winning_threshold(&mut self, threshold: Decimal) {
        self.assert_readable("set_winning_threshold");
        assert!(self.threshold.is_none(), "winning threshold already set for round {}", self.round);
        self.threshold = Some(threshold);
    }

    pub fn winning_threshold(&self) -> &Decimal {
        self.assert_readable("winning_threshold");
        match &self.threshold {
            Some(t) => t,
            None => panic!("winning threshold not set for round {}", self.round),
        }
    }

    /// Zero for candidates not in this round.
    pub fn candidate_tally(&self, candidate: &CandidateId) -> Decimal {
        self.assert_readable("candidate_tally");
        self.candidate_tallies.get(candidate).cloned().unwrap_or_default()
    }

    pub fn candidate_tallies(&self) -> &BTreeMap<CandidateId, Decimal> {
        self.assert_readable("candidate_tallies");
        &self.candidate_tallies
    }

    pub fn active_ballot_sum(&self) -> &Decimal {
        self.assert_readable("active_ballot_sum");
        &self.active_sum
    }

    pub fn inactive_ballot_sum(&self) -> &Decimal {
        self.assert_readable("inactive_ballot_sum");
        &self.inactive_sum
    }

    pub fn inactive_by_reason(&self) -> &BTreeMap<InactiveReason, Decimal> {
        self.assert_readable("inactive_by_reason");
        &self.inactive
    }

    /// Descending by tally, ties by id; `last` (the write-in sentinel) always at the end.
    pub fn sorted_candidates_by_tally(&self, last: Option<&CandidateId>) -> Vec<(CandidateId, Decimal)> {
        self.assert_readable("sorted_candidates_by_tally");
        let mut out: Vec<(CandidateId, Decimal)> =
            self.candidate_tallies.iter().map(|(c, t)| (c.clone(), t.clone())).collect();
        out.sort_by(|(ca, ta), (cb, tb)| {
            let a_last = Some(ca) == last;
            let b_last = Some(cb) == last;
            a_last.cmp(&b_last).then_with(|| tb.cmp(ta)).then_with(|| ca.cmp(cb))
        });
        out
    }

    /// Group the candidates accepted by `include` by tally, ascending.
    pub fn tally_to_candidates<F>(&self, include: F) -> BTreeMap<Decimal, Vec<CandidateId>>
    where
        F: Fn(&CandidateId) -> bool,
    {
        self.assert_readable("tally_to_candidates");
        let mut out: BTreeMap<Decimal, Vec<CandidateId>> = BTreeMap::new();
        for (cand, tally) in &self.candidate_tallies {
            if include(cand) {
                out.entry(tally.clone()).or_default().push(cand.clone());
            }
        }
        out
    }
}
