//! Shared fixtures for engine integration tests.
#![allow(dead_code)]

use rcv_algo::{Ballot, RoundTally, ScriptedOracle, TabulationError, TabulationOutcome};
use rcv_core::{CandidateId, ContestRules, Decimal};

pub fn c(s: &str) -> CandidateId {
    s.parse().unwrap()
}

pub fn ids(names: &[&str]) -> Vec<CandidateId> {
    names.iter().map(|n| c(n)).collect()
}

pub fn d(s: &str) -> Decimal {
    s.parse().unwrap()
}

/// `count` copies of a ballot ranking `choices` one per rank.
pub fn ballots(groups: &[(usize, &[&str])]) -> Vec<Ballot> {
    groups
        .iter()
        .flat_map(|(count, choices)| std::iter::repeat_with(move || Ballot::ranked(ids(choices))).take(*count))
        .collect()
}

pub fn rules(candidates: &[&str]) -> ContestRules {
    ContestRules::new("test contest", ids(candidates))
}

pub fn run(rules: ContestRules, ballots: Vec<Ballot>) -> Result<TabulationOutcome, TabulationError> {
    rcv_algo::tabulate(rules, ballots, &mut ScriptedOracle::empty())
}

pub fn tally_of(round: &RoundTally, cand: &str) -> Decimal {
    round.candidate_tally(&c(cand))
}

pub fn names(cands: &[CandidateId]) -> Vec<&str> {
    cands.iter().map(CandidateId::as_str).collect()
}

/// Σ shown candidate tallies + inactive buckets + residual surplus for every round.
pub fn round_totals(outcome: &TabulationOutcome) -> Vec<Decimal> {
    outcome
        .rounds
        .iter()
        .map(|r| {
            let shown: Decimal = r.candidate_tallies().values().sum();
            let residual = outcome.residual_surplus.get(&r.round()).cloned().unwrap_or_default();
            &(&shown + r.inactive_ballot_sum()) + &residual
        })
        .collect()
}
