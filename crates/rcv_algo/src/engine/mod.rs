//! Round-by-round tabulation engine.
//!
//! Each round: tally ballots against counting candidates, set the winning
//! threshold, look for winners, otherwise eliminate, and (in surplus
//! contests) transfer newly elected winners' surplus fractionally. The loop
//! ends per the configured election mode.

mod elimination;
mod surplus;
mod tally;
mod threshold;
mod walk;
mod winners;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tracing::{info, warn};

use rcv_core::{BallotId, CandidateId, ContestRules, Decimal, Slice, VoteArithmetic};

use crate::ballot::{Ballot, BallotStatus};
use crate::errors::{AbortReason, TabulationError};
use crate::ledger::TallyLedger;
use crate::round_tally::RoundTally;
use crate::tiebreak::{TieBreakOracle, TieBreakRecord, TiebreakResolver};

pub use elimination::batch_elimination;
pub use threshold::winning_threshold;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CandidateStatus {
    Continuing,
    Winner,
    Eliminated,
    Excluded,
    /// The explicit overvote label; never a vote recipient.
    Invalid,
}

impl fmt::Display for CandidateStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CandidateStatus::Continuing => "continuing",
            CandidateStatus::Winner => "winner",
            CandidateStatus::Eliminated => "eliminated",
            CandidateStatus::Excluded => "excluded",
            CandidateStatus::Invalid => "invalid",
        })
    }
}

/// Round history and ledger for one reporting slice.
#[derive(Clone, Debug, Default)]
pub struct SliceBooks {
    pub rounds: Vec<RoundTally>,
    pub ledger: TallyLedger,
}

/// One ballot's state right after a round's tally.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BallotSnapshot {
    pub index: usize,
    pub id: Option<BallotId>,
    pub status: BallotStatus,
    pub recipient: Option<CandidateId>,
    pub transfer_value: Decimal,
    pub allocations: BTreeMap<CandidateId, Decimal>,
}

#[derive(Clone, Debug)]
pub struct TabulationOutcome {
    pub contest_name: String,
    /// Locked tallies, round 1 first.
    pub rounds: Vec<RoundTally>,
    /// In election order.
    pub winners: Vec<CandidateId>,
    pub elected_round: BTreeMap<CandidateId, u32>,
    pub eliminated_round: BTreeMap<CandidateId, u32>,
    pub candidate_status: BTreeMap<CandidateId, CandidateStatus>,
    pub ledger: TallyLedger,
    /// Cumulative residual surplus by round (surplus contests only).
    pub residual_surplus: BTreeMap<u32, Decimal>,
    pub slices: BTreeMap<Slice, SliceBooks>,
    pub tiebreaks: Vec<TieBreakRecord>,
    pub candidate_permutation: Vec<CandidateId>,
    pub snapshots: BTreeMap<u32, Vec<BallotSnapshot>>,
}

impl TabulationOutcome {
    pub fn round_count(&self) -> u32 {
        self.rounds.len() as u32
    }

    pub fn final_round(&self) -> Option<&RoundTally> {
        self.rounds.last()
    }
}

pub struct TabulationEngine {
    rules: ContestRules,
    arith: VoteArithmetic,
    uses_surplus: bool,
    ballots: Vec<Ballot>,
    statuses: BTreeMap<CandidateId, CandidateStatus>,
    resolver: TiebreakResolver,
    history: Vec<RoundTally>,
    ledger: TallyLedger,
    residual_surplus: BTreeMap<u32, Decimal>,
    winners: Vec<CandidateId>,
    elected_round: BTreeMap<CandidateId, u32>,
    eliminated_round: BTreeMap<CandidateId, u32>,
    /// Threshold kept from the round that last computed it.
    threshold: Option<Decimal>,
    slices: BTreeMap<Slice, SliceBooks>,
    snapshots: BTreeMap<u32, Vec<BallotSnapshot>>,
}

impl TabulationEngine {
    /// Validate the rules and ballots. Nothing is counted until [`run`](Self::run).
    pub fn new(rules: ContestRules, ballots: Vec<Ballot>) -> Result<Self, TabulationError> {
        rules.validate()?;

        let mut statuses: BTreeMap<CandidateId, CandidateStatus> = BTreeMap::new();
        for cand in &rules.candidates {
            let status = if rules.excluded.contains(cand) {
                CandidateStatus::Excluded
            } else {
                CandidateStatus::Continuing
            };
            statuses.insert(cand.clone(), status);
        }
        if let Some(uwi) = &rules.undeclared_write_in_label {
            statuses.insert(uwi.clone(), CandidateStatus::Continuing);
        }
        if let Some(label) = &rules.overvote_label {
            statuses.insert(label.clone(), CandidateStatus::Invalid);
        }

        for ballot in &ballots {
            if let Some(unknown) = ballot.rankings().candidates().find(|c| !statuses.contains_key(*c)) {
                return Err(AbortReason::UnknownCandidate {
                    ballot: walk::ballot_name(ballot),
                    candidate: unknown.clone(),
                }
                .into());
            }
        }

        let mut slices = BTreeMap::new();
        for kind in &rules.tabulate_by {
            let keys: BTreeSet<&str> = ballots.iter().filter_map(|b| b.slice_key(*kind)).collect();
            if keys.is_empty() {
                return Err(AbortReason::EmptySlice(*kind).into());
            }
            for key in keys {
                slices.insert(Slice::new(*kind, key), SliceBooks::default());
            }
        }

        let resolver = TiebreakResolver::new(&rules);
        Ok(Self {
            arith: rules.arithmetic(),
            uses_surplus: rules.uses_surplus_transfer(),
            rules,
            ballots,
            statuses,
            resolver,
            history: Vec::new(),
            ledger: TallyLedger::new(),
            residual_surplus: BTreeMap::new(),
            winners: Vec::new(),
            elected_round: BTreeMap::new(),
            eliminated_round: BTreeMap::new(),
            threshold: None,
            slices,
            snapshots: BTreeMap::new(),
        })
    }

    pub fn rules(&self) -> &ContestRules {
        &self.rules
    }

    pub fn ballots(&self) -> &[Ballot] {
        &self.ballots
    }

    /// Run rounds until the election mode's termination condition holds.
    pub fn run(mut self, oracle: &mut dyn TieBreakOracle) -> Result<TabulationOutcome, TabulationError> {
        info!(
            contest = %self.rules.contest_name,
            ballots = self.ballots.len(),
            mode = self.rules.winner_election_mode.name(),
            seats = self.rules.number_of_winners,
            "tabulation started"
        );
        if self.ballots.is_empty() {
            warn!(contest = %self.rules.contest_name, "contest has no ballots");
        }

        let mut round = 0u32;
        loop {
            round += 1;
            info!(round, "round started");
            self.tally_round(round)?;

            let elected = self.identify_winners(round, oracle)?;
            for winner in &elected {
                self.declare_winner(winner.clone(), round);
            }

            let mut eliminated_any = false;
            if elected.is_empty() && self.needs_elimination() {
                let losers = self.select_eliminations(round, oracle)?;
                for loser in losers {
                    self.declare_eliminated(loser, round);
                    eliminated_any = true;
                }
            } else if self.uses_surplus {
                for winner in &elected {
                    self.transfer_surplus(winner, round);
                }
            }

            if !self.should_continue(round, !elected.is_empty(), eliminated_any) {
                break;
            }
        }

        info!(
            contest = %self.rules.contest_name,
            rounds = round,
            winners = %self.winners.iter().map(CandidateId::as_str).collect::<Vec<_>>().join(", "),
            "tabulation finished"
        );
        Ok(self.into_outcome())
    }

    fn declare_winner(&mut self, winner: CandidateId, round: u32) {
        info!(round, candidate = %winner, "elected");
        self.statuses.insert(winner.clone(), CandidateStatus::Winner);
        self.elected_round.insert(winner.clone(), round);
        self.winners.push(winner);
    }

    fn declare_eliminated(&mut self, loser: CandidateId, round: u32) {
        info!(round, candidate = %loser, "eliminated");
        self.statuses.insert(loser.clone(), CandidateStatus::Eliminated);
        self.eliminated_round.insert(loser, round);
    }

    fn uwi(&self) -> Option<&CandidateId> {
        self.rules.undeclared_write_in_label.as_ref()
    }

    fn continuing(&self) -> impl Iterator<Item = &CandidateId> + '_ {
        self.statuses
            .iter()
            .filter(|(_, s)| **s == CandidateStatus::Continuing)
            .map(|(c, _)| c)
    }

    /// Continuing candidates plus winners; the undeclared write-in is not a candidate.
    fn remaining_count(&self) -> usize {
        let uwi = self.uwi();
        self.continuing().filter(|c| Some(*c) != uwi).count() + self.winners.len()
    }

    fn seats(&self) -> usize {
        self.rules.number_of_winners as usize
    }

    fn needs_elimination(&self) -> bool {
        if self.rules.bottoms_up_percentage().is_some() {
            return true;
        }
        self.winners.len() < self.seats()
            || (self.rules.continue_until_two_candidates_remain && self.remaining_count() > 2)
    }

    fn should_continue(&self, round: u32, elected_any: bool, eliminated_any: bool) -> bool {
        if self.rules.stop_tabulation_early_after_round == Some(round) {
            info!(round, "stopping early as configured");
            return false;
        }
        if self.rules.bottoms_up_percentage().is_some() {
            return self.winners.is_empty();
        }
        if self.rules.continue_until_two_candidates_remain {
            return self.remaining_count() > 2 || eliminated_any || self.winners.len() < self.seats();
        }
        self.winners.len() < self.seats() || (self.uses_surplus && elected_any)
    }

    fn into_outcome(self) -> TabulationOutcome {
        TabulationOutcome {
            contest_name: self.rules.contest_name.clone(),
            candidate_permutation: self.resolver.candidate_permutation().to_vec(),
            tiebreaks: self.resolver.into_records(),
            rounds: self.history,
            winners: self.winners,
            elected_round: self.elected_round,
            eliminated_round: self.eliminated_round,
            candidate_status: self.statuses,
            ledger: self.ledger,
            residual_surplus: self.residual_surplus,
            slices: self.slices,
            snapshots: self.snapshots,
        }
    }
}

/// Run one tabulation pass with the given rules.
pub fn tabulate(
    rules: ContestRules,
    ballots: Vec<Ballot>,
    oracle: &mut dyn TieBreakOracle,
) -> Result<TabulationOutcome, TabulationError> {
    TabulationEngine::new(rules, ballots)?.run(oracle)
}
