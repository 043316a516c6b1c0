//! Ballot walk: decide where a ballot's current value goes this round.
//!
//! `decide` is pure over shared references; the caller applies the
//! [`Decision`] to the ballot afterwards.

use std::collections::{BTreeMap, BTreeSet};

use rcv_core::{CandidateId, ContestRules, OvervoteRule};

use crate::ballot::{Ballot, BallotStatus, InactiveReason};
use crate::engine::CandidateStatus;
use crate::errors::AbortReason;
use crate::ranking::Rank;

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Decision {
    /// Ballot stays where it is (still counting, or already inactive).
    Keep,
    Assign { candidate: CandidateId, rank: Rank },
    Exhaust { reason: InactiveReason, rank: Rank },
    Abort(AbortReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Overvote {
    None,
    Exhaust,
    SkipToNextRank,
}

pub(crate) struct WalkContext<'a> {
    pub rules: &'a ContestRules,
    pub statuses: &'a BTreeMap<CandidateId, CandidateStatus>,
    pub uses_surplus: bool,
    /// Every seat is filled in a surplus contest; leftover value is final-round surplus.
    pub seats_filled: bool,
}

impl WalkContext<'_> {
    /// Continuing candidates, plus winners whose votes are not transferred.
    pub fn is_counting(&self, cand: &CandidateId) -> bool {
        match self.statuses.get(cand) {
            Some(CandidateStatus::Continuing) => true,
            Some(CandidateStatus::Winner) => !self.uses_surplus,
            _ => false,
        }
    }

    fn is_overvote_label(&self, cand: &CandidateId) -> bool {
        self.rules.overvote_label.as_ref() == Some(cand)
    }

    fn overvote_decision(
        &self,
        ballot: &Ballot,
        rank: Rank,
        choices: &BTreeSet<CandidateId>,
    ) -> Result<Overvote, AbortReason> {
        let has_label = choices.iter().any(|c| self.is_overvote_label(c));
        if has_label {
            if choices.len() > 1 {
                return Err(AbortReason::OvervoteLabelMixed { ballot: ballot_name(ballot), rank });
            }
            return match self.rules.overvote_rule {
                OvervoteRule::ExhaustImmediately => Ok(Overvote::Exhaust),
                OvervoteRule::AlwaysSkipToNextRank => Ok(Overvote::SkipToNextRank),
                OvervoteRule::ExhaustIfMultipleContinuing => Err(AbortReason::OvervoteLabelUnsupported {
                    rule: OvervoteRule::ExhaustIfMultipleContinuing.as_token(),
                }),
            };
        }
        if choices.len() <= 1 {
            return Ok(Overvote::None);
        }
        Ok(match self.rules.overvote_rule {
            OvervoteRule::ExhaustImmediately => Overvote::Exhaust,
            OvervoteRule::AlwaysSkipToNextRank => Overvote::SkipToNextRank,
            OvervoteRule::ExhaustIfMultipleContinuing => {
                if choices.iter().filter(|c| self.is_counting(c)).count() > 1 {
                    Overvote::Exhaust
                } else {
                    Overvote::None
                }
            }
        })
    }
}

pub(crate) fn ballot_name(ballot: &Ballot) -> String {
    ballot.id().map_or_else(|| "<unnamed>".to_string(), ToString::to_string)
}

pub(crate) fn decide(ballot: &Ballot, ctx: &WalkContext<'_>) -> Decision {
    if ballot.status() != BallotStatus::Active {
        return Decision::Keep;
    }
    if ballot.rankings().is_empty() {
        return Decision::Exhaust { reason: InactiveReason::Undervote, rank: 0 };
    }
    if let Some(current) = ballot.current_recipient() {
        if ctx.is_counting(current) {
            return Decision::Keep;
        }
    }
    let mut last = ballot.last_rank_considered();
    if ctx.seats_filled {
        return Decision::Exhaust { reason: InactiveReason::FinalRoundSurplus, rank: last };
    }

    let rules = ctx.rules;
    for (rank, choices) in ballot.rankings().iter_after(last) {
        if rules.max_rankings_allowed.is_some_and(|max| rank > max) {
            break;
        }
        if let Some(max_skip) = rules.max_skipped_ranks_allowed {
            if rank - last > max_skip + 1 {
                return Decision::Exhaust { reason: InactiveReason::SkippedRanking, rank };
            }
        }
        last = rank;

        if rules.exhaust_on_duplicate_candidate
            && choices
                .iter()
                .any(|c| !ctx.is_overvote_label(c) && ballot.rankings().marked_before(c, rank))
        {
            return Decision::Exhaust { reason: InactiveReason::RepeatedRanking, rank };
        }

        match ctx.overvote_decision(ballot, rank, choices) {
            Err(reason) => return Decision::Abort(reason),
            Ok(Overvote::Exhaust) => return Decision::Exhaust { reason: InactiveReason::Overvote, rank },
            Ok(Overvote::SkipToNextRank) => continue,
            Ok(Overvote::None) => {}
        }

        if let Some(cand) = choices.iter().find(|c| ctx.is_counting(c)) {
            return Decision::Assign { candidate: cand.clone(), rank };
        }
    }
    Decision::Exhaust { reason: InactiveReason::ExhaustedChoice, rank: last }
}
