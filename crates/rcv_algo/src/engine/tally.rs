//! Per-round ballot pass: walk ballots, fill the round's books, lock, set threshold.

use std::collections::BTreeMap;

use tracing::{debug, info};

use rcv_core::{CandidateId, Decimal, Slice};

use crate::ballot::{BallotStatus, InactiveReason};
use crate::engine::walk::{self, Decision, WalkContext};
use crate::engine::{BallotSnapshot, CandidateStatus, TabulationEngine};
use crate::errors::TabulationError;
use crate::ledger::{LedgerNode, TallyLedger};
use crate::round_tally::RoundTally;

/// One ballot's effect on a round's books.
enum Entry {
    Candidate(CandidateId, Decimal),
    Inactive(InactiveReason, Decimal),
    Transfer(LedgerNode, LedgerNode, Decimal),
}

fn post(round: u32, tally: &mut RoundTally, ledger: &mut TallyLedger, entries: &[Entry]) {
    for entry in entries {
        match entry {
            Entry::Candidate(c, v) => tally.add_to_candidate_tally(c, v),
            Entry::Inactive(r, v) => tally.add_inactive_ballot(*r, v),
            Entry::Transfer(from, to, v) => ledger.add(round, from.clone(), to.clone(), v),
        }
    }
}

impl TabulationEngine {
    /// Candidates that get a tally line this round.
    fn tallied_candidates(&self) -> Vec<CandidateId> {
        self.statuses
            .iter()
            .filter(|(_, s)| matches!(s, CandidateStatus::Continuing | CandidateStatus::Winner))
            .map(|(c, _)| c.clone())
            .collect()
    }

    pub(super) fn tally_round(&mut self, round: u32) -> Result<(), TabulationError> {
        let listed = self.tallied_candidates();
        let mut tally = RoundTally::new(round, listed.iter().cloned());
        let mut slice_tallies: BTreeMap<Slice, RoundTally> = self
            .slices
            .keys()
            .map(|s| (s.clone(), RoundTally::new(round, listed.iter().cloned())))
            .collect();

        let ctx = WalkContext {
            rules: &self.rules,
            statuses: &self.statuses,
            uses_surplus: self.uses_surplus,
            seats_filled: self.uses_surplus && self.winners.len() >= self.rules.number_of_winners as usize,
        };
        let record_snapshots = self.rules.record_ballot_snapshots;
        let mut snapshots = Vec::new();

        for (index, ballot) in self.ballots.iter_mut().enumerate() {
            let previous = ballot.current_recipient().cloned();
            let decision = walk::decide(ballot, &ctx);
            let mut entries = Vec::new();
            let value = ballot.fractional_transfer_value();
            match decision {
                Decision::Abort(reason) => return Err(reason.into()),
                Decision::Keep => {}
                Decision::Assign { candidate, rank } => {
                    debug!(
                        target: "rcv::audit",
                        round,
                        ballot = %walk::ballot_name(ballot),
                        from = %LedgerNode::from(previous.as_ref()),
                        to = %candidate,
                        rank,
                        value = %value,
                        "ballot placed"
                    );
                    entries.push(Entry::Transfer(
                        LedgerNode::from(previous.as_ref()),
                        LedgerNode::Candidate(candidate.clone()),
                        value.clone(),
                    ));
                    ballot.assign(candidate, rank);
                }
                Decision::Exhaust { reason, rank } => {
                    debug!(
                        target: "rcv::audit",
                        round,
                        ballot = %walk::ballot_name(ballot),
                        from = %LedgerNode::from(previous.as_ref()),
                        %reason,
                        rank,
                        value = %value,
                        "ballot inactive"
                    );
                    entries.push(Entry::Transfer(
                        LedgerNode::from(previous.as_ref()),
                        LedgerNode::Exhausted,
                        value.clone(),
                    ));
                    ballot.exhaust(reason, rank);
                }
            }

            match (ballot.status(), ballot.current_recipient()) {
                (BallotStatus::Active, Some(to)) => entries.push(Entry::Candidate(to.clone(), value)),
                (BallotStatus::Inactive(reason), _) => entries.push(Entry::Inactive(reason, value)),
                // An active ballot always has a recipient once walked.
                (BallotStatus::Active, None) => {}
            }
            if ctx.uses_surplus {
                for (winner, kept) in ballot.winner_allocations() {
                    entries.push(Entry::Candidate(winner.clone(), kept.clone()));
                }
            }

            post(round, &mut tally, &mut self.ledger, &entries);
            for kind in &self.rules.tabulate_by {
                if let Some(key) = ballot.slice_key(*kind) {
                    let slice = Slice::new(*kind, key);
                    if let (Some(t), Some(books)) = (slice_tallies.get_mut(&slice), self.slices.get_mut(&slice)) {
                        post(round, t, &mut books.ledger, &entries);
                    }
                }
            }

            if record_snapshots {
                snapshots.push(BallotSnapshot {
                    index,
                    id: ballot.id().cloned(),
                    status: ballot.status(),
                    recipient: ballot.current_recipient().cloned(),
                    transfer_value: ballot.fractional_transfer_value(),
                    allocations: ballot.winner_allocations().clone(),
                });
            }
        }

        tally.lock();
        let threshold = self.round_threshold(round, tally.active_ballot_sum());
        tally.set_winning_threshold(threshold.clone());
        info!(
            round,
            active = %tally.active_ballot_sum(),
            inactive = %tally.inactive_ballot_sum(),
            threshold = %threshold,
            "round tallied"
        );
        for (cand, votes) in tally.sorted_candidates_by_tally(self.uwi()) {
            info!(round, candidate = %cand, votes = %votes, "tally");
        }

        if self.uses_surplus {
            self.adjust_winner_tallies(round, &mut tally, &threshold);
        }

        for (slice, mut t) in slice_tallies {
            t.lock();
            t.set_winning_threshold(threshold.clone());
            if let Some(books) = self.slices.get_mut(&slice) {
                books.rounds.push(t);
            }
        }
        if record_snapshots {
            self.snapshots.insert(round, snapshots);
        }
        self.history.push(tally);
        Ok(())
    }

    /// Single-winner and percentage contests recompute each round (unless the
    /// first round fixes it); seat-filling contests keep round 1's threshold.
    fn round_threshold(&mut self, round: u32, active: &Decimal) -> Decimal {
        let recompute = round == 1 || self.rules.recomputes_threshold_each_round();
        match (&self.threshold, recompute) {
            (Some(kept), false) => kept.clone(),
            _ => {
                let t = super::winning_threshold(&self.rules, active);
                self.threshold = Some(t.clone());
                t
            }
        }
    }
}
