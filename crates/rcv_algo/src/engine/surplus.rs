//! Fractional surplus transfer for multi-seat contests.

use tracing::{debug, info};

use rcv_core::{CandidateId, Decimal};

use crate::engine::TabulationEngine;
use crate::ledger::LedgerNode;
use crate::round_tally::RoundTally;

impl TabulationEngine {
    /// `max(0, tally − threshold) / tally`, rounded down; zero when there is no surplus.
    pub(super) fn surplus_fraction(&self, tally: &Decimal, threshold: &Decimal) -> Decimal {
        let extra = tally - threshold;
        if !extra.is_positive() {
            return Decimal::zero();
        }
        self.arith.divide(&extra, tally)
    }

    /// Move the surplus of a winner elected in `round` onto its ballots'
    /// transferable value. The ballots move on in the next round's walk.
    pub(super) fn transfer_surplus(&mut self, winner: &CandidateId, round: u32) {
        let Some(tally) = self.history.last() else {
            return;
        };
        let votes = tally.candidate_tally(winner);
        let threshold = tally.winning_threshold().clone();
        let fraction = self.surplus_fraction(&votes, &threshold);
        info!(round, candidate = %winner, votes = %votes, fraction = %fraction, "surplus transfer");

        let arith = self.arith;
        for ballot in self.ballots.iter_mut() {
            if ballot.is_active() && ballot.current_recipient() == Some(winner) {
                ballot.record_winner(winner.clone(), &fraction, &arith);
            }
        }
    }

    /// Past winners' tallies are rebuilt from ballot allocations each round;
    /// show them at the threshold and book the rounding excess as residual
    /// surplus (cumulative per round; ledgered once, the round after election).
    pub(super) fn adjust_winner_tallies(&mut self, round: u32, tally: &mut RoundTally, threshold: &Decimal) {
        let mut residual = Decimal::zero();
        if !self.winners.is_empty() {
            tally.unlock_for_surplus_adjustment();
            for winner in &self.winners {
                let retained = tally.candidate_tally(winner);
                let shown = retained.clone().min(threshold.clone());
                let excess = &retained - &shown;
                if self.elected_round.get(winner) == Some(&(round - 1)) {
                    debug!(target: "rcv::audit", round, candidate = %winner, residual = %excess, "residual surplus");
                    self.ledger.add(
                        round,
                        LedgerNode::Candidate(winner.clone()),
                        LedgerNode::Residual,
                        &excess,
                    );
                }
                residual += excess;
                tally.set_candidate_tally(winner, shown);
            }
            tally.relock();
        }
        self.residual_surplus.insert(round, residual);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ballot::Ballot;
    use rcv_core::{ContestRules, WinnerElectionMode};

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn engine() -> TabulationEngine {
        let cands: Vec<CandidateId> = ["A", "B", "C"].iter().map(|s| s.parse().unwrap()).collect();
        let mut rules = ContestRules::new("s", cands.clone());
        rules.number_of_winners = 2;
        rules.winner_election_mode = WinnerElectionMode::MultiSeatAllowMultipleWinnersPerRound;
        TabulationEngine::new(rules, vec![Ballot::ranked(cands)]).unwrap()
    }

    #[test]
    fn fraction_is_rounded_down() {
        let e = engine();
        assert_eq!(e.surplus_fraction(&d("12"), &d("10")), d("0.1666"));
        assert_eq!(e.surplus_fraction(&d("10"), &d("10")), Decimal::zero());
        assert_eq!(e.surplus_fraction(&d("9"), &d("10")), Decimal::zero());
    }
}
