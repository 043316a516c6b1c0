//! Winner detection.

use rcv_core::{CandidateId, Decimal};

use crate::engine::TabulationEngine;
use crate::errors::TabulationError;
use crate::round_tally::RoundTally;
use crate::tiebreak::{TieBreakOracle, TiebreakResolver};

/// Take the first `seats` of `ranked` (descending by tally). A tie across the
/// cut goes to the tiebreak, one pick at a time.
fn select_top(
    ranked: &[(CandidateId, Decimal)],
    seats: usize,
    round: u32,
    resolver: &mut TiebreakResolver,
    history: &[RoundTally],
    oracle: &mut dyn TieBreakOracle,
) -> Result<Vec<CandidateId>, TabulationError> {
    if ranked.len() <= seats {
        return Ok(ranked.iter().map(|(c, _)| c.clone()).collect());
    }
    let mut chosen = Vec::with_capacity(seats);
    let mut i = 0;
    while chosen.len() < seats && i < ranked.len() {
        let votes = &ranked[i].1;
        let group: Vec<CandidateId> =
            ranked[i..].iter().take_while(|(_, v)| v == votes).map(|(c, _)| c.clone()).collect();
        i += group.len();
        if chosen.len() + group.len() <= seats {
            chosen.extend(group);
            continue;
        }
        let mut tied = group;
        while chosen.len() < seats {
            let pick = resolver.select_winner(round, &tied, history, oracle)?;
            tied.retain(|c| *c != pick);
            chosen.push(pick);
        }
    }
    Ok(chosen)
}

impl TabulationEngine {
    pub(super) fn identify_winners(
        &mut self,
        round: u32,
        oracle: &mut dyn TieBreakOracle,
    ) -> Result<Vec<CandidateId>, TabulationError> {
        let Some(tally) = self.history.last() else {
            return Ok(Vec::new());
        };
        let percentage = self.rules.bottoms_up_percentage().is_some();
        let open = self.seats().saturating_sub(self.winners.len());
        if !percentage && open == 0 {
            return Ok(Vec::new());
        }
        if let Some(uwi) = self.uwi() {
            if self.statuses.get(uwi) == Some(&super::CandidateStatus::Continuing)
                && tally.candidate_tally(uwi).is_positive()
            {
                return Ok(Vec::new());
            }
        }

        let uwi = self.uwi();
        let ranked: Vec<(CandidateId, Decimal)> = tally
            .sorted_candidates_by_tally(uwi)
            .into_iter()
            .filter(|(c, _)| {
                Some(c) != uwi && self.statuses.get(c) == Some(&super::CandidateStatus::Continuing)
            })
            .collect();
        if ranked.is_empty() {
            return Ok(Vec::new());
        }
        let threshold = tally.winning_threshold();

        if percentage {
            let all_meet = ranked.iter().all(|(_, v)| v >= threshold);
            return Ok(if all_meet { ranked.into_iter().map(|(c, _)| c).collect() } else { Vec::new() });
        }
        if ranked.len() <= open {
            return Ok(ranked.into_iter().map(|(c, _)| c).collect());
        }
        if self.rules.is_bottoms_up_until_n() {
            return Ok(Vec::new());
        }

        let meeting: Vec<(CandidateId, Decimal)> =
            ranked.iter().filter(|(_, v)| v >= threshold).cloned().collect();
        if meeting.is_empty() {
            // One more candidate than open seats and nobody at threshold: the top
            // vote-getters take the seats. Two left for the last seat always ends
            // here; a fixed first-round threshold extends it to any seat count.
            let forced = ranked.len() == open + 1
                && (open == 1 || self.rules.first_round_determines_threshold);
            if forced {
                return select_top(&ranked, open, round, &mut self.resolver, &self.history, oracle);
            }
            return Ok(Vec::new());
        }
        let seats = if self.rules.allows_only_one_winner_per_round() { 1 } else { open };
        select_top(&meeting, seats, round, &mut self.resolver, &self.history, oracle)
    }
}
