//! Elimination strategies, applied in order; the first that yields candidates wins.
//!
//! 1. undeclared write-in holding votes
//! 2. candidates under the minimum vote threshold
//! 3. batch elimination
//! 4. the single lowest candidate, tiebreak on ties

use std::collections::{BTreeMap, BTreeSet};

use tracing::info;

use rcv_core::{CandidateId, Decimal};

use crate::engine::TabulationEngine;
use crate::errors::{AbortReason, TabulationError};
use crate::tiebreak::TieBreakOracle;

/// Candidates that can be dropped together because their combined votes
/// cannot overtake the next-lowest tally. `groups` is ascending by tally.
pub fn batch_elimination(groups: &BTreeMap<Decimal, Vec<CandidateId>>) -> Vec<CandidateId> {
    let mut running_total = Decimal::zero();
    let mut seen: Vec<CandidateId> = Vec::new();
    let mut eliminated: Vec<CandidateId> = Vec::new();
    for (votes, cands) in groups {
        if running_total < *votes {
            for cand in &seen {
                if !eliminated.contains(cand) {
                    eliminated.push(cand.clone());
                }
            }
        }
        running_total += &(votes * &Decimal::from(cands.len()));
        seen.extend(cands.iter().cloned());
    }
    eliminated
}

impl TabulationEngine {
    pub(super) fn select_eliminations(
        &mut self,
        round: u32,
        oracle: &mut dyn TieBreakOracle,
    ) -> Result<Vec<CandidateId>, TabulationError> {
        let Some(tally) = self.history.last() else {
            return Ok(Vec::new());
        };
        let continuing: BTreeSet<CandidateId> = self.continuing().cloned().collect();

        if let Some(uwi) = self.uwi() {
            if continuing.contains(uwi) && tally.candidate_tally(uwi).is_positive() {
                info!(round, candidate = %uwi, "eliminating undeclared write-ins");
                return Ok(vec![uwi.clone()]);
            }
        }

        let minimum = &self.rules.minimum_vote_threshold;
        if minimum.is_positive() {
            let below: Vec<CandidateId> = continuing
                .iter()
                .filter(|c| tally.candidate_tally(c) < *minimum)
                .cloned()
                .collect();
            if !below.is_empty() {
                if below.len() == continuing.len() {
                    return Err(AbortReason::AllCandidatesBelowMinimum { round }.into());
                }
                info!(round, count = below.len(), minimum = %minimum, "eliminating candidates below the minimum");
                return Ok(below);
            }
        }

        // An empty write-in bucket is not a candidate to drop.
        let uwi = self.uwi();
        let groups = tally.tally_to_candidates(|c| continuing.contains(c) && Some(c) != uwi);

        if self.rules.batch_elimination {
            let batch = batch_elimination(&groups);
            if batch.len() > 1 && self.batch_leaves_enough(&batch) {
                info!(round, count = batch.len(), "batch elimination");
                return Ok(batch);
            }
        }

        match groups.into_iter().next() {
            Some((_, lowest)) if lowest.len() == 1 => Ok(lowest),
            Some((_, lowest)) => {
                let loser = self.resolver.select_loser(round, &lowest, &self.history, oracle)?;
                Ok(vec![loser])
            }
            None => Err(AbortReason::NoEliminationCandidate { round }.into()),
        }
    }

    /// A batch may not leave fewer candidates than seats to fill, nor fewer
    /// than two under continue-until-two.
    fn batch_leaves_enough(&self, batch: &[CandidateId]) -> bool {
        let uwi = self.uwi();
        let dropped = batch.iter().filter(|c| Some(*c) != uwi).count();
        let left = self.remaining_count().saturating_sub(dropped);
        let mut floor = if self.rules.bottoms_up_percentage().is_some() { 1 } else { self.seats() };
        if self.rules.continue_until_two_candidates_remain {
            floor = floor.max(2);
        }
        left >= floor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(pairs: &[(&str, u32)]) -> BTreeMap<Decimal, Vec<CandidateId>> {
        let mut out: BTreeMap<Decimal, Vec<CandidateId>> = BTreeMap::new();
        for (name, votes) in pairs {
            out.entry(Decimal::from(*votes)).or_default().push(name.parse().unwrap());
        }
        out
    }

    fn names(v: Vec<CandidateId>) -> Vec<String> {
        v.into_iter().map(String::from).collect()
    }

    #[test]
    fn drops_three_lowest_of_one_one_two_ten() {
        let g = groups(&[("A", 1), ("B", 1), ("C", 2), ("D", 10)]);
        assert_eq!(names(batch_elimination(&g)), ["A", "B", "C"]);
    }

    #[test]
    fn nothing_when_lowest_can_catch_up() {
        // A and B together (4) could overtake C.
        let g = groups(&[("A", 2), ("B", 2), ("C", 3)]);
        assert!(batch_elimination(&g).is_empty());
    }

    #[test]
    fn running_total_carries_across_groups() {
        // A is out at 2; B and C go together once 6 < 9.
        let g = groups(&[("A", 1), ("B", 2), ("C", 3), ("D", 9)]);
        assert_eq!(names(batch_elimination(&g)), ["A", "B", "C"]);
        let g = groups(&[("A", 1), ("B", 2), ("C", 3), ("D", 4)]);
        assert_eq!(names(batch_elimination(&g)), ["A"]);
    }
}
