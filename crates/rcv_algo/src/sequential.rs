//! Contest-level driver: one pass, or one single-winner pass per seat in
//! sequential winner-takes-all contests.

use std::collections::BTreeSet;

use tracing::info;

use rcv_core::{CandidateId, ContestRules};

use crate::ballot::Ballot;
use crate::engine::{TabulationEngine, TabulationOutcome};
use crate::errors::{AbortReason, TabulationError};
use crate::tiebreak::TieBreakOracle;

#[derive(Clone, Debug)]
pub struct ContestOutcome {
    pub contest_name: String,
    /// One entry, or one per seat for sequential contests.
    pub passes: Vec<TabulationOutcome>,
    /// In election order across all passes.
    pub winners: Vec<CandidateId>,
}

/// Tabulate a whole contest. Ballots are not modified; each pass works on
/// fresh copies.
pub fn tabulate_contest(
    rules: &ContestRules,
    ballots: &[Ballot],
    oracle: &mut dyn TieBreakOracle,
) -> Result<ContestOutcome, TabulationError> {
    rules.validate()?;
    if !rules.is_sequential() {
        let pass = TabulationEngine::new(rules.clone(), ballots.to_vec())?.run(oracle)?;
        return Ok(ContestOutcome {
            contest_name: rules.contest_name.clone(),
            winners: pass.winners.clone(),
            passes: vec![pass],
        });
    }

    let mut excluded: BTreeSet<CandidateId> = rules.excluded.clone();
    let mut passes = Vec::with_capacity(rules.number_of_winners as usize);
    let mut winners = Vec::new();
    for seat in 1..=rules.number_of_winners {
        let pass_rules = rules.sequential_pass(&excluded);
        info!(seat, excluded = excluded.len(), "sequential pass");
        let pass = TabulationEngine::new(pass_rules, ballots.to_vec())?.run(oracle)?;
        let Some(winner) = pass.winners.first().cloned() else {
            return Err(AbortReason::SequentialPassWithoutWinner { seat }.into());
        };
        excluded.insert(winner.clone());
        winners.push(winner);
        passes.push(pass);
    }
    Ok(ContestOutcome { contest_name: rules.contest_name.clone(), passes, winners })
}
