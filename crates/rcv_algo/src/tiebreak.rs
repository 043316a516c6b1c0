//! Tie resolution for winner selection and elimination.
//!
//! Every decision is kept as a [`TieBreakRecord`] with a human-readable
//! explanation and, for random draws, the RNG crumb that reproduces it.

use std::collections::VecDeque;
use std::fmt;

use thiserror::Error;
use tracing::info;

use rcv_core::{CandidateId, ContestRules, Decimal, TieCrumb, TieRng, TiebreakMode};

use crate::errors::{AbortReason, TabulationError};
use crate::round_tally::RoundTally;

/// The operator declined to resolve a tie.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("tie resolution cancelled")]
pub struct Cancelled;

/// Source of operator decisions for interactive tiebreaks.
///
/// `tied` is sorted; `selecting_winner` is false when choosing whom to eliminate.
pub trait TieBreakOracle {
    fn resolve(&mut self, tied: &[CandidateId], selecting_winner: bool) -> Result<CandidateId, Cancelled>;
}

impl<F> TieBreakOracle for F
where
    F: FnMut(&[CandidateId], bool) -> Result<CandidateId, Cancelled>,
{
    fn resolve(&mut self, tied: &[CandidateId], selecting_winner: bool) -> Result<CandidateId, Cancelled> {
        self(tied, selecting_winner)
    }
}

/// Answers ties from a fixed queue; cancels once the queue runs dry.
#[derive(Clone, Debug, Default)]
pub struct ScriptedOracle {
    choices: VecDeque<CandidateId>,
}

impl ScriptedOracle {
    pub fn new<I: IntoIterator<Item = CandidateId>>(choices: I) -> Self {
        Self { choices: choices.into_iter().collect() }
    }

    /// An oracle that cancels any interactive tie.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn remaining(&self) -> usize {
        self.choices.len()
    }
}

impl TieBreakOracle for ScriptedOracle {
    fn resolve(&mut self, _tied: &[CandidateId], _selecting_winner: bool) -> Result<CandidateId, Cancelled> {
        self.choices.pop_front().ok_or(Cancelled)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TiePurpose {
    Winner,
    Loser,
}

impl fmt::Display for TiePurpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TiePurpose::Winner => f.write_str("winner"),
            TiePurpose::Loser => f.write_str("loser"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TieBreakRecord {
    pub round: u32,
    pub purpose: TiePurpose,
    pub tied: Vec<CandidateId>,
    pub selected: CandidateId,
    pub explanation: String,
    pub crumb: Option<TieCrumb>,
}

type Pick = (CandidateId, String, Option<TieCrumb>);

/// Owns the run's tie RNG and candidate permutation.
#[derive(Clone, Debug)]
pub struct TiebreakResolver {
    mode: TiebreakMode,
    rng: TieRng,
    permutation: Vec<CandidateId>,
    records: Vec<TieBreakRecord>,
}

impl TiebreakResolver {
    /// For `GeneratePermutation` the sorted declared candidates are shuffled here,
    /// once, with the contest seed.
    pub fn new(rules: &ContestRules) -> Self {
        let mut rng = TieRng::from_seed_u64(rules.random_seed.unwrap_or_default());
        let permutation = match &rules.tiebreak_mode {
            TiebreakMode::UsePermutationInConfig(order) => order.clone(),
            TiebreakMode::GeneratePermutation => {
                let mut order = rules.candidates.clone();
                order.sort();
                rng.shuffle_in_place(&mut order);
                order
            }
            _ => Vec::new(),
        };
        Self { mode: rules.tiebreak_mode.clone(), rng, permutation, records: Vec::new() }
    }

    pub fn candidate_permutation(&self) -> &[CandidateId] {
        &self.permutation
    }

    pub fn records(&self) -> &[TieBreakRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<TieBreakRecord> {
        self.records
    }

    pub fn select_winner(
        &mut self,
        round: u32,
        tied: &[CandidateId],
        history: &[RoundTally],
        oracle: &mut dyn TieBreakOracle,
    ) -> Result<CandidateId, TabulationError> {
        self.resolve(TiePurpose::Winner, round, tied, history, oracle)
    }

    pub fn select_loser(
        &mut self,
        round: u32,
        tied: &[CandidateId],
        history: &[RoundTally],
        oracle: &mut dyn TieBreakOracle,
    ) -> Result<CandidateId, TabulationError> {
        self.resolve(TiePurpose::Loser, round, tied, history, oracle)
    }

    fn resolve(
        &mut self,
        purpose: TiePurpose,
        round: u32,
        tied: &[CandidateId],
        history: &[RoundTally],
        oracle: &mut dyn TieBreakOracle,
    ) -> Result<CandidateId, TabulationError> {
        let mut tied = tied.to_vec();
        tied.sort();
        tied.dedup();
        match tied.len() {
            0 => return Err(AbortReason::NoEliminationCandidate { round }.into()),
            1 => return Ok(tied.remove(0)),
            _ => {}
        }

        let (selected, explanation, crumb) = match self.mode.clone() {
            TiebreakMode::Random => self.random_pick(purpose, round, &tied, String::new()),
            TiebreakMode::Interactive => Self::ask(oracle, purpose, &tied, String::new())?,
            TiebreakMode::PreviousRoundCountsThenRandom
            | TiebreakMode::PreviousRoundCountsThenInteractive => {
                let (narrowed, note) = narrow_by_previous_rounds(purpose, round, &tied, history);
                if narrowed.len() == 1 {
                    let only = narrowed[0].clone();
                    (only, note, None)
                } else if matches!(self.mode, TiebreakMode::PreviousRoundCountsThenRandom) {
                    self.random_pick(purpose, round, &narrowed, note)
                } else {
                    Self::ask(oracle, purpose, &narrowed, note)?
                }
            }
            TiebreakMode::UsePermutationInConfig(_) | TiebreakMode::GeneratePermutation => {
                self.permutation_pick(purpose, &tied)
            }
        };

        info!(round, %purpose, selected = %selected, "{explanation}");
        self.records.push(TieBreakRecord {
            round,
            purpose,
            tied,
            selected: selected.clone(),
            explanation,
            crumb,
        });
        Ok(selected)
    }

    fn random_pick(&mut self, purpose: TiePurpose, round: u32, tied: &[CandidateId], note: String) -> Pick {
        let ctx = format!("round:{round}/{purpose}");
        // `tied` is non-empty here, so a draw always succeeds.
        let (idx, crumb) = match self.rng.pick_index_with_crumb(&ctx, tied.len()) {
            Some((idx, crumb)) => (idx, Some(crumb)),
            None => (0, None),
        };
        let selected = tied[idx].clone();
        let explanation = format!(
            "{note}{selected} was randomly selected as {purpose} among {}",
            join(tied)
        );
        (selected, explanation, crumb)
    }

    fn ask(
        oracle: &mut dyn TieBreakOracle,
        purpose: TiePurpose,
        tied: &[CandidateId],
        note: String,
    ) -> Result<Pick, TabulationError> {
        let choice = oracle.resolve(tied, purpose == TiePurpose::Winner)?;
        if !tied.contains(&choice) {
            return Err(AbortReason::InvalidTieChoice { choice }.into());
        }
        let explanation = format!(
            "{note}{choice} was selected by the operator as {purpose} among {}",
            join(tied)
        );
        Ok((choice, explanation, None))
    }

    fn permutation_pick(&self, purpose: TiePurpose, tied: &[CandidateId]) -> Pick {
        // Candidates missing from the order (the write-in sentinel) rank after everyone.
        let position = |c: &CandidateId| self.permutation.iter().position(|p| p == c).unwrap_or(usize::MAX);
        let picked = match purpose {
            TiePurpose::Winner => tied.iter().min_by_key(|c| (position(*c), (*c).clone())),
            TiePurpose::Loser => tied.iter().max_by_key(|c| (position(*c), (*c).clone())),
        };
        let selected = picked.cloned().unwrap_or_else(|| tied[0].clone());
        let explanation = match purpose {
            TiePurpose::Winner => format!("{selected} appears earliest in the candidate permutation among {}", join(tied)),
            TiePurpose::Loser => format!("{selected} appears latest in the candidate permutation among {}", join(tied)),
        };
        (selected, explanation, None)
    }
}

/// Walk back from `round − 1` to round 1, keeping only the candidates with the
/// most (winner) or fewest (loser) votes, until one remains or history runs out.
fn narrow_by_previous_rounds(
    purpose: TiePurpose,
    round: u32,
    tied: &[CandidateId],
    history: &[RoundTally],
) -> (Vec<CandidateId>, String) {
    let mut remaining = tied.to_vec();
    for prior in (1..round).rev() {
        let Some(tally) = history.get(prior as usize - 1) else {
            continue;
        };
        let counts: Vec<(CandidateId, Decimal)> =
            remaining.iter().map(|c| (c.clone(), tally.candidate_tally(c))).collect();
        let extreme = match purpose {
            TiePurpose::Winner => counts.iter().map(|(_, t)| t).max(),
            TiePurpose::Loser => counts.iter().map(|(_, t)| t).min(),
        };
        let Some(extreme) = extreme.cloned() else {
            break;
        };
        remaining = counts.into_iter().filter(|(_, t)| *t == extreme).map(|(c, _)| c).collect();
        if remaining.len() == 1 {
            let note = match purpose {
                TiePurpose::Winner => format!("{} had the most votes in round {prior}", remaining[0]),
                TiePurpose::Loser => format!("{} had the fewest votes in round {prior}", remaining[0]),
            };
            return (remaining, note);
        }
    }
    let note = if round > 1 {
        "previous rounds did not break the tie; ".to_string()
    } else {
        String::new()
    };
    (remaining, note)
}

fn join(cands: &[CandidateId]) -> String {
    cands.iter().map(CandidateId::as_str).collect::<Vec<_>>().join(", ")
}
