//! Contest rule domains and the `ContestRules` struct with safe defaults.
//!
//! Every rule branch the engine takes is a closed enum matched exhaustively.
//! Invalid combinations are rejected by [`ContestRules::validate`] before any
//! ballot is counted, never discovered mid-tabulation.

use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::decimal::{Decimal, VoteArithmetic};
use crate::errors::ConfigError;
use crate::ids::{CandidateId, SliceKind};

/// Upper bound on configured vote-arithmetic precision.
pub const MAX_DECIMAL_PLACES: u32 = 20;
/// Precision used when the contest does not say otherwise.
pub const DEFAULT_DECIMAL_PLACES: u32 = 4;

/// Define a unit-only rule enum with explicit wire tokens.
macro_rules! rule_enum {
    ($(#[$meta:meta])* $name:ident => { $($(#[$vmeta:meta])* $variant:ident = $token:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        pub enum $name {
            $(
                $(#[$vmeta])*
                #[cfg_attr(feature = "serde", serde(rename = $token))]
                $variant,
            )+
        }

        impl $name {
            /// Stable wire token.
            pub fn as_token(&self) -> &'static str {
                match self {
                    $( $name::$variant => $token, )+
                }
            }
        }
    };
}

rule_enum!(
    /// What to do when a ballot marks more than one candidate at a rank.
    OvervoteRule => {
        AlwaysSkipToNextRank = "always_skip_to_next_rank",
        ExhaustImmediately = "exhaust_immediately",
        /// Exhaust only if two or more of the marked candidates are still continuing.
        ExhaustIfMultipleContinuing = "exhaust_if_multiple_continuing",
    }
);

/// How winners are elected.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", content = "value", rename_all = "snake_case"))]
pub enum WinnerElectionMode {
    StandardSingleWinner,
    MultiSeatAllowOnlyOneWinnerPerRound,
    MultiSeatAllowMultipleWinnersPerRound,
    /// Eliminate from the bottom until only `number_of_winners` remain; no surplus.
    MultiSeatBottomsUpUntilNWinners,
    /// Eliminate from the bottom until every remaining candidate holds at least
    /// this fraction of the active votes; all of them win.
    MultiSeatBottomsUpUsingPercentageThreshold(Decimal),
    /// One full single-winner tabulation per seat, excluding earlier winners.
    MultiSeatSequentialWinnerTakesAll,
}

impl WinnerElectionMode {
    pub fn name(&self) -> &'static str {
        match self {
            WinnerElectionMode::StandardSingleWinner => "standard_single_winner",
            WinnerElectionMode::MultiSeatAllowOnlyOneWinnerPerRound => {
                "multi_seat_allow_only_one_winner_per_round"
            }
            WinnerElectionMode::MultiSeatAllowMultipleWinnersPerRound => {
                "multi_seat_allow_multiple_winners_per_round"
            }
            WinnerElectionMode::MultiSeatBottomsUpUntilNWinners => {
                "multi_seat_bottoms_up_until_n_winners"
            }
            WinnerElectionMode::MultiSeatBottomsUpUsingPercentageThreshold(_) => {
                "multi_seat_bottoms_up_using_percentage_threshold"
            }
            WinnerElectionMode::MultiSeatSequentialWinnerTakesAll => {
                "multi_seat_sequential_winner_takes_all"
            }
        }
    }
}

/// Tie resolution strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "type", content = "value", rename_all = "snake_case"))]
pub enum TiebreakMode {
    Random,
    Interactive,
    PreviousRoundCountsThenRandom,
    PreviousRoundCountsThenInteractive,
    /// Total order over all declared candidates, earliest = most preferred.
    UsePermutationInConfig(Vec<CandidateId>),
    /// Sorted candidate list shuffled once with the contest seed.
    GeneratePermutation,
}

impl TiebreakMode {
    pub fn name(&self) -> &'static str {
        match self {
            TiebreakMode::Random => "random",
            TiebreakMode::Interactive => "interactive",
            TiebreakMode::PreviousRoundCountsThenRandom => "previous_round_counts_then_random",
            TiebreakMode::PreviousRoundCountsThenInteractive => {
                "previous_round_counts_then_interactive"
            }
            TiebreakMode::UsePermutationInConfig(_) => "use_permutation_in_config",
            TiebreakMode::GeneratePermutation => "generate_permutation",
        }
    }

    /// True when the mode may consume random draws.
    pub fn needs_seed(&self) -> bool {
        matches!(
            self,
            TiebreakMode::Random
                | TiebreakMode::PreviousRoundCountsThenRandom
                | TiebreakMode::GeneratePermutation
        )
    }
}

/// Read-only rule configuration for one contest.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct ContestRules {
    pub contest_name: String,
    /// Declared candidates, in ballot-display order.
    pub candidates: Vec<CandidateId>,
    /// Declared candidates removed before round 1.
    pub excluded: BTreeSet<CandidateId>,
    pub number_of_winners: u32,
    pub winner_election_mode: WinnerElectionMode,
    pub overvote_rule: OvervoteRule,
    pub tiebreak_mode: TiebreakMode,
    pub random_seed: Option<u64>,
    /// Ranks above this are ignored. `None` = unlimited.
    pub max_rankings_allowed: Option<u32>,
    /// Consecutive blank ranks tolerated before a ballot exhausts. `None` = unlimited.
    pub max_skipped_ranks_allowed: Option<u32>,
    pub minimum_vote_threshold: Decimal,
    pub decimal_places_for_vote_arithmetic: u32,
    /// Keep the Droop/Hare threshold at `decimal_places` precision instead of whole votes.
    pub non_integer_winning_threshold: bool,
    pub hare_quota: bool,
    pub batch_elimination: bool,
    pub continue_until_two_candidates_remain: bool,
    pub exhaust_on_duplicate_candidate: bool,
    pub first_round_determines_threshold: bool,
    pub treat_blank_as_undeclared_write_in: bool,
    /// Sentinel candidate for undeclared write-ins; dropped first whenever it holds votes.
    pub undeclared_write_in_label: Option<CandidateId>,
    /// Label a ballot uses to mark an explicit overvote at a rank.
    pub overvote_label: Option<CandidateId>,
    pub stop_tabulation_early_after_round: Option<u32>,
    /// Slice kinds whose tallies are additionally replicated per key.
    pub tabulate_by: BTreeSet<SliceKind>,
    pub record_ballot_snapshots: bool,
}

impl Default for ContestRules {
    fn default() -> Self {
        Self {
            contest_name: "contest".to_string(),
            candidates: Vec::new(),
            excluded: BTreeSet::new(),
            number_of_winners: 1,
            winner_election_mode: WinnerElectionMode::StandardSingleWinner,
            overvote_rule: OvervoteRule::AlwaysSkipToNextRank,
            tiebreak_mode: TiebreakMode::Random,
            random_seed: Some(0),
            max_rankings_allowed: None,
            max_skipped_ranks_allowed: None,
            minimum_vote_threshold: Decimal::zero(),
            decimal_places_for_vote_arithmetic: DEFAULT_DECIMAL_PLACES,
            non_integer_winning_threshold: false,
            hare_quota: false,
            batch_elimination: false,
            continue_until_two_candidates_remain: false,
            exhaust_on_duplicate_candidate: false,
            first_round_determines_threshold: false,
            treat_blank_as_undeclared_write_in: false,
            undeclared_write_in_label: None,
            overvote_label: None,
            stop_tabulation_early_after_round: None,
            tabulate_by: BTreeSet::new(),
            record_ballot_snapshots: false,
        }
    }
}

impl ContestRules {
    /// Single-winner defaults for the given declared candidates.
    pub fn new(contest_name: &str, candidates: Vec<CandidateId>) -> Self {
        Self {
            contest_name: contest_name.to_string(),
            candidates,
            ..Self::default()
        }
    }

    pub fn arithmetic(&self) -> VoteArithmetic {
        VoteArithmetic::new(self.decimal_places_for_vote_arithmetic)
    }

    pub fn is_single_winner(&self) -> bool {
        self.winner_election_mode == WinnerElectionMode::StandardSingleWinner
    }

    pub fn is_sequential(&self) -> bool {
        self.winner_election_mode == WinnerElectionMode::MultiSeatSequentialWinnerTakesAll
    }

    pub fn is_bottoms_up_until_n(&self) -> bool {
        self.winner_election_mode == WinnerElectionMode::MultiSeatBottomsUpUntilNWinners
    }

    pub fn bottoms_up_percentage(&self) -> Option<&Decimal> {
        match &self.winner_election_mode {
            WinnerElectionMode::MultiSeatBottomsUpUsingPercentageThreshold(p) => Some(p),
            _ => None,
        }
    }

    /// Single-winner rounds (and the single-winner view of one-per-round seats).
    pub fn allows_only_one_winner_per_round(&self) -> bool {
        matches!(
            self.winner_election_mode,
            WinnerElectionMode::StandardSingleWinner
                | WinnerElectionMode::MultiSeatAllowOnlyOneWinnerPerRound
        )
    }

    /// Winners' surpluses are transferred fractionally.
    pub fn uses_surplus_transfer(&self) -> bool {
        self.number_of_winners > 1
            && matches!(
                self.winner_election_mode,
                WinnerElectionMode::MultiSeatAllowOnlyOneWinnerPerRound
                    | WinnerElectionMode::MultiSeatAllowMultipleWinnersPerRound
            )
    }

    /// Single-winner and percentage-threshold contests track the current
    /// round's active votes; seat-filling contests freeze the round-1 quota.
    pub fn recomputes_threshold_each_round(&self) -> bool {
        if self.first_round_determines_threshold {
            return false;
        }
        self.is_single_winner() || self.bottoms_up_percentage().is_some()
    }

    pub fn eligible_candidate_count(&self) -> usize {
        self.candidates.iter().filter(|c| !self.excluded.contains(*c)).count()
    }

    /// Rules for one seat of a sequential contest: single winner, with every
    /// earlier winner added to the excluded set.
    pub fn sequential_pass(&self, excluded: &BTreeSet<CandidateId>) -> ContestRules {
        ContestRules {
            number_of_winners: 1,
            winner_election_mode: WinnerElectionMode::StandardSingleWinner,
            excluded: excluded.clone(),
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.candidates.is_empty() {
            return Err(ConfigError::NoCandidates);
        }
        let mut declared = BTreeSet::new();
        for c in &self.candidates {
            if !declared.insert(c) {
                return Err(ConfigError::DuplicateCandidate(c.clone()));
            }
        }
        if let Some(c) = self.excluded.iter().find(|c| !declared.contains(c)) {
            return Err(ConfigError::ExcludedNotDeclared(c.clone()));
        }

        self.validate_mode()?;

        if self.tiebreak_mode.needs_seed() && self.random_seed.is_none() {
            return Err(ConfigError::MissingRandomSeed { mode: self.tiebreak_mode.name() });
        }
        if let TiebreakMode::UsePermutationInConfig(order) = &self.tiebreak_mode {
            let listed: BTreeSet<&CandidateId> = order.iter().collect();
            if order.len() != self.candidates.len() || listed != declared {
                return Err(ConfigError::PermutationMismatch);
            }
        }

        if self.decimal_places_for_vote_arithmetic > MAX_DECIMAL_PLACES {
            return Err(ConfigError::DecimalPlacesOutOfRange {
                got: self.decimal_places_for_vote_arithmetic,
                max: MAX_DECIMAL_PLACES,
            });
        }
        if self.minimum_vote_threshold.is_negative() {
            return Err(ConfigError::NegativeMinimumThreshold);
        }
        if self.stop_tabulation_early_after_round == Some(0) {
            return Err(ConfigError::StopAfterRoundZero);
        }
        if self.max_rankings_allowed == Some(0) {
            return Err(ConfigError::ZeroMaxRankings);
        }

        let mut labels = BTreeSet::new();
        for label in [&self.undeclared_write_in_label, &self.overvote_label].into_iter().flatten() {
            if declared.contains(label) || !labels.insert(label) {
                return Err(ConfigError::LabelCollision(label.clone()));
            }
        }
        if self.overvote_label.is_some()
            && self.overvote_rule == OvervoteRule::ExhaustIfMultipleContinuing
        {
            return Err(ConfigError::OvervoteLabelUnsupportedRule);
        }
        Ok(())
    }

    fn validate_mode(&self) -> Result<(), ConfigError> {
        let mode = self.winner_election_mode.name();
        if let Some(pct) = self.bottoms_up_percentage() {
            if !pct.is_positive() || *pct > Decimal::one() {
                return Err(ConfigError::PercentageOutOfRange(pct.to_string()));
            }
        } else {
            if self.number_of_winners == 0 {
                return Err(ConfigError::ZeroWinners);
            }
            let eligible = self.eligible_candidate_count();
            if self.number_of_winners as usize > eligible {
                return Err(ConfigError::TooManyWinners {
                    winners: self.number_of_winners,
                    candidates: eligible,
                });
            }
            match (self.is_single_winner(), self.number_of_winners) {
                (true, n) if n != 1 => return Err(ConfigError::ModeRequiresSingleWinner { mode }),
                (false, 1) => return Err(ConfigError::ModeRequiresMultipleWinners { mode }),
                _ => {}
            }
        }
        if !self.is_single_winner() {
            if self.continue_until_two_candidates_remain {
                return Err(ConfigError::SingleWinnerOnly {
                    option: "continue_until_two_candidates_remain",
                });
            }
            if self.first_round_determines_threshold {
                return Err(ConfigError::SingleWinnerOnly {
                    option: "first_round_determines_threshold",
                });
            }
        }
        Ok(())
    }
}
