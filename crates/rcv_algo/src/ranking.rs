//! Per-ballot ranked choices.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use rcv_core::{CandidateId, CoreError};

/// Rank position on a ballot; 1 is the first choice.
pub type Rank = u32;

/// Sparse map `rank → candidates marked at that rank`.
///
/// Ranks are strictly positive and there is at most one set per rank. A rank
/// holding more than one candidate is an overvote; a missing rank is a skip.
/// Built once at ingestion and never modified afterwards.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RankingSet {
    ranks: BTreeMap<Rank, BTreeSet<CandidateId>>,
}

impl RankingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(rank, candidate)` marks. Marks sharing a rank form an overvote.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, CoreError>
    where
        I: IntoIterator<Item = (Rank, CandidateId)>,
    {
        let mut ranks: BTreeMap<Rank, BTreeSet<CandidateId>> = BTreeMap::new();
        for (rank, cand) in pairs {
            if rank == 0 {
                return Err(CoreError::InvalidRank);
            }
            ranks.entry(rank).or_default().insert(cand);
        }
        Ok(Self { ranks })
    }

    /// One candidate per rank, first element ranked 1.
    pub fn from_ordered<I>(choices: I) -> Self
    where
        I: IntoIterator<Item = CandidateId>,
    {
        let ranks = (1..)
            .zip(choices)
            .map(|(rank, cand)| (rank, BTreeSet::from([cand])))
            .collect();
        Self { ranks }
    }

    /// Positional lists: element `i` holds the marks at rank `i + 1`; an empty
    /// list is a skipped rank.
    pub fn from_rank_lists<I, J>(lists: I) -> Self
    where
        I: IntoIterator<Item = J>,
        J: IntoIterator<Item = CandidateId>,
    {
        let mut ranks = BTreeMap::new();
        for (rank, marks) in (1..).zip(lists) {
            let set: BTreeSet<CandidateId> = marks.into_iter().collect();
            if !set.is_empty() {
                ranks.insert(rank, set);
            }
        }
        Self { ranks }
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// Number of non-empty ranks.
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn ranking_at(&self, rank: Rank) -> Option<&BTreeSet<CandidateId>> {
        self.ranks.get(&rank)
    }

    pub fn has_ranking_at(&self, rank: Rank) -> bool {
        self.ranks.contains_key(&rank)
    }

    /// Highest marked rank.
    pub fn max_rank(&self) -> Result<Rank, CoreError> {
        self.ranks.keys().next_back().copied().ok_or(CoreError::EmptyChoiceSet)
    }

    /// Ascending over marked ranks.
    pub fn iter(&self) -> impl Iterator<Item = (Rank, &BTreeSet<CandidateId>)> + '_ {
        self.ranks.iter().map(|(r, s)| (*r, s))
    }

    /// Ascending over marked ranks strictly greater than `rank`.
    pub fn iter_after(&self, rank: Rank) -> impl Iterator<Item = (Rank, &BTreeSet<CandidateId>)> + '_ {
        self.ranks
            .range((Bound::Excluded(rank), Bound::Unbounded))
            .map(|(r, s)| (*r, s))
    }

    /// True when `cand` is marked at some rank below `rank`.
    pub fn marked_before(&self, cand: &CandidateId, rank: Rank) -> bool {
        self.ranks.range(..rank).any(|(_, s)| s.contains(cand))
    }

    /// Every candidate marked anywhere on the ballot.
    pub fn candidates(&self) -> impl Iterator<Item = &CandidateId> + '_ {
        self.ranks.values().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(s: &str) -> CandidateId {
        s.parse().unwrap()
    }

    #[test]
    fn rank_zero_is_rejected() {
        assert_eq!(RankingSet::from_pairs([(0, c("A"))]), Err(CoreError::InvalidRank));
    }

    #[test]
    fn shared_rank_is_an_overvote() {
        let set = RankingSet::from_pairs([(1, c("A")), (1, c("B")), (3, c("C"))]).unwrap();
        assert_eq!(set.ranking_at(1).map(BTreeSet::len), Some(2));
        assert!(!set.has_ranking_at(2));
        assert_eq!(set.max_rank(), Ok(3));
    }

    #[test]
    fn empty_set_has_no_max_rank() {
        assert_eq!(RankingSet::new().max_rank(), Err(CoreError::EmptyChoiceSet));
        let lists: Vec<Vec<CandidateId>> = vec![vec![], vec![]];
        assert!(RankingSet::from_rank_lists(lists).is_empty());
    }

    #[test]
    fn iteration_skips_empty_ranks() {
        let set = RankingSet::from_rank_lists(vec![vec![c("A")], vec![], vec![c("B")], vec![c("C")]]);
        let ranks: Vec<Rank> = set.iter().map(|(r, _)| r).collect();
        assert_eq!(ranks, [1, 3, 4]);
        let after: Vec<Rank> = set.iter_after(1).map(|(r, _)| r).collect();
        assert_eq!(after, [3, 4]);
        assert!(set.iter_after(4).next().is_none());
    }

    #[test]
    fn marked_before_looks_only_at_lower_ranks() {
        let set = RankingSet::from_ordered([c("A"), c("B"), c("A")]);
        assert!(set.marked_before(&c("A"), 3));
        assert!(!set.marked_before(&c("A"), 1));
        assert!(!set.marked_before(&c("B"), 2));
    }
}
