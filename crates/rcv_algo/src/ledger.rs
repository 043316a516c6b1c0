//! Append-only record of vote mass moving between candidates, per round.

use std::collections::BTreeMap;
use std::fmt;

use rcv_core::{CandidateId, Decimal};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LedgerNode {
    /// Source of a ballot's first placement.
    Uncounted,
    Candidate(CandidateId),
    Exhausted,
    /// Rounding remainder a winner keeps above the threshold.
    Residual,
}

impl fmt::Display for LedgerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LedgerNode::Uncounted => f.write_str("uncounted"),
            LedgerNode::Candidate(c) => write!(f, "{c}"),
            LedgerNode::Exhausted => f.write_str("exhausted"),
            LedgerNode::Residual => f.write_str("residual"),
        }
    }
}

impl From<Option<&CandidateId>> for LedgerNode {
    fn from(c: Option<&CandidateId>) -> Self {
        c.map_or(LedgerNode::Uncounted, |c| LedgerNode::Candidate(c.clone()))
    }
}

type Flows = BTreeMap<LedgerNode, BTreeMap<LedgerNode, Decimal>>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TallyLedger {
    rounds: BTreeMap<u32, Flows>,
}

impl TallyLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero amounts are not recorded.
    pub fn add(&mut self, round: u32, from: LedgerNode, to: LedgerNode, amount: &Decimal) {
        if amount.is_zero() {
            return;
        }
        *self
            .rounds
            .entry(round)
            .or_default()
            .entry(from)
            .or_default()
            .entry(to)
            .or_default() += amount;
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    pub fn rounds(&self) -> impl Iterator<Item = u32> + '_ {
        self.rounds.keys().copied()
    }

    /// `(from, to, amount)` for one round, ordered by source then target.
    pub fn transfers(&self, round: u32) -> Vec<(&LedgerNode, &LedgerNode, &Decimal)> {
        self.rounds
            .get(&round)
            .into_iter()
            .flat_map(|flows| {
                flows.iter().flat_map(|(from, tos)| tos.iter().map(move |(to, amt)| (from, to, amt)))
            })
            .collect()
    }

    pub fn amount(&self, round: u32, from: &LedgerNode, to: &LedgerNode) -> Decimal {
        self.rounds
            .get(&round)
            .and_then(|flows| flows.get(from))
            .and_then(|tos| tos.get(to))
            .cloned()
            .unwrap_or_default()
    }

    pub fn total_out_of(&self, round: u32, from: &LedgerNode) -> Decimal {
        self.rounds
            .get(&round)
            .and_then(|flows| flows.get(from))
            .map(|tos| tos.values().sum())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(s: &str) -> LedgerNode {
        LedgerNode::Candidate(s.parse().unwrap())
    }

    #[test]
    fn accumulates_and_skips_zero() {
        let mut l = TallyLedger::new();
        let one = Decimal::one();
        l.add(2, cand("B"), cand("A"), &one);
        l.add(2, cand("B"), cand("A"), &one);
        l.add(2, cand("B"), LedgerNode::Exhausted, &"0.5".parse().unwrap());
        l.add(3, cand("C"), cand("A"), &Decimal::zero());
        assert_eq!(l.amount(2, &cand("B"), &cand("A")), Decimal::from(2u32));
        assert_eq!(l.total_out_of(2, &cand("B")), "2.5".parse().unwrap());
        assert!(l.transfers(3).is_empty());
        assert_eq!(l.rounds().collect::<Vec<_>>(), [2]);
    }

    #[test]
    fn node_display() {
        assert_eq!(LedgerNode::from(None).to_string(), "uncounted");
        assert_eq!(cand("A").to_string(), "A");
        assert_eq!(LedgerNode::Residual.to_string(), "residual");
    }
}
