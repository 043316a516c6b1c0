//! Outcome report: a serializable view of a [`ContestOutcome`] and an atomic
//! JSON writer.
//!
//! Maps are `BTreeMap`s so key order is deterministic. Decimals are written
//! as strings with trailing zeros removed.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::Value;

use rcv_algo::{
    BallotSnapshot, BallotStatus, ContestOutcome, RoundTally, TabulationOutcome, TieBreakRecord,
};
use rcv_core::{CandidateId, Decimal};

use crate::IoError;

#[derive(Clone, Debug, Serialize)]
pub struct OutcomeReport {
    pub contest: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_sha256: Option<String>,
    pub winners: Vec<String>,
    pub passes: Vec<PassReport>,
}

#[derive(Clone, Debug, Serialize)]
pub struct PassReport {
    pub winners: Vec<String>,
    pub candidate_permutation: Vec<String>,
    pub rounds: Vec<RoundReport>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tiebreaks: Vec<TiebreakReport>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub slices: BTreeMap<String, Vec<RoundReport>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub snapshots: BTreeMap<u32, Vec<SnapshotReport>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RoundReport {
    pub round: u32,
    pub threshold: String,
    pub active: String,
    pub tallies: BTreeMap<String, String>,
    /// Non-zero buckets only.
    pub inactive: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub residual_surplus: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub elected: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub eliminated: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub transfers: Vec<TransferReport>,
}

#[derive(Clone, Debug, Serialize)]
pub struct TransferReport {
    pub from: String,
    pub to: String,
    pub amount: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct TiebreakReport {
    pub round: u32,
    pub purpose: String,
    pub tied: Vec<String>,
    pub selected: String,
    pub explanation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rng_word_index: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SnapshotReport {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipient: Option<String>,
    pub value: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub allocations: BTreeMap<String, String>,
}

fn dec(d: &Decimal) -> String {
    d.normalized().to_string()
}

fn names(cands: &[CandidateId]) -> Vec<String> {
    cands.iter().map(|c| c.as_str().to_string()).collect()
}

fn round_events(map: &BTreeMap<CandidateId, u32>, round: u32) -> Vec<String> {
    map.iter().filter(|(_, r)| **r == round).map(|(c, _)| c.as_str().to_string()).collect()
}

fn round_report(tally: &RoundTally) -> RoundReport {
    RoundReport {
        round: tally.round(),
        threshold: dec(tally.winning_threshold()),
        active: dec(tally.active_ballot_sum()),
        tallies: tally.candidate_tallies().iter().map(|(c, v)| (c.as_str().to_string(), dec(v))).collect(),
        inactive: tally
            .inactive_by_reason()
            .iter()
            .filter(|(_, v)| !v.is_zero())
            .map(|(r, v)| (r.as_str().to_string(), dec(v)))
            .collect(),
        residual_surplus: None,
        elected: Vec::new(),
        eliminated: Vec::new(),
        transfers: Vec::new(),
    }
}

fn tiebreak_report(rec: &TieBreakRecord) -> TiebreakReport {
    TiebreakReport {
        round: rec.round,
        purpose: rec.purpose.to_string(),
        tied: names(&rec.tied),
        selected: rec.selected.as_str().to_string(),
        explanation: rec.explanation.clone(),
        // u128 does not fit every JSON reader's number type.
        rng_word_index: rec.crumb.as_ref().map(|c| c.word_index.to_string()),
    }
}

fn snapshot_report(s: &BallotSnapshot) -> SnapshotReport {
    SnapshotReport {
        index: s.index,
        id: s.id.as_ref().map(|id| id.as_str().to_string()),
        status: match s.status {
            BallotStatus::Active => "active".to_string(),
            BallotStatus::Inactive(reason) => reason.as_str().to_string(),
        },
        recipient: s.recipient.as_ref().map(|c| c.as_str().to_string()),
        value: dec(&s.transfer_value),
        allocations: s.allocations.iter().map(|(c, v)| (c.as_str().to_string(), dec(v))).collect(),
    }
}

fn pass_report(pass: &TabulationOutcome) -> PassReport {
    let rounds = pass
        .rounds
        .iter()
        .map(|tally| {
            let round = tally.round();
            let mut r = round_report(tally);
            r.residual_surplus = pass.residual_surplus.get(&round).filter(|v| !v.is_zero()).map(dec);
            r.elected = round_events(&pass.elected_round, round);
            r.eliminated = round_events(&pass.eliminated_round, round);
            r.transfers = pass
                .ledger
                .transfers(round)
                .into_iter()
                .map(|(from, to, amount)| TransferReport {
                    from: from.to_string(),
                    to: to.to_string(),
                    amount: dec(amount),
                })
                .collect();
            r
        })
        .collect();

    PassReport {
        winners: names(&pass.winners),
        candidate_permutation: names(&pass.candidate_permutation),
        rounds,
        tiebreaks: pass.tiebreaks.iter().map(tiebreak_report).collect(),
        slices: pass
            .slices
            .iter()
            .map(|(slice, books)| (slice.to_string(), books.rounds.iter().map(round_report).collect()))
            .collect(),
        snapshots: pass
            .snapshots
            .iter()
            .map(|(round, snaps)| (*round, snaps.iter().map(snapshot_report).collect()))
            .collect(),
    }
}

/// Build the report model for a finished contest.
pub fn outcome_report(outcome: &ContestOutcome, input_sha256: Option<&str>) -> OutcomeReport {
    OutcomeReport {
        contest: outcome.contest_name.clone(),
        input_sha256: input_sha256.map(str::to_string),
        winners: names(&outcome.winners),
        passes: outcome.passes.iter().map(pass_report).collect(),
    }
}

pub fn render_outcome_json(outcome: &ContestOutcome, input_sha256: Option<&str>) -> Result<Value, IoError> {
    Ok(serde_json::to_value(outcome_report(outcome, input_sha256))?)
}

/// Pretty JSON plus a trailing LF, written to a temp file next to `path`
/// and renamed into place.
pub fn write_outcome_json(path: &Path, value: &Value) -> Result<(), IoError> {
    let mut bytes = serde_json::to_vec_pretty(value)?;
    bytes.push(b'\n');

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let tmp = tmp_path(path);
    let mut tf = OpenOptions::new().write(true).create_new(true).open(&tmp)?;
    tf.write_all(&bytes)?;
    tf.sync_all()?;
    drop(tf);

    if let Err(e) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(e.into());
    }
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(format!(".tmp.{}", std::process::id()));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decimals_drop_trailing_zeros() {
        assert_eq!(dec(&"10.0000".parse().unwrap()), "10");
        assert_eq!(dec(&"8.9990".parse().unwrap()), "8.999");
        assert_eq!(dec(&Decimal::zero()), "0");
    }

    #[test]
    fn writer_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("outcome.json");
        write_outcome_json(&path, &serde_json::json!({ "a": 1 })).unwrap();
        write_outcome_json(&path, &serde_json::json!({ "a": 2 })).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.ends_with('\n'));
        let v: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(v["a"], 2);
        assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }
}
