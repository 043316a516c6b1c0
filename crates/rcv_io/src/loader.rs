//! Loader: read a normalized contest file (rules + ballots), validate the
//! rules, and build engine ballots. No network I/O.
//!
//! ```json
//! { "rules": { ... },
//!   "ballots": [ { "id": "b-1", "rankings": [["A"], [], ["B"]], "precinct": "P1" } ] }
//! ```
//!
//! Each entry of `rankings` is one rank, starting at 1. An empty rank is a
//! skipped rank, or an undeclared write-in vote when the rules treat blanks
//! that way.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use rcv_algo::{Ballot, RankingSet};
use rcv_core::{BallotId, CandidateId, ContestRules, SliceKind};

use crate::{hasher, IoError};

const DEFAULT_MAX_BYTES: u64 = 256 * 1024 * 1024;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ContestFile {
    rules: ContestRules,
    ballots: Vec<BallotRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct BallotRecord {
    #[serde(default)]
    id: Option<String>,
    rankings: Vec<Vec<String>>,
    #[serde(default)]
    precinct: Option<String>,
    #[serde(default)]
    batch: Option<String>,
}

/// Caller overrides applied after the file is parsed.
#[derive(Clone, Debug)]
pub struct LoadOptions {
    /// Replaces `rules.random_seed`.
    pub seed: Option<u64>,
    /// Files larger than this are rejected before reading.
    pub max_bytes: u64,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self { seed: None, max_bytes: DEFAULT_MAX_BYTES }
    }
}

#[derive(Debug)]
pub struct LoadedContest {
    pub rules: ContestRules,
    pub ballots: Vec<Ballot>,
    /// SHA-256 (lowercase hex) of the file bytes as read.
    pub digest: String,
}

/// Read and parse a contest file.
pub fn load_contest(path: &Path, opts: &LoadOptions) -> Result<LoadedContest, IoError> {
    let meta = fs::metadata(path)?;
    if meta.len() > opts.max_bytes {
        return Err(IoError::Limit(format!(
            "{} is {} bytes, limit is {}",
            path.display(),
            meta.len(),
            opts.max_bytes
        )));
    }
    let bytes = fs::read(path)?;
    let loaded = parse_contest(&bytes, opts)?;
    info!(path = %path.display(), sha256 = %loaded.digest, "contest file loaded");
    Ok(loaded)
}

/// Parse contest bytes already in memory.
pub fn parse_contest(bytes: &[u8], opts: &LoadOptions) -> Result<LoadedContest, IoError> {
    let digest = hasher::sha256_hex(bytes);
    let file: ContestFile = serde_json::from_slice(bytes)?;

    let mut rules = file.rules;
    if let Some(seed) = opts.seed {
        rules.random_seed = Some(seed);
    }
    rules.validate()?;

    let blank_vote = if rules.treat_blank_as_undeclared_write_in {
        match &rules.undeclared_write_in_label {
            Some(uwi) => Some(uwi.clone()),
            None => {
                return Err(IoError::Json {
                    pointer: "/rules/treat_blank_as_undeclared_write_in".into(),
                    msg: "requires undeclared_write_in_label".into(),
                })
            }
        }
    } else {
        None
    };

    let mut seen_ids: BTreeSet<String> = BTreeSet::new();
    let mut ballots = Vec::with_capacity(file.ballots.len());
    for (index, record) in file.ballots.into_iter().enumerate() {
        if let Some(id) = &record.id {
            if !seen_ids.insert(id.clone()) {
                warn!(ballot = %id, index, "ballot id repeats; both ballots are counted");
            }
        }
        ballots.push(build_ballot(index, record, blank_vote.as_ref())?);
    }

    info!(
        contest = %rules.contest_name,
        ballots = ballots.len(),
        candidates = rules.candidates.len(),
        sha256 = %digest,
        "contest parsed"
    );
    Ok(LoadedContest { rules, ballots, digest })
}

fn build_ballot(
    index: usize,
    record: BallotRecord,
    blank_vote: Option<&CandidateId>,
) -> Result<Ballot, IoError> {
    let mut ranks: Vec<Vec<CandidateId>> = Vec::with_capacity(record.rankings.len());
    for (r, marks) in record.rankings.iter().enumerate() {
        if marks.is_empty() {
            ranks.push(blank_vote.cloned().into_iter().collect());
            continue;
        }
        let mut parsed = Vec::with_capacity(marks.len());
        for (m, mark) in marks.iter().enumerate() {
            let cand = CandidateId::new(mark).map_err(|e| IoError::Json {
                pointer: format!("/ballots/{index}/rankings/{r}/{m}"),
                msg: e.to_string(),
            })?;
            parsed.push(cand);
        }
        ranks.push(parsed);
    }

    let mut ballot = Ballot::new(RankingSet::from_rank_lists(ranks));
    if let Some(id) = &record.id {
        let id = BallotId::new(id).map_err(|e| IoError::Json {
            pointer: format!("/ballots/{index}/id"),
            msg: e.to_string(),
        })?;
        ballot = ballot.with_id(id);
    }
    if let Some(key) = &record.precinct {
        ballot = ballot.with_slice(SliceKind::Precinct, key);
    }
    if let Some(key) = &record.batch {
        ballot = ballot.with_slice(SliceKind::Batch, key);
    }
    Ok(ballot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<LoadedContest, IoError> {
        parse_contest(json.as_bytes(), &LoadOptions::default())
    }

    #[test]
    fn blank_rank_is_skipped_by_default() {
        let loaded = parse(
            r#"{ "rules": { "candidates": ["A", "B"] },
                 "ballots": [ { "rankings": [["A"], [], ["B"]] } ] }"#,
        )
        .unwrap();
        let set = loaded.ballots[0].rankings();
        assert!(!set.has_ranking_at(2));
        assert!(set.has_ranking_at(3));
    }

    #[test]
    fn blank_rank_becomes_write_in_when_configured() {
        let loaded = parse(
            r#"{ "rules": { "candidates": ["A", "B"],
                            "undeclared_write_in_label": "UWI",
                            "treat_blank_as_undeclared_write_in": true },
                 "ballots": [ { "rankings": [[], ["B"]] } ] }"#,
        )
        .unwrap();
        let uwi: CandidateId = "UWI".parse().unwrap();
        let first = loaded.ballots[0].rankings().ranking_at(1).unwrap();
        assert!(first.contains(&uwi));
    }

    #[test]
    fn blank_as_write_in_needs_a_label() {
        let err = parse(
            r#"{ "rules": { "candidates": ["A"], "treat_blank_as_undeclared_write_in": true },
                 "ballots": [] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, IoError::Json { ref pointer, .. } if pointer == "/rules/treat_blank_as_undeclared_write_in"));
    }

    #[test]
    fn bad_mark_points_at_the_cell() {
        let err = parse(
            r#"{ "rules": { "candidates": ["A"] },
                 "ballots": [ { "rankings": [["A"]] }, { "rankings": [["A"], [" B"]] } ] }"#,
        )
        .unwrap_err();
        match err {
            IoError::Json { pointer, .. } => assert_eq!(pointer, "/ballots/1/rankings/1/0"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn seed_override_and_rule_validation() {
        let json = r#"{ "rules": { "candidates": ["A", "B"], "random_seed": 1 }, "ballots": [] }"#;
        let opts = LoadOptions { seed: Some(99), ..LoadOptions::default() };
        let loaded = parse_contest(json.as_bytes(), &opts).unwrap();
        assert_eq!(loaded.rules.random_seed, Some(99));

        let bad = parse(r#"{ "rules": { "candidates": [] }, "ballots": [] }"#).unwrap_err();
        assert!(matches!(bad, IoError::Rules(_)));
    }

    #[test]
    fn slices_and_ids_are_attached() {
        let loaded = parse(
            r#"{ "rules": { "candidates": ["A"] },
                 "ballots": [ { "id": "b-7", "rankings": [["A"]], "precinct": "P1", "batch": "B2" } ] }"#,
        )
        .unwrap();
        let b = &loaded.ballots[0];
        assert_eq!(b.id().map(BallotId::as_str), Some("b-7"));
        assert_eq!(b.slice_key(SliceKind::Precinct), Some("P1"));
        assert_eq!(b.slice_key(SliceKind::Batch), Some("B2"));
        assert_eq!(loaded.digest.len(), 64);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(parse(r#"{ "rules": { "candidates": ["A"] }, "ballots": [], "extra": 1 }"#).is_err());
    }
}
