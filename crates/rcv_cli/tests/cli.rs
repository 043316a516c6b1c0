//! End-to-end runs of the `rcv-tab` binary.

use std::fs;
use std::path::PathBuf;

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;

const FIVE_BALLOTS: &str = r#"{
  "rules": { "contest_name": "five ballots", "candidates": ["A", "B", "C"] },
  "ballots": [
    { "rankings": [["A"], ["B"]] },
    { "rankings": [["A"], ["C"]] },
    { "rankings": [["B"], ["A"]] },
    { "rankings": [["C"], ["A"]] },
    { "rankings": [["C"], ["B"]] }
  ]
}"#;

const INTERACTIVE_TIE: &str = r#"{
  "rules": {
    "candidates": ["A", "B", "C"],
    "tiebreak_mode": { "type": "interactive" },
    "random_seed": null
  },
  "ballots": [
    { "rankings": [["A"]] },
    { "rankings": [["B"]] },
    { "rankings": [["C"]] },
    { "rankings": [["C"]] }
  ]
}"#;

fn contest(dir: &tempfile::TempDir, body: &str) -> PathBuf {
    let path = dir.path().join("contest.json");
    fs::write(&path, body).unwrap();
    path
}

fn rcv_tab() -> Command {
    let mut cmd = Command::cargo_bin("rcv-tab").unwrap();
    cmd.env_remove("RUST_LOG");
    cmd
}

#[test]
fn prints_rounds_and_winner() {
    let dir = tempfile::tempdir().unwrap();
    let path = contest(&dir, FIVE_BALLOTS);

    rcv_tab()
        .arg(&path)
        .assert()
        .success()
        .stdout(predicate::str::contains("Contest: five ballots"))
        .stdout(predicate::str::contains("Round 1 (threshold 3)"))
        .stdout(predicate::str::contains("Round 2"))
        .stdout(predicate::str::contains("eliminated"))
        .stdout(predicate::str::contains("Winners: A"));
}

#[test]
fn quiet_prints_only_winners() {
    let dir = tempfile::tempdir().unwrap();
    let path = contest(&dir, FIVE_BALLOTS);

    rcv_tab()
        .arg(&path)
        .arg("--quiet")
        .assert()
        .success()
        .stdout(predicate::str::contains("Round").not())
        .stdout(predicate::str::contains("Winners: A"));
}

#[test]
fn json_outcome_is_written() {
    let dir = tempfile::tempdir().unwrap();
    let path = contest(&dir, FIVE_BALLOTS);
    let out = dir.path().join("out").join("outcome.json");

    rcv_tab().arg(&path).arg("--json").arg(&out).assert().success();

    let v: Value = serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(v["winners"], serde_json::json!(["A"]));
    assert_eq!(v["passes"][0]["rounds"].as_array().unwrap().len(), 2);
    assert_eq!(v["input_sha256"].as_str().unwrap().len(), 64);
}

#[test]
fn interactive_tie_without_answer_is_cancelled() {
    let dir = tempfile::tempdir().unwrap();
    let path = contest(&dir, INTERACTIVE_TIE);

    rcv_tab()
        .arg(&path)
        .write_stdin("")
        .assert()
        .code(6)
        .stderr(predicate::str::contains("cancelled"));
}

#[test]
fn interactive_tie_answered_on_the_console() {
    let dir = tempfile::tempdir().unwrap();
    let path = contest(&dir, INTERACTIVE_TIE);

    rcv_tab()
        .arg(&path)
        .write_stdin("2\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("1) A"))
        .stdout(predicate::str::contains("Winners: C"));
}

#[test]
fn scripted_tie_choice_skips_the_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let path = contest(&dir, INTERACTIVE_TIE);

    rcv_tab()
        .arg(&path)
        .args(["--tie-choice", "A"])
        .assert()
        .success()
        .stderr(predicate::str::contains("Tie:").not())
        .stdout(predicate::str::contains("Winners: C"));
}

#[test]
fn invalid_rules_exit_with_validation_code() {
    let dir = tempfile::tempdir().unwrap();
    let path = contest(&dir, r#"{ "rules": { "candidates": ["A"], "number_of_winners": 0 }, "ballots": [] }"#);

    rcv_tab().arg(&path).assert().code(2).stderr(predicate::str::contains("invalid input"));
}

#[test]
fn missing_contest_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    rcv_tab()
        .arg(dir.path().join("absent.json"))
        .assert()
        .code(2)
        .stderr(predicate::str::contains("file not found"));
}

#[test]
fn engine_abort_exits_with_code_five() {
    let dir = tempfile::tempdir().unwrap();
    let path = contest(
        &dir,
        r#"{ "rules": { "candidates": ["A", "B"], "minimum_vote_threshold": "5" },
             "ballots": [ { "rankings": [["A"]] }, { "rankings": [["B"]] } ] }"#,
    );

    rcv_tab().arg(&path).assert().code(5).stderr(predicate::str::contains("aborted"));
}
