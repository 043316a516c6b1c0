//! Multi-seat tabulation: surplus transfer, bottoms-up modes, sequential seats.

mod common;

use common::*;
use rcv_algo::{tabulate_contest, InactiveReason, LedgerNode, ScriptedOracle};
use rcv_core::{Decimal, WinnerElectionMode};

fn multi(candidates: &[&str], seats: u32, mode: WinnerElectionMode) -> rcv_core::ContestRules {
    let mut r = rules(candidates);
    r.number_of_winners = seats;
    r.winner_election_mode = mode;
    r
}

#[test]
fn surplus_moves_two_twelfths_and_books_the_residual() {
    let r = multi(&["A", "B", "C"], 2, WinnerElectionMode::MultiSeatAllowMultipleWinnersPerRound);
    let bs = ballots(&[(12, &["A", "B"]), (8, &["C"]), (7, &["B"])]);

    let out = run(r, bs).unwrap();
    assert_eq!(names(&out.winners), ["A", "B"]);
    assert_eq!(out.elected_round[&c("A")], 1);
    // B (8.9992) and C (8) are the last two for one seat: B takes it in round 2.
    assert_eq!(out.elected_round[&c("B")], 2);
    assert!(out.eliminated_round.is_empty());
    assert_eq!(out.round_count(), 3);

    // Round-1 quota: floor(27 / 3) + 1.
    assert_eq!(*out.rounds[0].winning_threshold(), d("10"));
    assert_eq!(*out.rounds[2].winning_threshold(), d("10"));

    let r2 = &out.rounds[1];
    assert_eq!(tally_of(r2, "A"), d("10"));
    assert_eq!(tally_of(r2, "B"), d("8.9992"));
    assert_eq!(out.residual_surplus[&2], d("0.0008"));
    assert_eq!(out.ledger.amount(2, &LedgerNode::Candidate(c("A")), &LedgerNode::Residual), d("0.0008"));
    assert_eq!(
        out.ledger.amount(2, &LedgerNode::Candidate(c("A")), &LedgerNode::Candidate(c("B"))),
        d("1.9992")
    );
    // Residual is ledgered once, in the round after election.
    assert_eq!(out.ledger.amount(3, &LedgerNode::Candidate(c("A")), &LedgerNode::Residual), Decimal::zero());

    let last = out.final_round().unwrap();
    assert_eq!(tally_of(last, "C"), d("8"));
    assert_eq!(tally_of(last, "B"), d("8.9992"));
    assert_eq!(last.inactive_by_reason()[&InactiveReason::ExhaustedChoice], Decimal::zero());
    assert!(out.snapshots.is_empty());

    for total in round_totals(&out) {
        assert_eq!(total, d("27"));
    }
}

#[test]
fn one_winner_per_round_takes_the_highest_first() {
    let r = multi(&["A", "B", "C"], 2, WinnerElectionMode::MultiSeatAllowOnlyOneWinnerPerRound);
    let bs = ballots(&[(6, &["A", "C"]), (5, &["B", "C"]), (1, &["C"])]);

    let out = run(r, bs).unwrap();
    assert_eq!(names(&out.winners), ["A", "B"]);
    assert_eq!(out.elected_round[&c("A")], 1);
    assert_eq!(out.elected_round[&c("B")], 2);
    assert_eq!(tally_of(&out.rounds[1], "C"), d("1.9996"));
    assert_eq!(out.residual_surplus[&2], d("0.0004"));
    assert_eq!(out.round_count(), 3);
    for total in round_totals(&out) {
        assert_eq!(total, d("12"));
    }
}

#[test]
fn hare_quota_for_nine_votes_two_seats() {
    let mut r = multi(&["A", "B", "C"], 2, WinnerElectionMode::MultiSeatAllowMultipleWinnersPerRound);
    r.hare_quota = true;
    let bs = ballots(&[(5, &["A", "B"]), (2, &["B"]), (2, &["C"])]);

    let out = run(r, bs).unwrap();
    assert_eq!(*out.rounds[0].winning_threshold(), d("5"));
    assert_eq!(out.elected_round[&c("A")], 1);
}

#[test]
fn bottoms_up_until_n_elects_the_last_two_standing() {
    let r = multi(&["A", "B", "C", "D"], 2, WinnerElectionMode::MultiSeatBottomsUpUntilNWinners);
    let bs = ballots(&[(5, &["A"]), (4, &["B"]), (3, &["C", "A"]), (1, &["D", "A"])]);

    let out = run(r, bs).unwrap();
    assert_eq!(out.eliminated_round[&c("D")], 1);
    assert_eq!(out.eliminated_round[&c("C")], 2);
    assert_eq!(out.round_count(), 3);
    assert_eq!(names(&out.winners), ["A", "B"]);
    assert!(out.residual_surplus.is_empty());
}

#[test]
fn batch_never_leaves_fewer_candidates_than_seats() {
    let mut r = multi(&["A", "B", "C", "D", "E"], 3, WinnerElectionMode::MultiSeatBottomsUpUntilNWinners);
    r.batch_elimination = true;
    let bs = ballots(&[(1, &["A"]), (2, &["B"]), (4, &["C"]), (10, &["D"]), (20, &["E"])]);

    let out = run(r, bs).unwrap();
    assert_eq!(out.eliminated_round[&c("A")], 1);
    assert_eq!(out.eliminated_round[&c("B")], 2);
    assert_eq!(out.round_count(), 3);
    assert_eq!(names(&out.winners), ["E", "D", "C"]);
}

#[test]
fn batch_runs_when_enough_candidates_stay() {
    let mut r = multi(&["A", "B", "C", "D", "E"], 2, WinnerElectionMode::MultiSeatBottomsUpUntilNWinners);
    r.batch_elimination = true;
    let bs = ballots(&[(1, &["A", "D"]), (1, &["B", "D"]), (2, &["C", "E"]), (10, &["D"]), (12, &["E"])]);

    let out = run(r, bs).unwrap();
    for loser in ["A", "B", "C"] {
        assert_eq!(out.eliminated_round[&c(loser)], 1, "{loser}");
    }
    assert_eq!(out.round_count(), 2);
    assert_eq!(names(&out.winners), ["E", "D"]);
}

#[test]
fn bottoms_up_percentage_elects_everyone_above_the_bar() {
    let r = multi(
        &["A", "B", "C", "D"],
        1,
        WinnerElectionMode::MultiSeatBottomsUpUsingPercentageThreshold(d("0.25")),
    );
    let bs = ballots(&[(5, &["A"]), (3, &["B"]), (2, &["C"]), (1, &["D", "C"])]);

    let out = run(r, bs).unwrap();
    assert_eq!(*out.rounds[0].winning_threshold(), d("2.75"));
    assert_eq!(out.eliminated_round[&c("D")], 1);
    assert_eq!(out.round_count(), 2);
    assert_eq!(names(&out.winners), ["A", "B", "C"]);
}

#[test]
fn sequential_seats_rerun_without_earlier_winners() {
    let r = multi(&["A", "B", "C"], 2, WinnerElectionMode::MultiSeatSequentialWinnerTakesAll);
    let bs = ballots(&[(4, &["A", "B"]), (3, &["B", "C"]), (2, &["C", "B"])]);

    let out = tabulate_contest(&r, &bs, &mut ScriptedOracle::empty()).unwrap();
    assert_eq!(out.passes.len(), 2);
    assert_eq!(names(&out.winners), ["B", "C"]);

    let first = &out.passes[0];
    assert_eq!(first.eliminated_round[&c("C")], 1);
    assert_eq!(tally_of(&first.rounds[1], "B"), d("5"));

    let second = &out.passes[1];
    assert_eq!(second.round_count(), 1);
    assert_eq!(tally_of(&second.rounds[0], "C"), d("5"));
    assert!(!second.rounds[0].candidate_tallies().contains_key(&c("B")));
}

#[test]
fn non_sequential_contest_is_a_single_pass() {
    let r = multi(&["A", "B", "C"], 2, WinnerElectionMode::MultiSeatAllowMultipleWinnersPerRound);
    let bs = ballots(&[(12, &["A", "B"]), (8, &["C"]), (7, &["B"])]);
    let out = tabulate_contest(&r, &bs, &mut ScriptedOracle::empty()).unwrap();
    assert_eq!(out.passes.len(), 1);
    assert_eq!(out.winners, out.passes[0].winners);
}
