//! Property tests over randomly generated ballot sets.

mod common;

use common::*;
use proptest::prelude::*;
use rcv_algo::Ballot;
use rcv_core::{Decimal, WinnerElectionMode};

const POOL: [&str; 5] = ["A", "B", "C", "D", "E"];

fn ballot_strategy() -> impl Strategy<Value = Vec<Ballot>> {
    let one = proptest::sample::subsequence(POOL.to_vec(), 0..=4)
        .prop_shuffle()
        .prop_map(|choices| Ballot::ranked(ids(&choices)));
    proptest::collection::vec(one, 1..40)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn single_winner_rounds_conserve_ballots(bs in ballot_strategy(), seed in any::<u64>()) {
        let mut r = rules(&POOL);
        r.random_seed = Some(seed);
        let total = Decimal::from(bs.len());
        let out = run(r, bs).unwrap();

        prop_assert_eq!(out.winners.len(), 1);
        for t in round_totals(&out) {
            prop_assert_eq!(t, total.clone());
        }

        let inactive: Vec<Decimal> = out.rounds.iter().map(|r| r.inactive_ballot_sum().clone()).collect();
        for pair in inactive.windows(2) {
            prop_assert!(pair[0] <= pair[1]);
        }

        for (cand, eliminated) in &out.eliminated_round {
            for later in out.rounds.iter().filter(|r| r.round() > *eliminated) {
                prop_assert!(!later.candidate_tallies().contains_key(cand));
            }
        }
    }

    #[test]
    fn same_seed_same_outcome(bs in ballot_strategy(), seed in any::<u64>()) {
        let mut r = rules(&POOL);
        r.random_seed = Some(seed);
        let first = run(r.clone(), bs.clone()).unwrap();
        let second = run(r, bs).unwrap();
        prop_assert_eq!(first.winners, second.winners);
        prop_assert_eq!(first.eliminated_round, second.eliminated_round);
        prop_assert_eq!(first.tiebreaks, second.tiebreaks);
        prop_assert_eq!(first.rounds, second.rounds);
    }

    #[test]
    fn surplus_rounds_conserve_ballots(bs in ballot_strategy(), seed in any::<u64>()) {
        let mut r = rules(&POOL);
        r.random_seed = Some(seed);
        r.number_of_winners = 2;
        r.winner_election_mode = WinnerElectionMode::MultiSeatAllowMultipleWinnersPerRound;
        let total = Decimal::from(bs.len());
        let out = run(r, bs).unwrap();

        prop_assert_eq!(out.winners.len(), 2);
        for t in round_totals(&out) {
            prop_assert_eq!(t, total.clone());
        }
    }
}
