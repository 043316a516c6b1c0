// crates/rcv_core/src/rng.rs
//
// Seeded draws for random tiebreaks and the generated candidate permutation.
// The contest's `random_seed` is the only input; the same seed replays the
// same tie decisions in the same order.

use smol_str::SmolStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use rand_chacha::ChaCha20Rng;
use rand_core::{RngCore, SeedableRng};

/// Audit record of one random tie draw.
///
/// `ctx` names the tie (`"round:3/loser"`), `pick` is the position drawn among
/// the sorted tied candidates, and `word_index` counts 64-bit words taken from
/// the generator since the run started (1 for the first word). Replaying the
/// run with the same seed reaches the same word at the same tie.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TieCrumb {
    pub ctx: SmolStr,
    pub pick: usize,
    pub word_index: u128,
}

/// Tie generator owned by one tabulation run.
///
/// ChaCha20 keyed with the seed's little-endian bytes followed by 24 zero bytes.
#[derive(Debug, Clone)]
pub struct TieRng {
    chacha: ChaCha20Rng,
    words: u128,
}

impl TieRng {
    pub fn from_seed_u64(seed: u64) -> Self {
        let mut key = [0u8; 32];
        key[..8].copy_from_slice(&seed.to_le_bytes());
        Self { chacha: ChaCha20Rng::from_seed(key), words: 0 }
    }

    /// Words drawn so far by this run.
    pub fn words_drawn(&self) -> u128 {
        self.words
    }

    fn word(&mut self) -> u64 {
        self.words = self.words.saturating_add(1);
        self.chacha.next_u64()
    }

    /// Position in `0..n` plus the word that decided it; `None` for `n == 0`.
    ///
    /// Words below `2^64 mod n` are redrawn so every position is equally likely.
    fn position_below(&mut self, n: u64) -> Option<(u64, u128)> {
        if n == 0 {
            return None;
        }
        let reject_below = n.wrapping_neg() % n;
        loop {
            let w = self.word();
            if w >= reject_below {
                return Some((w % n, self.words));
            }
        }
    }

    /// Draw one of `n` tied candidates; the crumb records the draw under `ctx`.
    pub fn pick_index_with_crumb(&mut self, ctx: &str, n: usize) -> Option<(usize, TieCrumb)> {
        let (pos, word_index) = self.position_below(n as u64)?;
        let pick = pos as usize;
        Some((pick, TieCrumb { ctx: SmolStr::new(ctx), pick, word_index }))
    }

    /// Shuffle a candidate order (Fisher–Yates, last position first).
    pub fn shuffle_in_place<T>(&mut self, order: &mut [T]) {
        for last in (1..order.len()).rev() {
            if let Some((j, _)) = self.position_below(last as u64 + 1) {
                order.swap(last, j as usize);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tie_draws_nothing() {
        let mut rng = TieRng::from_seed_u64(9);
        assert!(rng.pick_index_with_crumb("round:1/winner", 0).is_none());
        assert_eq!(rng.words_drawn(), 0);
    }

    #[test]
    fn same_seed_replays_the_same_ties() {
        let mut a = TieRng::from_seed_u64(2024);
        let mut b = TieRng::from_seed_u64(2024);
        for round in 1..=12 {
            let ctx = format!("round:{round}/loser");
            let x = a.pick_index_with_crumb(&ctx, 3).unwrap();
            let y = b.pick_index_with_crumb(&ctx, 3).unwrap();
            assert_eq!(x, y);
            assert!(x.0 < 3);
        }
    }

    #[test]
    fn crumbs_count_words_across_ties() {
        let mut rng = TieRng::from_seed_u64(77);
        let (_, first) = rng.pick_index_with_crumb("round:1/loser", 4).unwrap();
        let (_, second) = rng.pick_index_with_crumb("round:2/winner", 2).unwrap();
        assert!(first.word_index >= 1);
        assert!(second.word_index > first.word_index);
        assert_eq!(second.ctx, "round:2/winner");
        assert_eq!(rng.words_drawn(), second.word_index);
    }

    #[test]
    fn shuffled_candidate_order_is_a_seeded_permutation() {
        let names = ["A", "B", "C", "D", "E", "F"];
        let mut x = names.to_vec();
        let mut y = names.to_vec();
        TieRng::from_seed_u64(5).shuffle_in_place(&mut x);
        TieRng::from_seed_u64(5).shuffle_in_place(&mut y);
        assert_eq!(x, y);
        let mut sorted = x.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, names);
    }
}
