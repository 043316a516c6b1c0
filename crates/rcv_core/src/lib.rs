//! rcv_core — Core types, rule domains, exact decimals, and the seeded tie RNG.
//!
//! This crate is **I/O-free**. It defines the stable types shared across the
//! engine (`rcv_algo`, `rcv_io`, `rcv_cli`):
//!
//! - Candidate / ballot identifiers and slice keys
//! - Exact decimal arithmetic with explicit rounding direction
//! - `ContestRules` and its closed rule enums, validated up front
//! - Seedable RNG (ChaCha20) for **ties only**
//!
//! Serialization derives are gated behind the `serde` feature.

#![forbid(unsafe_code)]

pub mod decimal;
pub mod errors;
pub mod ids;
pub mod rng;
pub mod rules;

pub use decimal::{Decimal, RoundingMode, VoteArithmetic};
pub use errors::{ConfigError, CoreError};
pub use ids::{BallotId, CandidateId, Slice, SliceKind};
pub use rng::{TieCrumb, TieRng};
pub use rules::{ContestRules, OvervoteRule, TiebreakMode, WinnerElectionMode};
