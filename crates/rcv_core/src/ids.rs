//! Identifier newtypes (`CandidateId`, `BallotId`) and slice keys.
//!
//! Identifiers are cheap to clone (`SmolStr`) because every ballot carries
//! candidate ids and every round tally keys on them.

use core::fmt;
use core::str::FromStr;

use smol_str::SmolStr;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

const MAX_ID_LEN: usize = 256;

fn is_id(s: &str) -> bool {
    !s.is_empty() && s.len() <= MAX_ID_LEN && s.trim() == s && !s.chars().any(char::is_control)
}

macro_rules! def_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
        #[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
        #[cfg_attr(feature = "serde", serde(try_from = "String", into = "String"))]
        pub struct $name(SmolStr);

        impl $name {
            /// Validating constructor: non-empty, no surrounding whitespace, no control chars.
            pub fn new(s: &str) -> Result<Self, CoreError> {
                if is_id(s) { Ok(Self(SmolStr::new(s))) } else { Err(CoreError::InvalidId(s.to_string())) }
            }

            pub fn as_str(&self) -> &str { self.0.as_str() }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
        }

        impl FromStr for $name {
            type Err = CoreError;
            fn from_str(s: &str) -> Result<Self, Self::Err> { Self::new(s) }
        }

        impl TryFrom<String> for $name {
            type Error = CoreError;
            fn try_from(s: String) -> Result<Self, Self::Error> { Self::new(&s) }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String { id.0.to_string() }
        }
    };
}

def_id!(
    /// Candidate identifier as it appears on ballots and in the rules.
    CandidateId
);
def_id!(
    /// Cast-vote-record identifier, used only for audit output.
    BallotId
);

/// Reporting subdivision kinds a contest can be additionally broken down by.
#[derive(Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum SliceKind {
    Precinct,
    Batch,
}

impl fmt::Display for SliceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SliceKind::Precinct => f.write_str("precinct"),
            SliceKind::Batch => f.write_str("batch"),
        }
    }
}

/// One slice value, e.g. `precinct:P-104`.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Slice {
    pub kind: SliceKind,
    pub key: SmolStr,
}

impl Slice {
    pub fn new(kind: SliceKind, key: &str) -> Self {
        Self { kind, key: SmolStr::new(key) }
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_names_with_inner_spaces() {
        let id = CandidateId::new("Jane Q. Doe").unwrap();
        assert_eq!(id.as_str(), "Jane Q. Doe");
        assert_eq!(id.to_string(), "Jane Q. Doe");
    }

    #[test]
    fn rejects_blank_and_padded_ids() {
        assert!(CandidateId::new("").is_err());
        assert!(CandidateId::new(" A").is_err());
        assert!(BallotId::new("b\n1").is_err());
    }

    #[test]
    fn ordering_is_lexicographic() {
        let mut ids: Vec<CandidateId> = ["b", "C", "a"].iter().map(|s| s.parse().unwrap()).collect();
        ids.sort();
        let names: Vec<&str> = ids.iter().map(CandidateId::as_str).collect();
        assert_eq!(names, ["C", "a", "b"]);
    }

    #[test]
    fn slice_display() {
        assert_eq!(Slice::new(SliceKind::Precinct, "P-1").to_string(), "precinct:P-1");
    }
}
