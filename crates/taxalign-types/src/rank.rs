use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Taxonomic rank, ordered from the highest grouping down.
///
/// The ordering follows declaration order: `Domain` sorts before `Kingdom`,
/// which sorts before `Phylum`, and so on. `Unranked` sorts after every named
/// rank. The engine treats ranks as opaque identity components; the ordering
/// exists for stable report output, not for taxonomic validation.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Rank {
    Domain,
    Kingdom,
    Phylum,
    Class,
    Order,
    Family,
    Subfamily,
    Tribe,
    Genus,
    Subgenus,
    Species,
    Subspecies,
    Variety,
    /// A node whose source hierarchy carries no rank information.
    Unranked,
}

impl Rank {
    /// All named ranks in order, excluding `Unranked`.
    pub const NAMED: [Rank; 13] = [
        Rank::Domain,
        Rank::Kingdom,
        Rank::Phylum,
        Rank::Class,
        Rank::Order,
        Rank::Family,
        Rank::Subfamily,
        Rank::Tribe,
        Rank::Genus,
        Rank::Subgenus,
        Rank::Species,
        Rank::Subspecies,
        Rank::Variety,
    ];

    /// The lowercase name used for display and parsing.
    pub fn as_str(&self) -> &'static str {
        match self {
            Rank::Domain => "domain",
            Rank::Kingdom => "kingdom",
            Rank::Phylum => "phylum",
            Rank::Class => "class",
            Rank::Order => "order",
            Rank::Family => "family",
            Rank::Subfamily => "subfamily",
            Rank::Tribe => "tribe",
            Rank::Genus => "genus",
            Rank::Subgenus => "subgenus",
            Rank::Species => "species",
            Rank::Subspecies => "subspecies",
            Rank::Variety => "variety",
            Rank::Unranked => "unranked",
        }
    }

    /// Returns `true` if `self` is a strictly lower (more specific) rank
    /// than `other`. `Unranked` is never below or above a named rank.
    pub fn is_below(&self, other: &Rank) -> bool {
        if *self == Rank::Unranked || *other == Rank::Unranked {
            return false;
        }
        self > other
    }

    /// Stable single-byte discriminant used in identity key derivation.
    pub(crate) fn discriminant(&self) -> u8 {
        match self {
            Rank::Domain => 0,
            Rank::Kingdom => 1,
            Rank::Phylum => 2,
            Rank::Class => 3,
            Rank::Order => 4,
            Rank::Family => 5,
            Rank::Subfamily => 6,
            Rank::Tribe => 7,
            Rank::Genus => 8,
            Rank::Subgenus => 9,
            Rank::Species => 10,
            Rank::Subspecies => 11,
            Rank::Variety => 12,
            Rank::Unranked => 255,
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Rank {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        for rank in Rank::NAMED {
            if rank.as_str() == lower {
                return Ok(rank);
            }
        }
        if lower == "unranked" || lower.is_empty() {
            return Ok(Rank::Unranked);
        }
        Err(TypeError::UnknownRank(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_follows_hierarchy() {
        assert!(Rank::Kingdom < Rank::Genus);
        assert!(Rank::Genus < Rank::Species);
        assert!(Rank::Species < Rank::Unranked);
    }

    #[test]
    fn is_below_is_strict() {
        assert!(Rank::Species.is_below(&Rank::Genus));
        assert!(!Rank::Genus.is_below(&Rank::Genus));
        assert!(!Rank::Genus.is_below(&Rank::Species));
    }

    #[test]
    fn unranked_is_never_below() {
        assert!(!Rank::Unranked.is_below(&Rank::Kingdom));
        assert!(!Rank::Species.is_below(&Rank::Unranked));
    }

    #[test]
    fn parse_roundtrip() {
        for rank in Rank::NAMED {
            assert_eq!(rank.as_str().parse::<Rank>().unwrap(), rank);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("Genus".parse::<Rank>().unwrap(), Rank::Genus);
        assert_eq!("  SPECIES ".parse::<Rank>().unwrap(), Rank::Species);
    }

    #[test]
    fn empty_parses_as_unranked() {
        assert_eq!("".parse::<Rank>().unwrap(), Rank::Unranked);
    }

    #[test]
    fn unknown_rank_is_rejected() {
        let err = "cohort9".parse::<Rank>().unwrap_err();
        assert!(matches!(err, TypeError::UnknownRank(_)));
    }

    #[test]
    fn discriminants_are_distinct() {
        let mut seen = std::collections::HashSet::new();
        for rank in Rank::NAMED {
            assert!(seen.insert(rank.discriminant()));
        }
        assert!(seen.insert(Rank::Unranked.discriminant()));
    }
}
