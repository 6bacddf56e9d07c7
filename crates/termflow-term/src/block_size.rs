//! Requested output bounds and term lengths.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How many output elements a computation must produce before returning
/// control.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode", content = "count")]
pub enum BlockSize {
    /// Compute the complete result.
    All,
    /// Compute no more than the first `n` elements.
    Exactly(usize),
}

impl BlockSize {
    /// The bound as an element count, `None` meaning unbounded.
    pub fn limit(self) -> Option<usize> {
        match self {
            Self::All => None,
            Self::Exactly(n) => Some(n),
        }
    }

    pub fn is_zero(self) -> bool {
        self == Self::Exactly(0)
    }

    /// Whether `count` elements already satisfy this bound.
    pub fn is_satisfied_by(self, count: usize) -> bool {
        match self {
            Self::All => false,
            Self::Exactly(n) => count >= n,
        }
    }

    /// This bound as a demand on an upstream stage.
    ///
    /// An upstream stage that produced nothing would hand its successor an
    /// Empty term, which the successor rejects, so demand never drops below
    /// one element.
    pub fn upstream(self) -> Self {
        match self {
            Self::Exactly(0) => Self::Exactly(1),
            other => other,
        }
    }

    /// The tighter of two bounds.
    pub fn min(self, other: Self) -> Self {
        match (self, other) {
            (Self::All, other) => other,
            (this, Self::All) => this,
            (Self::Exactly(a), Self::Exactly(b)) => Self::Exactly(a.min(b)),
        }
    }

    /// Whether `length` elements stay within this bound.
    pub fn admits(self, length: Length) -> bool {
        match (self, length) {
            (Self::All, _) => true,
            (Self::Exactly(n), Length::Finite(len)) => len <= n,
            (Self::Exactly(_), Length::Infinite | Length::Unknown) => false,
        }
    }
}

impl Default for BlockSize {
    fn default() -> Self {
        Self::All
    }
}

impl fmt::Display for BlockSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => write!(f, "all"),
            Self::Exactly(n) => write!(f, "exactly({n})"),
        }
    }
}

impl std::str::FromStr for BlockSize {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        trimmed
            .parse::<usize>()
            .map(Self::Exactly)
            .map_err(|_| format!("invalid block size: {s} (expected `all` or a count)"))
    }
}

/// The logical length of a term.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "count")]
pub enum Length {
    Finite(usize),
    Infinite,
    /// Not yet known: the term is still pending.
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn min_prefers_the_bounded_side() {
        assert_eq!(BlockSize::All.min(BlockSize::Exactly(3)), BlockSize::Exactly(3));
        assert_eq!(BlockSize::Exactly(5).min(BlockSize::Exactly(3)), BlockSize::Exactly(3));
        assert_eq!(BlockSize::All.min(BlockSize::All), BlockSize::All);
    }

    #[test]
    fn admits_checks_finite_lengths_only() {
        assert!(BlockSize::Exactly(2).admits(Length::Finite(2)));
        assert!(!BlockSize::Exactly(2).admits(Length::Finite(3)));
        assert!(!BlockSize::Exactly(2).admits(Length::Infinite));
        assert!(BlockSize::All.admits(Length::Infinite));
    }

    #[test]
    fn upstream_demand_is_at_least_one_element() {
        assert_eq!(BlockSize::Exactly(0).upstream(), BlockSize::Exactly(1));
        assert_eq!(BlockSize::Exactly(4).upstream(), BlockSize::Exactly(4));
        assert_eq!(BlockSize::All.upstream(), BlockSize::All);
    }

    #[test]
    fn parses_from_cli_text() {
        assert_eq!("all".parse::<BlockSize>(), Ok(BlockSize::All));
        assert_eq!(" 7 ".parse::<BlockSize>(), Ok(BlockSize::Exactly(7)));
        assert!("-1".parse::<BlockSize>().is_err());
    }
}
