use serde::{Deserialize, Deserializer};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::num::NonZeroUsize;
use std::str::FromStr;

/// How many identifier directories to process.
///
/// Parsing is deliberately forgiving: anything that is not a positive
/// integer means [`All`](Self::All), the same as an explicit `"all"`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Limit {
    #[default]
    All,
    First(NonZeroUsize),
}
impl Limit {
    /// Keeps only the first `n` items, or all of them.
    pub fn apply<T>(&self, mut items: Vec<T>) -> Vec<T> {
        if let Self::First(n) = self {
            items.truncate(n.get());
        }
        items
    }
}
impl FromStr for Limit {
    type Err = std::convert::Infallible;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        Ok(match s.parse::<usize>().ok().and_then(NonZeroUsize::new) {
            Some(n) => Self::First(n),
            None => {
                tracing::warn!(limit = s, "Ignoring limit that is not a positive integer, processing all");
                Self::All
            },
        })
    }
}
impl Display for Limit {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::All => f.write_str("all"),
            Self::First(n) => write!(f, "{n}"),
        }
    }
}
impl<'de> Deserialize<'de> for Limit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Text(String),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Number(n) => usize::try_from(n).ok().and_then(NonZeroUsize::new).map_or(Self::All, Self::First),
            // Infallible.
            Raw::Text(s) => s.parse().unwrap_or_default(),
        })
    }
}
