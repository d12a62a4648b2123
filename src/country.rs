//! Static country table: subreddit plus political keyword set per country.

use crate::error::Error;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Country {
    Germany,
    Netherlands,
    France,
}

const GERMANY_KEYWORDS: &[&str] = &[
    "afd", "cdu", "spd", "csu", "gruene", "grüne", "linke",
    "merz", "scholz", "habeck", "migration", "flüchtlinge",
    "asyl", "klima", "heizungsgesetz", "bundestag", "ampel",
];

const NETHERLANDS_KEYWORDS: &[&str] = &[
    "vvd", "d66", "pvv", "wilders", "rutte", "klimaat",
    "immigratie", "verkiezingen", "kabinet",
];

const FRANCE_KEYWORDS: &[&str] = &[
    "macron", "rn", "mélenchon", "melenchon", "immigration",
    "climat", "gouvernement", "élection", "election", "assemblée", "assemblee",
];

impl Country {
    pub const ALL: [Country; 3] = [Country::Germany, Country::Netherlands, Country::France];

    pub fn as_str(self) -> &'static str {
        match self {
            Country::Germany => "germany",
            Country::Netherlands => "netherlands",
            Country::France => "france",
        }
    }

    /// Subreddit name without the `r/` prefix.
    pub fn subreddit(self) -> &'static str {
        match self {
            Country::Germany => "de",
            Country::Netherlands => "thenetherlands",
            Country::France => "france",
        }
    }

    pub fn keywords(self) -> &'static [&'static str] {
        match self {
            Country::Germany => GERMANY_KEYWORDS,
            Country::Netherlands => NETHERLANDS_KEYWORDS,
            Country::France => FRANCE_KEYWORDS,
        }
    }
}

impl fmt::Display for Country {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Accepts the country name or its subreddit (`de`, `r/de`). Anything else is
/// an error rather than a silent "not political".
impl FromStr for Country {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut n = s.trim().to_lowercase();
        if let Some(rest) = n.strip_prefix("r/") {
            n = rest.to_string();
        }
        Country::ALL
            .into_iter()
            .find(|c| c.as_str() == n || c.subreddit() == n)
            .ok_or_else(|| Error::UnknownCountry(s.to_string()))
    }
}
