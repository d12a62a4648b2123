//! Keyword classifier: case-insensitive substring membership against a
//! country's keyword set. No tokenization or stemming.

use crate::country::Country;
use crate::error::Error;

/// Normalized (trimmed, lowercase, sorted, deduped) keyword list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<String>,
}

impl KeywordSet {
    pub fn new<I, S>(iter: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut keywords: Vec<String> = iter
            .into_iter()
            .map(|s| s.as_ref().trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        keywords.sort();
        keywords.dedup();
        Self { keywords }
    }

    pub fn for_country(country: Country) -> Self {
        Self::new(country.keywords())
    }

    /// True if any keyword occurs in `text` (compared lowercased).
    pub fn matches(&self, text: &str) -> bool {
        let hay = text.to_lowercase();
        self.keywords.iter().any(|kw| hay.contains(kw.as_str()))
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

pub fn is_political(text: &str, country: Country) -> bool {
    KeywordSet::for_country(country).matches(text)
}

/// Classify by country identifier as stored in dataset files.
/// Unknown identifiers are an error.
pub fn classify(text: &str, country: &str) -> Result<bool, Error> {
    let c: Country = country.parse()?;
    Ok(is_political(text, c))
}
