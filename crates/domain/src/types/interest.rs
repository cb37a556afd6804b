use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Normalized set of user interests (lower-cased, trimmed, deduplicated).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct InterestSet(BTreeSet<String>);

impl InterestSet {
    /// Splits free text on `,` and `;`.
    pub fn parse(raw: &str) -> Self {
        raw.split([',', ';']).collect()
    }

    /// `true` when no interest survived normalization.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of distinct interests.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Membership test against an already lower-cased tag.
    pub fn contains(&self, tag: &str) -> bool {
        self.0.contains(tag)
    }

    /// Interests in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Underlying sorted set.
    pub const fn as_set(&self) -> &BTreeSet<String> {
        &self.0
    }
}

impl<S: AsRef<str>> FromIterator<S> for InterestSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }
}

impl From<Vec<String>> for InterestSet {
    fn from(value: Vec<String>) -> Self {
        value.into_iter().collect()
    }
}

impl From<InterestSet> for Vec<String> {
    fn from(value: InterestSet) -> Self {
        value.0.into_iter().collect()
    }
}
