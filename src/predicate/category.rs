use std::collections::BTreeSet;

use arrow::{
    array::{Array, StringArray},
    buffer::BooleanBuffer,
};

use crate::mask::Mask;

/// Closed set of accepted classification labels. Matching is exact and case-sensitive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CategorySet(BTreeSet<String>);

impl CategorySet {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true when `label` is accepted.
    #[must_use]
    pub fn contains(&self, label: &str) -> bool {
        self.0.contains(label)
    }

    /// Adds a label.
    pub fn insert(&mut self, label: impl Into<String>) -> bool {
        self.0.insert(label.into())
    }

    /// Returns the union of both sets.
    #[must_use]
    pub fn union(&self, other: &CategorySet) -> CategorySet {
        Self(self.0.union(&other.0).cloned().collect())
    }

    /// Number of accepted labels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when nothing is accepted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Accepted labels in lexical order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl<S> FromIterator<S> for CategorySet
where
    S: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl<S> Extend<S> for CategorySet
where
    S: Into<String>,
{
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

/// Rows whose label satisfies `accept`; null labels never match.
pub fn labels_matching<F>(labels: &StringArray, accept: F) -> Mask
where
    F: Fn(&str) -> bool,
{
    Mask::from_buffer(BooleanBuffer::collect_bool(labels.len(), |i| {
        labels.is_valid(i) && accept(labels.value(i))
    }))
}

/// Rows whose label belongs to `accepted`.
pub fn category_membership(labels: &StringArray, accepted: &CategorySet) -> Mask {
    labels_matching(labels, |label| accepted.contains(label))
}
