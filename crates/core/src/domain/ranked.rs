use std::collections::BTreeMap;

use serde::Serialize;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RankedEntry<V> {
    pub key: String,
    pub value: V,
}

/// Ordered `(key, value)` pairs.
///
/// Built with [`RankedResult::ranked`], entries are sorted by descending value
/// with ties broken by ascending key. [`RankedResult::by_key`] keeps ascending
/// key order instead, for views where the key itself is the axis (months).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RankedResult<V> {
    entries: Vec<RankedEntry<V>>,
}

impl<V> Default for RankedResult<V> {
    fn default() -> Self {
        Self { entries: Vec::new() }
    }
}

impl<V: Ord> RankedResult<V> {
    /// `top_n == 0` keeps every entry.
    pub fn ranked(values: impl IntoIterator<Item = (String, V)>, top_n: usize) -> Self {
        let mut entries: Vec<RankedEntry<V>> =
            values.into_iter().map(|(key, value)| RankedEntry { key, value }).collect();

        entries.sort_by(|left, right| {
            right.value.cmp(&left.value).then_with(|| left.key.cmp(&right.key))
        });
        if top_n > 0 {
            entries.truncate(top_n);
        }

        Self { entries }
    }
}

impl<V> RankedResult<V> {
    pub fn by_key(values: BTreeMap<String, V>) -> Self {
        Self { entries: values.into_iter().map(|(key, value)| RankedEntry { key, value }).collect() }
    }

    pub fn entries(&self) -> &[RankedEntry<V>] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, RankedEntry<V>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.key.as_str())
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|entry| entry.key == key).map(|entry| &entry.value)
    }

    pub fn first(&self) -> Option<&RankedEntry<V>> {
        self.entries.first()
    }
}

impl<'a, V> IntoIterator for &'a RankedResult<V> {
    type Item = &'a RankedEntry<V>;
    type IntoIter = std::slice::Iter<'a, RankedEntry<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
