//! Label cell parsing.
//!
//! A label cell holds `key:value` pairs separated by commas or newlines,
//! e.g. `app:web, env:prod`. A cell of the form `namespace/key:value` binds
//! the part before the first `/` to the namespace label key.

use indexmap::IndexMap;
use serde::Serialize;

use crate::options::ConvertOptions;

/// An insertion-ordered label mapping.
///
/// Re-inserting an existing key replaces its value in place, so the key keeps
/// its original position.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Labels(IndexMap<String, String>);

impl Labels {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a label.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Look up a label value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Number of labels.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if there are no labels.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Iterate over values in insertion order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.0.values().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Labels {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Split a cell on commas and newlines into trimmed, non-empty items.
pub(crate) fn split_items(raw: &str) -> impl Iterator<Item = &str> {
    raw.split([',', '\n', '\r'])
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

/// Parse plain `key:value` items. Items without `:` are dropped and the
/// value keeps everything after the first `:`.
fn parse_pairs(raw: &str, labels: &mut Labels) {
    for item in split_items(raw) {
        if let Some((key, value)) = item.split_once(':') {
            labels.insert(key.trim(), value.trim());
        }
    }
}

/// Parse a label cell, recognizing the `namespace/labels` compound form.
pub fn parse_labels(raw: &str, options: &ConvertOptions) -> Labels {
    let raw = raw.trim();
    let mut labels = Labels::new();

    let reserved = options
        .reserved_label_prefixes
        .iter()
        .any(|prefix| raw.starts_with(prefix.as_str()));

    match raw.split_once('/') {
        Some((namespace, rest)) if !reserved => {
            let namespace = namespace.trim();
            if !namespace.is_empty() {
                labels.insert(options.namespace_label_key.as_str(), namespace);
            }
            parse_pairs(rest, &mut labels);
        }
        _ => parse_pairs(raw, &mut labels),
    }

    labels
}
