//! Conversion options

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

/// A named, inclusive range of forbidden code points.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharRange {
    /// Human-readable name used in log output
    pub name: String,
    /// First forbidden code point
    pub start: char,
    /// Last forbidden code point
    pub end: char,
}

impl CharRange {
    /// Returns true if `c` falls inside this range.
    pub fn contains(&self, c: char) -> bool {
        (self.start..=self.end).contains(&c)
    }
}

/// Options controlling how rows are turned into policies
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Label key bound to the namespace part of a `namespace/labels` cell
    pub namespace_label_key: String,
    /// Label cells starting with one of these are never split on `/`
    pub reserved_label_prefixes: Vec<String>,
    /// Protocol value meaning "any protocol"; omitted from port entries
    pub wildcard_protocol: String,
    /// Name suffix for groups whose key carries no labels
    pub fallback_name: String,
    /// `apiVersion` of generated documents
    pub api_version: String,
    /// `kind` of generated documents
    pub kind: String,
    /// Characters that must not appear anywhere in a row
    pub forbidden_ranges: Vec<CharRange>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            namespace_label_key: "io.kubernetes.pod.namespace".to_string(),
            reserved_label_prefixes: vec![
                "app.kubernetes.io/".to_string(),
                "kubernetes.io/".to_string(),
                "io.kubernetes.".to_string(),
                "io.cilium.".to_string(),
                "k8s:".to_string(),
            ],
            wildcard_protocol: "ANY".to_string(),
            fallback_name: "all-pods".to_string(),
            api_version: "cilium.io/v2".to_string(),
            kind: "CiliumNetworkPolicy".to_string(),
            forbidden_ranges: vec![CharRange {
                name: "Cyrillic".to_string(),
                start: '\u{0400}',
                end: '\u{052F}',
            }],
        }
    }
}

impl ConvertOptions {
    /// Load options from a YAML or JSON file; missing fields keep defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Ok(serde_json::from_str(&text)?)
        } else {
            Ok(serde_yaml::from_str(&text)?)
        }
    }

    /// Normalize a protocol cell: trimmed, upper-cased, empty means wildcard.
    pub fn normalize_protocol(&self, raw: &str) -> String {
        let protocol = raw.trim().to_uppercase();
        if protocol.is_empty() {
            self.wildcard_protocol.to_uppercase()
        } else {
            protocol
        }
    }

    /// Returns true if the (normalized) protocol is the wildcard.
    pub fn is_wildcard(&self, protocol: &str) -> bool {
        protocol.eq_ignore_ascii_case(&self.wildcard_protocol)
    }

    /// Returns the first forbidden range containing a character of `text`.
    pub fn forbidden_in(&self, text: &str) -> Option<&CharRange> {
        text.chars()
            .find_map(|c| self.forbidden_ranges.iter().find(|r| r.contains(c)))
    }
}
