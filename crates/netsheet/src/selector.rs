//! Cell classification.
//!
//! A counterpart cell is classified by walking [`CLASSIFIERS`] in order; the
//! first rule whose predicate accepts the trimmed cell builds the selector.

use std::net::Ipv4Addr;
use std::sync::LazyLock;

use regex_lite::Regex;

use crate::labels::{Labels, parse_labels, split_items};
use crate::options::ConvertOptions;

/// The classified form of a counterpart cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Selector {
    /// Blank cell
    Empty,
    /// One address block, always with an explicit prefix length
    CidrSingle(String),
    /// Several address blocks, in cell order
    CidrList(Vec<String>),
    /// Lower-cased domain name
    Fqdn(String),
    /// Endpoint labels
    LabelSet(Labels),
}

impl Selector {
    /// Short name of the selector kind, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Selector::Empty => "empty",
            Selector::CidrSingle(_) => "cidr",
            Selector::CidrList(_) => "cidr-list",
            Selector::Fqdn(_) => "fqdn",
            Selector::LabelSet(_) => "labels",
        }
    }
}

/// One entry of the classification table.
#[derive(Debug)]
pub(crate) struct Classifier {
    pub(crate) name: &'static str,
    predicate: fn(&str) -> bool,
    build: fn(&str, &ConvertOptions) -> Selector,
}

/// Classification rules in priority order. The last rule accepts anything.
pub(crate) const CLASSIFIERS: &[Classifier] = &[
    Classifier {
        name: "empty",
        predicate: str::is_empty,
        build: build_empty,
    },
    Classifier {
        name: "cidr-list",
        predicate: is_cidr_list,
        build: build_cidr_list,
    },
    Classifier {
        name: "cidr-prefixed",
        predicate: is_prefixed_cidr,
        build: build_single_cidr,
    },
    Classifier {
        name: "cidr-bare",
        predicate: is_bare_address,
        build: build_single_cidr,
    },
    Classifier {
        name: "fqdn",
        predicate: is_fqdn,
        build: build_fqdn,
    },
    Classifier {
        name: "labels",
        predicate: accept_any,
        build: build_labels,
    },
];

#[allow(clippy::unwrap_used)]
static DOTTED_QUAD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3}(?:\.\d{1,3}){3})(?:/(\d{1,2}))?$").unwrap());

/// Match a full dotted-quad address with an optional prefix length.
fn parse_cidr(item: &str) -> Option<(Ipv4Addr, Option<u8>)> {
    let caps = DOTTED_QUAD.captures(item)?;
    let addr: Ipv4Addr = caps.get(1)?.as_str().parse().ok()?;
    match caps.get(2) {
        Some(prefix) => {
            let prefix: u8 = prefix.as_str().parse().ok()?;
            (prefix <= 32).then_some((addr, Some(prefix)))
        }
        None => Some((addr, None)),
    }
}

/// `a.b.c.d` becomes `a.b.c.d/32`; prefixed blocks are kept as written.
fn normalize_cidr(item: &str) -> Option<String> {
    let (addr, prefix) = parse_cidr(item)?;
    Some(format!("{addr}/{}", prefix.unwrap_or(32)))
}

fn build_empty(_: &str, _: &ConvertOptions) -> Selector {
    Selector::Empty
}

fn build_cidr_list(cell: &str, _: &ConvertOptions) -> Selector {
    Selector::CidrList(split_items(cell).filter_map(normalize_cidr).collect())
}

fn build_single_cidr(cell: &str, _: &ConvertOptions) -> Selector {
    match normalize_cidr(cell) {
        Some(cidr) => Selector::CidrSingle(cidr),
        None => Selector::Empty,
    }
}

fn is_cidr_list(cell: &str) -> bool {
    let items: Vec<&str> = split_items(cell).collect();
    items.len() > 1 && items.iter().all(|item| parse_cidr(item).is_some())
}

fn is_prefixed_cidr(cell: &str) -> bool {
    matches!(parse_cidr(cell), Some((_, Some(_))))
}

fn is_bare_address(cell: &str) -> bool {
    matches!(parse_cidr(cell), Some((_, None)))
}

fn is_fqdn(cell: &str) -> bool {
    cell.contains('.') && !cell.contains(':') && cell.chars().any(char::is_alphabetic)
}

fn build_fqdn(cell: &str, _: &ConvertOptions) -> Selector {
    Selector::Fqdn(cell.to_lowercase())
}

fn accept_any(_: &str) -> bool {
    true
}

fn build_labels(cell: &str, options: &ConvertOptions) -> Selector {
    Selector::LabelSet(parse_labels(cell, options))
}

/// Classify a raw cell.
pub fn classify(raw: &str, options: &ConvertOptions) -> Selector {
    let cell = raw.trim();
    CLASSIFIERS
        .iter()
        .find(|rule| (rule.predicate)(cell))
        .map(|rule| {
            tracing::trace!(cell, rule = rule.name, "classified cell");
            (rule.build)(cell, options)
        })
        .unwrap_or(Selector::Empty)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classify(raw: &str) -> Selector {
        super::classify(raw, &ConvertOptions::default())
    }

    #[test]
    fn test_classifier_table_order() {
        let names: Vec<_> = CLASSIFIERS.iter().map(|rule| rule.name).collect();
        assert_eq!(
            names,
            vec!["empty", "cidr-list", "cidr-prefixed", "cidr-bare", "fqdn", "labels"]
        );
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let cases = [
            ("", "empty"),
            ("10.0.0.1\n10.0.0.2/8", "cidr-list"),
            ("10.0.0.0/8", "cidr-prefixed"),
            ("10.0.0.1", "cidr-bare"),
            ("db.example.com", "fqdn"),
            ("app:web", "labels"),
        ];
        for (cell, expected) in cases {
            let rule = CLASSIFIERS
                .iter()
                .find(|rule| (rule.predicate)(cell))
                .map(|rule| rule.name);
            assert_eq!(rule, Some(expected), "cell {cell:?}");
        }
    }

    #[test]
    fn test_empty() {
        assert_eq!(classify("   \n "), Selector::Empty);
    }

    #[test]
    fn test_bare_address_gets_host_prefix() {
        assert_eq!(classify("10.0.0.1"), Selector::CidrSingle("10.0.0.1/32".into()));
    }

    #[test]
    fn test_prefixed_address_is_kept() {
        assert_eq!(
            classify(" 10.0.0.1/24 "),
            Selector::CidrSingle("10.0.0.1/24".into())
        );
    }

    #[test]
    fn test_address_list() {
        assert_eq!(
            classify("10.0.0.1,10.0.0.2"),
            Selector::CidrList(vec!["10.0.0.1/32".into(), "10.0.0.2/32".into()])
        );
        assert_eq!(
            classify("10.0.0.0/8\n192.168.1.1"),
            Selector::CidrList(vec!["10.0.0.0/8".into(), "192.168.1.1/32".into()])
        );
    }

    #[test]
    fn test_trailing_comma_address_is_not_a_cidr() {
        // One item is not a list, and the unsplit cell is not a dotted quad.
        assert_eq!(classify("10.0.0.1,"), Selector::LabelSet(Labels::new()));
    }

    #[test]
    fn test_fqdn_is_lowercased() {
        assert_eq!(
            classify("api.internal.example"),
            Selector::Fqdn("api.internal.example".into())
        );
        assert_eq!(classify("API.Example.COM"), Selector::Fqdn("api.example.com".into()));
    }

    #[test]
    fn test_label_set() {
        assert_eq!(
            classify("app:web,env:prod"),
            Selector::LabelSet(Labels::from_iter([("app", "web"), ("env", "prod")]))
        );
    }

    #[test]
    fn test_dotted_label_key_stays_label_set() {
        assert_eq!(
            classify("app.kubernetes.io/name:prometheus"),
            Selector::LabelSet(Labels::from_iter([("app.kubernetes.io/name", "prometheus")]))
        );
    }

    #[test]
    fn test_malformed_addresses_fall_through_to_labels() {
        for cell in ["10.0.0", "300.1.1.1", "10.0.0.1/33", "10.0.0.1/"] {
            assert!(
                matches!(classify(cell), Selector::LabelSet(_)),
                "cell {cell:?} should be a label set"
            );
        }
    }

    #[test]
    fn test_mixed_address_and_name_list_is_not_cidr_list() {
        assert!(matches!(
            classify("10.0.0.1, db.example.com"),
            Selector::Fqdn(_)
        ));
    }
}
