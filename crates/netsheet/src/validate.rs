//! Row validation and baseline coverage.
//!
//! Fatal checks run first and each one reports every offending row. The
//! remaining checks only produce [`Warning`]s.

use std::collections::HashMap;
use std::fmt;

use indexmap::IndexMap;

use crate::baseline::{Baseline, BaselineSignature};
use crate::document::Document;
use crate::error::ConvertError;
use crate::options::ConvertOptions;
use crate::row::{Direction, Extraction, RowRecord, check_namespace_name};
use crate::translate::parse_ports;

/// A non-fatal finding. The conversion still produces output.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Warning {
    /// A later row repeats the rule signature of an earlier one.
    DuplicateRule {
        /// Row of the first occurrence
        first_row: usize,
        /// Row of the repetition
        duplicate_row: usize,
    },
    /// The direction cell is neither `ingress` nor `egress`; the row is left
    /// out of the generated policy.
    UnrecognizedDirection {
        /// Offending row
        row: usize,
        /// Direction as found (lower-cased)
        value: String,
    },
    /// Several output documents share a name.
    NameCollision {
        /// The shared name
        name: String,
        /// How many documents carry it
        count: usize,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::DuplicateRule {
                first_row,
                duplicate_row,
            } => write!(f, "row {duplicate_row} duplicates row {first_row}"),
            Warning::UnrecognizedDirection { row, value } => {
                write!(f, "row {row}: unrecognized direction {value:?}, rule skipped")
            }
            Warning::NameCollision { name, count } => {
                write!(f, "{count} documents are named {name:?}")
            }
        }
    }
}

/// Fatal and non-fatal row checks.
#[derive(Debug)]
pub struct Validator<'a> {
    options: &'a ConvertOptions,
}

impl<'a> Validator<'a> {
    /// Create a validator using `options`.
    pub fn new(options: &'a ConvertOptions) -> Self {
        Self { options }
    }

    /// Run every check over an extraction.
    pub fn validate(&self, extraction: &Extraction) -> Result<Vec<Warning>, ConvertError> {
        self.check_forbidden(extraction)?;
        check_namespace_name(&extraction.namespace)?;

        if !extraction.missing_rule_numbers.is_empty() {
            return Err(ConvertError::MissingRuleNumbers {
                rows: extraction.missing_rule_numbers.clone(),
            });
        }

        self.check_ports(&extraction.rows)?;

        let mut warnings = self.find_duplicates(&extraction.rows);
        warnings.extend(unrecognized_directions(&extraction.rows));
        Ok(warnings)
    }

    /// Fails with every row that contains a forbidden character, the
    /// namespace header included.
    pub fn check_forbidden(&self, extraction: &Extraction) -> Result<(), ConvertError> {
        let header = (extraction.header_row, extraction.namespace.clone());
        let rules = extraction
            .rows
            .iter()
            .map(|row| (row.source_row, row.text()));

        let offending: Vec<usize> = std::iter::once(header)
            .chain(rules)
            .filter(|(row, text)| match self.options.forbidden_in(text) {
                Some(range) => {
                    tracing::debug!(row, script = %range.name, "forbidden characters");
                    true
                }
                None => false,
            })
            .map(|(row, _)| row)
            .collect();

        if offending.is_empty() {
            Ok(())
        } else {
            Err(ConvertError::ForbiddenCharacters { rows: offending })
        }
    }

    /// Fails with every row whose port cell is empty or unparsable.
    pub fn check_ports(&self, rows: &[RowRecord]) -> Result<(), ConvertError> {
        let offending: Vec<usize> = rows
            .iter()
            .filter(|row| parse_ports(&row.port_spec).is_err())
            .map(|row| row.source_row)
            .collect();

        if offending.is_empty() {
            Ok(())
        } else {
            Err(ConvertError::InvalidPorts { rows: offending })
        }
    }

    /// Pair every repeated rule signature with its first occurrence.
    pub fn find_duplicates(&self, rows: &[RowRecord]) -> Vec<Warning> {
        let mut seen: HashMap<(&str, &str, &str, &str, String), usize> = HashMap::new();
        let mut warnings = Vec::new();

        for row in rows {
            let (source, destination) = row.endpoints();
            let signature = (
                row.direction.as_str(),
                source,
                destination,
                row.port_spec.as_str(),
                self.options.normalize_protocol(&row.protocol),
            );
            match seen.get(&signature) {
                Some(&first_row) => warnings.push(Warning::DuplicateRule {
                    first_row,
                    duplicate_row: row.source_row,
                }),
                None => {
                    seen.insert(signature, row.source_row);
                }
            }
        }

        warnings
    }
}

fn unrecognized_directions(rows: &[RowRecord]) -> impl Iterator<Item = Warning> + '_ {
    rows.iter().filter_map(|row| match &row.direction {
        Direction::Other(value) => Some(Warning::UnrecognizedDirection {
            row: row.source_row,
            value: value.clone(),
        }),
        _ => None,
    })
}

/// Report names shared by more than one document, in first-seen order.
pub fn find_name_collisions(documents: &[Document]) -> Vec<Warning> {
    let mut counts: IndexMap<&str, usize> = IndexMap::new();
    for name in documents.iter().filter_map(Document::name) {
        *counts.entry(name).or_default() += 1;
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(name, count)| Warning::NameCollision {
            name: name.to_string(),
            count,
        })
        .collect()
}

/// Which baseline rules the table already states itself.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Coverage {
    /// Signatures matched by at least one row
    pub covered: Vec<BaselineSignature>,
    /// Signatures no row matches
    pub missing: Vec<BaselineSignature>,
}

impl Coverage {
    /// Returns true if every baseline signature is matched.
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Compare the rows against the baseline signatures. Informational only.
pub fn check_coverage(
    rows: &[RowRecord],
    baseline: &Baseline,
    options: &ConvertOptions,
) -> Coverage {
    let mut coverage = Coverage::default();
    for signature in baseline.signatures() {
        if rows.iter().any(|row| covers(row, signature, options)) {
            coverage.covered.push(signature.clone());
        } else {
            coverage.missing.push(signature.clone());
        }
    }
    coverage
}

fn covers(row: &RowRecord, signature: &BaselineSignature, options: &ConvertOptions) -> bool {
    if row.direction != signature.direction {
        return false;
    }

    let protocol = options.normalize_protocol(&row.protocol);
    let protocol_matches = match &signature.protocol {
        Some(expected) => options.is_wildcard(&protocol) || protocol == *expected,
        None => true,
    };
    if !protocol_matches {
        return false;
    }

    let Ok(port) = signature.port.parse::<u16>() else {
        return false;
    };
    parse_ports(&row.port_spec).is_ok_and(|ranges| {
        ranges
            .iter()
            .any(|r| (r.port..=r.end_port.unwrap_or(r.port)).contains(&port))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn row(
        n: usize,
        protocol: &str,
        group: &str,
        direction: &str,
        peer: &str,
        ports: &str,
    ) -> RowRecord {
        RowRecord {
            rule_number: Some(n.to_string()),
            protocol: protocol.into(),
            group_key: group.into(),
            direction: Direction::parse(direction),
            counterpart: peer.into(),
            port_spec: ports.into(),
            source_row: n + 2,
        }
    }

    fn extraction(rows: Vec<RowRecord>) -> Extraction {
        Extraction {
            namespace: "ns".into(),
            header_row: 2,
            rows,
            missing_rule_numbers: Vec::new(),
        }
    }

    #[test]
    fn test_clean_rows_have_no_warnings() {
        let options = ConvertOptions::default();
        let rows = vec![
            row(1, "tcp", "app:web", "ingress", "10.0.0.0/8", "443"),
            row(2, "tcp", "app:web", "egress", "app:db", "5432"),
        ];
        let warnings = Validator::new(&options).validate(&extraction(rows)).unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_every_forbidden_row_is_reported() {
        let options = ConvertOptions::default();
        let rows = vec![
            row(1, "tcp", "app:веб", "ingress", "10.0.0.0/8", "443"),
            row(2, "tcp", "app:web", "egress", "app:db", "5432"),
            row(3, "tcp", "app:web", "egress", "база", "5432"),
        ];
        let err = Validator::new(&options)
            .validate(&extraction(rows))
            .unwrap_err();
        assert!(matches!(err, ConvertError::ForbiddenCharacters { rows } if rows == vec![3, 5]));
    }

    #[test]
    fn test_forbidden_namespace_header_is_reported_as_row_2() {
        let options = ConvertOptions::default();
        let mut ex = extraction(vec![
            row(1, "tcp", "app:web", "egress", "app:db", "80"),
            row(2, "tcp", "app:web", "egress", "сервер", "81"),
        ]);
        ex.namespace = "биллинг".into();

        let err = Validator::new(&options).validate(&ex).unwrap_err();
        assert!(matches!(err, ConvertError::ForbiddenCharacters { rows } if rows == vec![2, 4]));
    }

    #[test]
    fn test_invalid_namespace_name_is_fatal() {
        let options = ConvertOptions::default();
        let mut ex = extraction(vec![row(1, "tcp", "app:web", "egress", "app:db", "80")]);
        ex.namespace = "../../tmp/escaped".into();

        let err = Validator::new(&options).validate(&ex).unwrap_err();
        assert!(matches!(err, ConvertError::MalformedNamespaceHeader(_)));
    }

    #[test]
    fn test_missing_rule_numbers_are_fatal() {
        let options = ConvertOptions::default();
        let mut ex = extraction(vec![row(1, "tcp", "app:web", "egress", "app:db", "80")]);
        ex.missing_rule_numbers = vec![4, 9];

        let err = Validator::new(&options).validate(&ex).unwrap_err();
        assert!(matches!(err, ConvertError::MissingRuleNumbers { rows } if rows == vec![4, 9]));
    }

    #[test]
    fn test_bad_ports_are_fatal() {
        let options = ConvertOptions::default();
        let rows = vec![
            row(1, "tcp", "app:web", "egress", "app:db", ""),
            row(2, "tcp", "app:web", "egress", "app:db", "80"),
            row(3, "tcp", "app:web", "egress", "app:db", "http"),
        ];
        let err = Validator::new(&options)
            .validate(&extraction(rows))
            .unwrap_err();
        assert!(matches!(err, ConvertError::InvalidPorts { rows } if rows == vec![3, 5]));
    }

    #[test]
    fn test_duplicates_pair_with_first_occurrence() {
        let options = ConvertOptions::default();
        let rows = vec![
            row(1, "tcp", "app:web", "egress", "app:db", "5432"),
            row(2, "TCP", "app:web", "egress", "app:db", "5432"),
            row(3, "udp", "app:web", "egress", "app:db", "5432"),
            row(4, " tcp", "app:web", "egress", "app:db", "5432"),
        ];
        let warnings = Validator::new(&options).find_duplicates(&rows);
        assert_eq!(
            warnings,
            vec![
                Warning::DuplicateRule {
                    first_row: 3,
                    duplicate_row: 4
                },
                Warning::DuplicateRule {
                    first_row: 3,
                    duplicate_row: 6
                },
            ]
        );
    }

    #[test]
    fn test_missing_protocol_duplicates_wildcard() {
        let options = ConvertOptions::default();
        let rows = vec![
            row(1, "", "app:web", "egress", "app:db", "80"),
            row(2, "any", "app:web", "egress", "app:db", "80"),
        ];
        assert_eq!(Validator::new(&options).find_duplicates(&rows).len(), 1);
    }

    #[test]
    fn test_unrecognized_direction_warns() {
        let options = ConvertOptions::default();
        let rows = vec![row(1, "tcp", "app:web", "", "app:db", "80")];
        let warnings = Validator::new(&options).validate(&extraction(rows)).unwrap();
        assert_eq!(
            warnings,
            vec![Warning::UnrecognizedDirection {
                row: 3,
                value: String::new()
            }]
        );
        assert_eq!(
            warnings[0].to_string(),
            "row 3: unrecognized direction \"\", rule skipped"
        );
    }

    #[test]
    fn test_coverage_complete() {
        let options = ConvertOptions::default();
        let baseline = Baseline::builtin().unwrap();
        let rows = vec![
            row(1, "tcp", "", "ingress", "d8-monitoring/app:prometheus", "15020"),
            row(2, "udp", "", "egress", "kube-system/k8s-app:node-local-dns", "53"),
            row(3, "any", "", "egress", "d8-istio/app:istiod", "15000-15100"),
        ];

        let coverage = check_coverage(&rows, &baseline, &options);
        assert!(coverage.is_complete());
        assert_eq!(coverage.covered.len(), 3);
    }

    #[test]
    fn test_coverage_gaps() {
        let options = ConvertOptions::default();
        let baseline = Baseline::builtin().unwrap();
        let rows = vec![
            row(1, "tcp", "", "ingress", "d8-monitoring/app:prometheus", "15020"),
            row(2, "tcp", "", "egress", "kube-system/k8s-app:node-local-dns", "53"),
        ];

        let coverage = check_coverage(&rows, &baseline, &options);
        assert!(!coverage.is_complete());
        let missing: Vec<_> = coverage.missing.iter().map(|s| s.port.as_str()).collect();
        assert_eq!(missing, vec!["53", "15012"]);
    }

    #[test]
    fn test_name_collisions() {
        let baseline = Baseline::builtin().unwrap();
        let mut docs = baseline.rewrite("ns");
        docs.extend(baseline.rewrite("ns"));

        assert_eq!(
            find_name_collisions(&docs),
            vec![Warning::NameCollision {
                name: "ns-default".into(),
                count: 2
            }]
        );
        assert!(find_name_collisions(&docs[..1]).is_empty());
    }
}
