//! Row extraction.
//!
//! Sheet layout (0-based rows):
//!
//! ```text
//! row 0    title (ignored)
//! row 1    A: namespace:<value>
//! row 2..  A: rule number | B: protocol | C: group key | D: direction
//!          E: counterpart | F: ports
//! ```

use std::fmt;
use std::sync::LazyLock;

use regex_lite::Regex;

use crate::error::ConvertError;
use crate::table::Table;

const HEADER_ROW: usize = 1;
const FIRST_RULE_ROW: usize = 2;

const COL_RULE: usize = 0;
const COL_PROTOCOL: usize = 1;
const COL_GROUP: usize = 2;
const COL_DIRECTION: usize = 3;
const COL_COUNTERPART: usize = 4;
const COL_PORTS: usize = 5;

const MAX_NAMESPACE_LEN: usize = 63;

#[allow(clippy::unwrap_used)]
static NAMESPACE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").unwrap());

/// Traffic direction of a rule.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Traffic into the group's workload
    Ingress,
    /// Traffic out of the group's workload
    Egress,
    /// Anything else found in the direction cell (lower-cased, may be empty)
    Other(String),
}

impl Direction {
    /// Parse a trimmed, lower-cased direction cell.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "ingress" => Direction::Ingress,
            "egress" => Direction::Egress,
            other => Direction::Other(other.to_string()),
        }
    }

    /// The value as written to logs and signatures.
    pub fn as_str(&self) -> &str {
        match self {
            Direction::Ingress => "ingress",
            Direction::Egress => "egress",
            Direction::Other(raw) => raw,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One non-blank rule row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowRecord {
    /// Column A, if present
    pub rule_number: Option<String>,
    /// Column B, trimmed
    pub protocol: String,
    /// Column C: the workload this rule belongs to
    pub group_key: String,
    /// Column D
    pub direction: Direction,
    /// Column E: the other side of the connection
    pub counterpart: String,
    /// Column F, trimmed
    pub port_spec: String,
    /// 1-based sheet row
    pub source_row: usize,
}

impl RowRecord {
    /// The `(source, destination)` cells for this row's direction.
    ///
    /// The group key is the destination of ingress traffic and the source of
    /// egress traffic; for unrecognized directions the row is read as egress.
    pub fn endpoints(&self) -> (&str, &str) {
        match self.direction {
            Direction::Ingress => (self.counterpart.as_str(), self.group_key.as_str()),
            _ => (self.group_key.as_str(), self.counterpart.as_str()),
        }
    }

    /// The cell that selects the peer of this rule: the source for ingress,
    /// the destination for egress.
    pub fn peer_cell(&self) -> &str {
        let (source, destination) = self.endpoints();
        match self.direction {
            Direction::Ingress => source,
            _ => destination,
        }
    }

    /// All text cells joined, for content checks.
    pub fn text(&self) -> String {
        [
            self.rule_number.as_deref().unwrap_or(""),
            self.protocol.as_str(),
            self.group_key.as_str(),
            self.direction.as_str(),
            self.counterpart.as_str(),
            self.port_spec.as_str(),
        ]
        .join(" ")
    }
}

/// Output of [`extract`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Extraction {
    /// Target namespace from the header cell, not yet checked by
    /// [`check_namespace_name`]
    pub namespace: String,
    /// 1-based sheet row of the header cell
    pub header_row: usize,
    /// Non-blank rule rows in sheet order
    pub rows: Vec<RowRecord>,
    /// 1-based rows that have content but no rule number
    pub missing_rule_numbers: Vec<usize>,
}

/// Parse the `namespace:<value>` header cell.
pub fn parse_namespace_header(cell: &str) -> Result<String, ConvertError> {
    let cell = cell.trim();
    if cell.is_empty() {
        return Err(ConvertError::MissingNamespaceHeader);
    }
    match cell.split_once(':') {
        Some((key, value))
            if key.trim().eq_ignore_ascii_case("namespace") && !value.trim().is_empty() =>
        {
            Ok(value.trim().to_string())
        }
        _ => Err(ConvertError::MalformedNamespaceHeader(cell.to_string())),
    }
}

/// Fails unless `namespace` is a valid Kubernetes namespace name: lowercase
/// letters, digits and `-`, alphanumeric at both ends, at most 63 characters.
pub fn check_namespace_name(namespace: &str) -> Result<(), ConvertError> {
    if namespace.len() <= MAX_NAMESPACE_LEN && NAMESPACE_NAME.is_match(namespace) {
        Ok(())
    } else {
        Err(ConvertError::MalformedNamespaceHeader(format!(
            "namespace:{namespace}"
        )))
    }
}

/// Read the namespace and every non-blank rule row from a table.
pub fn extract(table: &Table) -> Result<Extraction, ConvertError> {
    let namespace = parse_namespace_header(table.cell(HEADER_ROW, COL_RULE))?;

    let mut rows = Vec::new();
    let mut missing_rule_numbers = Vec::new();

    for index in FIRST_RULE_ROW..table.len() {
        let cell = |col| table.cell(index, col).trim();

        let content = [COL_PROTOCOL, COL_GROUP, COL_DIRECTION, COL_COUNTERPART, COL_PORTS];
        if content.iter().all(|&col| cell(col).is_empty()) {
            continue;
        }

        let source_row = index + 1;
        let rule_number = Some(cell(COL_RULE))
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        if rule_number.is_none() {
            missing_rule_numbers.push(source_row);
        }

        let row = RowRecord {
            rule_number,
            protocol: cell(COL_PROTOCOL).to_string(),
            group_key: cell(COL_GROUP).to_string(),
            direction: Direction::parse(cell(COL_DIRECTION)),
            counterpart: cell(COL_COUNTERPART).to_string(),
            port_spec: cell(COL_PORTS).to_string(),
            source_row,
        };
        tracing::debug!(
            row = source_row,
            direction = %row.direction,
            group = %row.group_key,
            "extracted rule row"
        );
        rows.push(row);
    }

    Ok(Extraction {
        namespace,
        header_row: HEADER_ROW + 1,
        rows,
        missing_rule_numbers,
    })
}
