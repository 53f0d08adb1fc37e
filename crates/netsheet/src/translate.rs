//! Rule translation: one row becomes one ingress or egress rule.

use serde::Serialize;
use serde::ser::{SerializeMap, Serializer};

use crate::error::ConvertError;
use crate::labels::{Labels, split_items};
use crate::options::ConvertOptions;
use crate::row::{Direction, RowRecord};
use crate::selector::{Selector, classify};

/// A single port or port range from a port cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PortRange {
    /// First port
    pub port: u16,
    /// Last port, for `a-b` ranges
    pub end_port: Option<u16>,
}

/// Parse a port cell: comma/newline separated ports or `a-b` ranges.
///
/// Order and duplicates are preserved. An empty cell or any item that is not
/// a port in `1..=65535` is an error.
pub fn parse_ports(cell: &str) -> Result<Vec<PortRange>, String> {
    let ports = split_items(cell)
        .map(|item| {
            let parse = |s: &str| s.trim().parse::<u16>().ok().filter(|p| *p > 0);
            let range = match item.split_once('-') {
                Some((start, end)) => match (parse(start), parse(end)) {
                    (Some(port), Some(end)) if end >= port => Some(PortRange {
                        port,
                        end_port: Some(end),
                    }),
                    _ => None,
                },
                None => parse(item).map(|port| PortRange {
                    port,
                    end_port: None,
                }),
            };
            range.ok_or_else(|| format!("invalid port {item:?}"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    if ports.is_empty() {
        return Err("empty port list".to_string());
    }
    Ok(ports)
}

/// One `{port, protocol?}` entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortProtocol {
    /// Port number as a string
    pub port: String,
    /// Upper end of a port range
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_port: Option<u16>,
    /// Upper-cased protocol, absent for the wildcard
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

/// The `toPorts` element of a rule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PortRule {
    /// Ports in cell order
    pub ports: Vec<PortProtocol>,
}

/// One ingress or egress rule of a policy.
///
/// Serializes as exactly one peer field (`fromEndpoints`, `toFQDNs`,
/// `fromCIDR`, ...) followed by `toPorts`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RuleFragment {
    /// `Ingress` renders `from*` fields, anything else `to*`
    pub direction: Direction,
    /// The classified peer
    pub peer: Selector,
    /// Ports block, never empty
    pub to_ports: Vec<PortRule>,
}

impl RuleFragment {
    fn peer_key(&self) -> String {
        let prefix = match self.direction {
            Direction::Ingress => "from",
            _ => "to",
        };
        let kind = match self.peer {
            Selector::Empty | Selector::LabelSet(_) => "Endpoints",
            Selector::Fqdn(_) => "FQDNs",
            Selector::CidrSingle(_) | Selector::CidrList(_) => "CIDR",
        };
        format!("{prefix}{kind}")
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MatchLabels<'a> {
    match_labels: &'a Labels,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MatchName<'a> {
    match_name: &'a str,
}

impl Serialize for RuleFragment {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let empty = Labels::new();
        let mut map = serializer.serialize_map(Some(2))?;
        let key = self.peer_key();
        match &self.peer {
            Selector::Empty => {
                map.serialize_entry(&key, &[MatchLabels { match_labels: &empty }])?
            }
            Selector::LabelSet(labels) => {
                map.serialize_entry(&key, &[MatchLabels { match_labels: labels }])?
            }
            Selector::Fqdn(name) => map.serialize_entry(&key, &[MatchName { match_name: name }])?,
            Selector::CidrSingle(cidr) => map.serialize_entry(&key, &[cidr])?,
            Selector::CidrList(cidrs) => map.serialize_entry(&key, cidrs)?,
        }
        map.serialize_entry("toPorts", &self.to_ports)?;
        map.end()
    }
}

/// Translate one row into a rule fragment for its direction.
pub fn translate(row: &RowRecord, options: &ConvertOptions) -> Result<RuleFragment, ConvertError> {
    let peer = classify(row.peer_cell(), options);

    let protocol = options.normalize_protocol(&row.protocol);
    let protocol = (!options.is_wildcard(&protocol)).then_some(protocol);

    let ports = parse_ports(&row.port_spec).map_err(|reason| {
        tracing::debug!(row = row.source_row, %reason, "unparsable port cell");
        ConvertError::InvalidPorts {
            rows: vec![row.source_row],
        }
    })?;

    let ports = ports
        .into_iter()
        .map(|range| PortProtocol {
            port: range.port.to_string(),
            end_port: range.end_port,
            protocol: protocol.clone(),
        })
        .collect();

    tracing::debug!(
        row = row.source_row,
        direction = %row.direction,
        peer = peer.kind(),
        "translated rule"
    );

    Ok(RuleFragment {
        direction: row.direction.clone(),
        peer,
        to_ports: vec![PortRule { ports }],
    })
}
