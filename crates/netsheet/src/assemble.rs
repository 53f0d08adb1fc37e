//! Policy assembly.
//!
//! Rows are grouped by their group key in first-seen order and every group
//! becomes one policy document. Baseline documents come first.

use indexmap::IndexMap;

use crate::baseline::Baseline;
use crate::document::{Document, EndpointSelector, Metadata, PolicyDocument, PolicySpec};
use crate::error::ConvertError;
use crate::labels::{Labels, parse_labels};
use crate::options::ConvertOptions;
use crate::row::{Direction, RowRecord};
use crate::translate::translate;

/// Rows sharing one group key.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyGroup {
    /// The raw group key cell
    pub key: String,
    /// Rows in sheet order
    pub rows: Vec<RowRecord>,
}

/// Group rows by key, keeping the order in which keys first appear.
pub fn group_rows(rows: &[RowRecord]) -> Vec<PolicyGroup> {
    let mut groups: IndexMap<&str, Vec<RowRecord>> = IndexMap::new();
    for row in rows {
        groups
            .entry(row.group_key.as_str())
            .or_default()
            .push(row.clone());
    }

    groups
        .into_iter()
        .map(|(key, rows)| PolicyGroup {
            key: key.to_string(),
            rows,
        })
        .collect()
}

/// Builds policy documents for one namespace.
#[derive(Debug)]
pub struct Assembler<'a> {
    namespace: &'a str,
    options: &'a ConvertOptions,
}

impl<'a> Assembler<'a> {
    /// Create an assembler for `namespace`.
    pub fn new(namespace: &'a str, options: &'a ConvertOptions) -> Self {
        Self { namespace, options }
    }

    /// Document name for a group: label values joined by `-`, or the
    /// fallback name for groups without labels.
    pub fn document_name(&self, labels: &Labels) -> String {
        let suffix = if labels.is_empty() {
            self.options.fallback_name.clone()
        } else {
            labels.values().collect::<Vec<_>>().join("-")
        };
        format!("{}-{suffix}", self.namespace)
    }

    /// Build the policy document of one group.
    pub fn build_policy(&self, group: &PolicyGroup) -> Result<PolicyDocument, ConvertError> {
        let labels = parse_labels(&group.key, self.options);
        let name = self.document_name(&labels);

        let mut ingress = Vec::new();
        let mut egress = Vec::new();
        for row in &group.rows {
            match row.direction {
                Direction::Ingress => ingress.push(translate(row, self.options)?),
                Direction::Egress => egress.push(translate(row, self.options)?),
                Direction::Other(_) => {
                    tracing::debug!(
                        row = row.source_row,
                        "skipping rule with unrecognized direction"
                    );
                }
            }
        }

        tracing::debug!(
            %name,
            ingress = ingress.len(),
            egress = egress.len(),
            "assembled policy"
        );

        Ok(PolicyDocument {
            api_version: self.options.api_version.clone(),
            kind: self.options.kind.clone(),
            metadata: Metadata {
                name,
                namespace: self.namespace.to_string(),
            },
            spec: PolicySpec {
                endpoint_selector: EndpointSelector::from_labels(labels),
                ingress,
                egress,
            },
        })
    }

    /// Baseline documents first, then one policy per group in group order.
    pub fn assemble(
        &self,
        groups: &[PolicyGroup],
        baseline: &Baseline,
    ) -> Result<Vec<Document>, ConvertError> {
        let mut documents = baseline.rewrite(self.namespace);
        for group in groups {
            documents.push(Document::Policy(self.build_policy(group)?));
        }
        Ok(documents)
    }
}
