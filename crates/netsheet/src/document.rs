//! Policy document model.

use serde::Serialize;

use crate::labels::Labels;
use crate::translate::RuleFragment;

/// `metadata` of a policy document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Metadata {
    /// Document name
    pub name: String,
    /// Target namespace
    pub namespace: String,
}

/// `spec.endpointSelector`: empty when the group key carries no labels.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSelector {
    /// Labels of the selected workload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_labels: Option<Labels>,
}

impl EndpointSelector {
    /// Select endpoints by labels; no labels selects everything.
    pub fn from_labels(labels: Labels) -> Self {
        Self {
            match_labels: (!labels.is_empty()).then_some(labels),
        }
    }
}

/// `spec` of a policy document.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicySpec {
    /// The workload the policy applies to
    pub endpoint_selector: EndpointSelector,
    /// Omitted entirely when empty
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ingress: Vec<RuleFragment>,
    /// Omitted entirely when empty
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub egress: Vec<RuleFragment>,
}

/// A generated network policy.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyDocument {
    /// e.g. `cilium.io/v2`
    pub api_version: String,
    /// e.g. `CiliumNetworkPolicy`
    pub kind: String,
    /// Name and namespace
    pub metadata: Metadata,
    /// Selector and rules
    pub spec: PolicySpec,
}

/// An output document: a rewritten baseline document or a generated policy.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Document {
    /// Baseline document, copied as parsed apart from its identity
    Baseline(serde_yaml::Value),
    /// Policy built from a group of rows
    Policy(PolicyDocument),
}

impl Document {
    /// `metadata.name` of the document, if set.
    pub fn name(&self) -> Option<&str> {
        match self {
            Document::Baseline(value) => value.get("metadata")?.get("name")?.as_str(),
            Document::Policy(policy) => Some(&policy.metadata.name),
        }
    }
}

/// Render documents as one YAML stream separated by `---` lines.
pub fn render_documents(documents: &[Document]) -> Result<String, serde_yaml::Error> {
    let rendered = documents
        .iter()
        .map(serde_yaml::to_string)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rendered.join("---\n"))
}
