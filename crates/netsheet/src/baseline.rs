//! Baseline policy documents.
//!
//! The baseline is a set of policy documents that goes into every output,
//! renamed to the target namespace. It is loaded once and never mutated;
//! the `(direction, port, protocol)` signatures of its rules are derived at
//! load time for the coverage report.

use std::path::Path;

use serde::Deserialize;
use serde::de::IgnoredAny;
use serde_yaml::Value;

use crate::document::Document;
use crate::error::ConvertError;
use crate::row::Direction;

const BUILTIN_BASELINE: &str = include_str!("../baseline/default.yaml");

/// Suffix of every rewritten baseline document name.
pub const BASELINE_NAME_SUFFIX: &str = "default";

/// A port/protocol pair a baseline rule allows in one direction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BaselineSignature {
    /// Rule direction
    pub direction: Direction,
    /// Port as written in the baseline
    pub port: String,
    /// Upper-cased protocol; `None` when the baseline leaves it open
    pub protocol: Option<String>,
}

#[derive(Deserialize)]
struct Shape {
    #[serde(rename = "apiVersion")]
    _api_version: IgnoredAny,
    #[serde(rename = "kind")]
    _kind: IgnoredAny,
    #[serde(rename = "metadata")]
    _metadata: IgnoredAny,
    spec: SpecShape,
}

#[derive(Deserialize)]
struct SpecShape {
    #[serde(default)]
    ingress: Vec<RuleShape>,
    #[serde(default)]
    egress: Vec<RuleShape>,
}

#[derive(Deserialize)]
struct RuleShape {
    #[serde(rename = "toPorts", default)]
    to_ports: Vec<PortRuleShape>,
}

#[derive(Deserialize)]
struct PortRuleShape {
    #[serde(default)]
    ports: Vec<PortShape>,
}

#[derive(Deserialize)]
struct PortShape {
    port: Value,
    #[serde(default)]
    protocol: Option<String>,
}

/// The loaded baseline.
#[derive(Clone, Debug)]
pub struct Baseline {
    documents: Vec<Value>,
    signatures: Vec<BaselineSignature>,
}

impl Baseline {
    /// The baseline compiled into the binary.
    pub fn builtin() -> Result<Self, ConvertError> {
        Self::from_yaml_str(BUILTIN_BASELINE)
    }

    /// Load a baseline file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConvertError> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(ConvertError::BaselineNotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path)?;
        let baseline = Self::from_yaml_str(&text)?;
        tracing::debug!(
            path = %path.display(),
            documents = baseline.documents.len(),
            "loaded baseline"
        );
        Ok(baseline)
    }

    /// Parse a multi-document YAML stream.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConvertError> {
        let mut documents = Vec::new();
        for de in serde_yaml::Deserializer::from_str(text) {
            let value = Value::deserialize(de)?;
            if !value.is_null() {
                documents.push(value);
            }
        }
        if documents.is_empty() {
            return Err(ConvertError::InvalidBaseline {
                index: 0,
                reason: "no documents".to_string(),
            });
        }

        let mut signatures = Vec::new();
        for (index, value) in documents.iter().enumerate() {
            let shape: Shape =
                serde_yaml::from_value(value.clone()).map_err(|e| ConvertError::InvalidBaseline {
                    index,
                    reason: e.to_string(),
                })?;
            collect_signatures(Direction::Ingress, &shape.spec.ingress, &mut signatures);
            collect_signatures(Direction::Egress, &shape.spec.egress, &mut signatures);
        }

        Ok(Self {
            documents,
            signatures,
        })
    }

    /// The documents as loaded.
    pub fn documents(&self) -> &[Value] {
        &self.documents
    }

    /// Signatures of every baseline rule port.
    pub fn signatures(&self) -> &[BaselineSignature] {
        &self.signatures
    }

    /// Name every baseline document gets in `namespace`.
    pub fn document_name(namespace: &str) -> String {
        format!("{namespace}-{BASELINE_NAME_SUFFIX}")
    }

    /// Copy the documents into `namespace`, rewriting only their identity.
    pub fn rewrite(&self, namespace: &str) -> Vec<Document> {
        let name = Self::document_name(namespace);
        self.documents
            .iter()
            .map(|doc| {
                let mut doc = doc.clone();
                if let Some(metadata) = doc.get_mut("metadata").and_then(Value::as_mapping_mut) {
                    metadata.insert("name".into(), name.clone().into());
                    metadata.insert("namespace".into(), namespace.into());
                }
                Document::Baseline(doc)
            })
            .collect()
    }
}

fn collect_signatures(
    direction: Direction,
    rules: &[RuleShape],
    signatures: &mut Vec<BaselineSignature>,
) {
    let ports = rules
        .iter()
        .flat_map(|rule| &rule.to_ports)
        .flat_map(|port_rule| &port_rule.ports);
    for port in ports {
        let port_text = match &port.port {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            _ => continue,
        };
        signatures.push(BaselineSignature {
            direction: direction.clone(),
            port: port_text,
            protocol: port.protocol.as_deref().map(str::to_uppercase),
        });
    }
}
