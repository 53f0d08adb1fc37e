//! The conversion pipeline: table in, ordered documents out.

use crate::assemble::{Assembler, group_rows};
use crate::baseline::Baseline;
use crate::document::{Document, render_documents};
use crate::error::ConvertError;
use crate::options::ConvertOptions;
use crate::row::extract;
use crate::table::Table;
use crate::validate::{Coverage, Validator, Warning, check_coverage, find_name_collisions};

/// Result of a successful conversion.
#[derive(Clone, Debug)]
pub struct Conversion {
    /// Target namespace from the header cell
    pub namespace: String,
    /// Baseline documents, then one policy per group
    pub documents: Vec<Document>,
    /// Non-fatal findings, in detection order
    pub warnings: Vec<Warning>,
    /// How much of the baseline the table restates
    pub coverage: Coverage,
}

impl Conversion {
    /// The documents as one YAML stream.
    pub fn to_yaml(&self) -> Result<String, ConvertError> {
        Ok(render_documents(&self.documents)?)
    }
}

/// Converts tables against a fixed baseline.
///
/// The converter holds no per-run state; converting the same table twice
/// yields identical documents.
#[derive(Clone, Debug)]
pub struct Converter {
    baseline: Baseline,
    options: ConvertOptions,
}

impl Converter {
    /// Create a converter.
    pub fn new(baseline: Baseline, options: ConvertOptions) -> Self {
        Self { baseline, options }
    }

    /// Run extraction, validation and assembly over one table.
    pub fn convert(&self, table: &Table) -> Result<Conversion, ConvertError> {
        let extraction = extract(table)?;
        tracing::info!(
            namespace = %extraction.namespace,
            rows = extraction.rows.len(),
            "extracted rule rows"
        );

        let mut warnings = Validator::new(&self.options).validate(&extraction)?;

        let coverage = check_coverage(&extraction.rows, &self.baseline, &self.options);
        if coverage.is_complete() {
            tracing::info!("baseline rules found in table");
        } else {
            tracing::info!(
                missing = coverage.missing.len(),
                "baseline rules missing from table; added from baseline"
            );
        }

        let groups = group_rows(&extraction.rows);
        let documents = Assembler::new(&extraction.namespace, &self.options)
            .assemble(&groups, &self.baseline)?;
        tracing::info!(
            groups = groups.len(),
            documents = documents.len(),
            "assembled policies"
        );

        warnings.extend(find_name_collisions(&documents));
        for warning in &warnings {
            tracing::warn!("{warning}");
        }

        Ok(Conversion {
            namespace: extraction.namespace,
            documents,
            warnings,
            coverage,
        })
    }
}
