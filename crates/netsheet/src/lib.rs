//! Netsheet: network-access spreadsheets to Cilium network policies
//!
//! Each row of the input sheet states one allowed connection: protocol,
//! workload, direction, counterpart and ports. Rows are classified,
//! validated, grouped by workload and assembled into `CiliumNetworkPolicy`
//! documents, which are emitted after a fixed set of baseline policies
//! renamed into the target namespace.

mod assemble;
mod baseline;
mod convert;
mod document;
mod error;
mod labels;
mod options;
mod output;
mod row;
mod selector;
mod table;
mod translate;
mod validate;

pub use assemble::{Assembler, PolicyGroup, group_rows};
pub use baseline::{BASELINE_NAME_SUFFIX, Baseline, BaselineSignature};
pub use convert::{Conversion, Converter};
pub use document::{
    Document, EndpointSelector, Metadata, PolicyDocument, PolicySpec, render_documents,
};
pub use error::ConvertError;
pub use labels::{Labels, parse_labels};
pub use options::{CharRange, ConvertOptions};
pub use output::{confirm_overwrite, output_path, write_output};
pub use row::{
    Direction, Extraction, RowRecord, check_namespace_name, extract, parse_namespace_header,
};
pub use selector::{Selector, classify};
pub use table::Table;
pub use translate::{PortProtocol, PortRange, PortRule, RuleFragment, parse_ports, translate};
pub use validate::{Coverage, Validator, Warning, check_coverage, find_name_collisions};
