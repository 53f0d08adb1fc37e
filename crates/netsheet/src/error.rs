//! Errors that abort a conversion.

use std::path::PathBuf;

use thiserror::Error;

/// Fatal conversion errors.
///
/// Anything that can be detected in one pass over the rows (forbidden
/// characters, missing rule numbers, bad port cells) lists every offending
/// row, not just the first one.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// The table has no second row, or its first cell is empty.
    #[error("namespace header not found in row 2, column A (expected `namespace:<value>`)")]
    MissingNamespaceHeader,
    /// The namespace header cell is not `namespace:<value>`.
    #[error("malformed namespace header {0:?} (expected `namespace:<value>`)")]
    MalformedNamespaceHeader(String),
    /// Rows contain characters from a forbidden script.
    #[error("forbidden characters in rows {}", format_rows(.rows))]
    ForbiddenCharacters {
        /// 1-based sheet rows.
        rows: Vec<usize>,
    },
    /// Non-blank rows without a rule number.
    #[error("missing rule number in rows {}", format_rows(.rows))]
    MissingRuleNumbers {
        /// 1-based sheet rows.
        rows: Vec<usize>,
    },
    /// Rows whose port cell is empty or cannot be parsed.
    #[error("empty or invalid port list in rows {}", format_rows(.rows))]
    InvalidPorts {
        /// 1-based sheet rows.
        rows: Vec<usize>,
    },
    /// The baseline file does not exist.
    #[error("baseline file not found: {0}")]
    BaselineNotFound(PathBuf),
    /// A baseline document is not shaped like a policy document.
    #[error("baseline document {index} is not a policy document: {reason}")]
    InvalidBaseline {
        /// 0-based document position in the baseline stream.
        index: usize,
        /// What is wrong with it.
        reason: String,
    },
    /// The spreadsheet could not be opened or has no worksheet.
    #[error("spreadsheet error: {0}")]
    Spreadsheet(String),
    /// YAML parse or render failure.
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// JSON parse failure (options file).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn format_rows(rows: &[usize]) -> String {
    rows.iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
