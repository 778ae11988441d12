use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// A single schema violation found while validating a worksheet.
#[derive(Debug, Clone, PartialEq)]
pub struct CellIssue {
    /// Worksheet the violation was found in.
    pub sheet: &'static str,
    /// 1-based worksheet row number; row 1 is the header row.
    pub row: usize,
    /// Declared column the value was read from.
    pub column: &'static str,
    /// What went wrong with the cell.
    pub problem: String,
}

impl fmt::Display for CellIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} row {}, column '{}': {}",
            self.sheet, self.row, self.column, self.problem
        )
    }
}

fn format_issues(issues: &[CellIssue]) -> String {
    issues
        .iter()
        .map(|issue| format!("  - {issue}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Error, Debug)]
pub enum FlowsheetError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to open workbook '{path}': {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    #[error("failed to read worksheet '{sheet}': {source}")]
    Sheet {
        sheet: &'static str,
        #[source]
        source: calamine::Error,
    },

    #[error("invalid spreadsheet data:\n{}", format_issues(.0))]
    Validation(Vec<CellIssue>),

    #[error("duplicate node name '{0}'")]
    DuplicateNode(String),

    #[error("link {index} references unknown node '{name}'")]
    UnknownNode { index: usize, name: String },

    #[error("link {source_node} -> {target} carries invalid value {value}: flows must be non-negative")]
    NegativeFlow {
        source_node: String,
        target: String,
        value: f64,
    },

    #[error("circular link involving node '{0}'")]
    CircularLink(String),

    #[error("graph has no nodes")]
    EmptyGraph,

    #[error("render error: {0}")]
    Render(String),

    #[error("formatting error: {0}")]
    Fmt(#[from] std::fmt::Error),

    #[error("worker task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, FlowsheetError>;
