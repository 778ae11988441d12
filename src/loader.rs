//! Reads the three logical tables from the input workbook and validates
//! each row against its declared column schema.
//!
//! The policy is fail-fast per table: if any row violates the schema the
//! whole load fails, carrying the full list of offending cells. No
//! partial results are ever returned.

use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use tracing::{debug, instrument};

use crate::error::{CellIssue, FlowsheetError, Result};
use crate::graph::{Link, Metadata, Node};

pub const NODES_SHEET: &str = "nodes";
pub const LINKS_SHEET: &str = "links";
pub const METADATA_SHEET: &str = "metadata";

/// A worksheet pulled into memory: the header row mapped to column
/// positions, plus the data rows beneath it.
#[derive(Debug)]
pub struct SheetTable {
    sheet: &'static str,
    columns: Vec<String>,
    rows: Vec<Vec<Data>>,
}

impl SheetTable {
    fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Reads one worksheet into a [`SheetTable`]. The first row is the
/// header; rows with no content at all are skipped.
pub fn read_sheet(path: &Path, sheet: &'static str) -> Result<SheetTable> {
    let mut workbook = open_workbook_auto(path).map_err(|source| FlowsheetError::Workbook {
        path: path.to_path_buf(),
        source,
    })?;
    let range = workbook
        .worksheet_range(sheet)
        .map_err(|source| FlowsheetError::Sheet { sheet, source })?;

    let mut rows = range.rows();
    let columns = match rows.next() {
        Some(header) => header
            .iter()
            .map(|cell| cell.to_string().trim().to_string())
            .collect(),
        None => Vec::new(),
    };
    let rows = rows
        .filter(|row| row.iter().any(|cell| !matches!(cell, Data::Empty)))
        .map(|row| row.to_vec())
        .collect();

    Ok(SheetTable {
        sheet,
        columns,
        rows,
    })
}

fn text_cell(cell: &Data) -> std::result::Result<Option<String>, String> {
    match cell {
        Data::Empty => Ok(None),
        Data::String(s) => Ok(Some(s.clone())),
        Data::Int(i) => Ok(Some(i.to_string())),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => {
            Ok(Some(format!("{}", *f as i64)))
        }
        Data::Float(f) => Ok(Some(f.to_string())),
        other => Err(format!("expected text, found {other:?}")),
    }
}

fn number_cell(cell: &Data) -> std::result::Result<Option<f64>, String> {
    let value = match cell {
        Data::Empty => return Ok(None),
        Data::Float(f) => *f,
        Data::Int(i) => *i as f64,
        Data::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| format!("expected a number, found '{s}'"))?,
        other => return Err(format!("expected a number, found {other:?}")),
    };
    if !value.is_finite() {
        return Err(format!("value must be finite, found {value}"));
    }
    Ok(Some(value))
}

/// Typed access to one data row, accumulating issues instead of
/// stopping at the first bad cell.
struct RowReader<'a> {
    sheet: &'static str,
    row: &'a [Data],
    /// 1-based worksheet row number, header included.
    row_number: usize,
    issues: &'a mut Vec<CellIssue>,
}

impl RowReader<'_> {
    fn cell(&self, column: Option<usize>) -> &Data {
        column
            .and_then(|idx| self.row.get(idx))
            .unwrap_or(&Data::Empty)
    }

    fn push(&mut self, column: &'static str, problem: String) {
        self.issues.push(CellIssue {
            sheet: self.sheet,
            row: self.row_number,
            column,
            problem,
        });
    }

    fn required_text(&mut self, column: &'static str, idx: Option<usize>) -> Option<String> {
        match text_cell(self.cell(idx)) {
            Ok(Some(value)) if !value.is_empty() => Some(value),
            Ok(_) => {
                self.push(column, "required value is missing".to_string());
                None
            }
            Err(problem) => {
                self.push(column, problem);
                None
            }
        }
    }

    fn optional_text(&mut self, column: &'static str, idx: Option<usize>) -> Option<String> {
        match text_cell(self.cell(idx)) {
            Ok(value) => value,
            Err(problem) => {
                self.push(column, problem);
                None
            }
        }
    }

    fn required_number(&mut self, column: &'static str, idx: Option<usize>) -> Option<f64> {
        match number_cell(self.cell(idx)) {
            Ok(Some(value)) => Some(value),
            Ok(None) => {
                self.push(column, "required value is missing".to_string());
                None
            }
            Err(problem) => {
                self.push(column, problem);
                None
            }
        }
    }
}

fn require_column(
    table: &SheetTable,
    column: &'static str,
    issues: &mut Vec<CellIssue>,
) -> Option<usize> {
    let idx = table.column(column);
    if idx.is_none() {
        issues.push(CellIssue {
            sheet: table.sheet,
            row: 1,
            column,
            problem: "required column is missing from the header row".to_string(),
        });
    }
    idx
}

fn finish<T>(records: Vec<T>, issues: Vec<CellIssue>) -> Result<Vec<T>> {
    if issues.is_empty() {
        Ok(records)
    } else {
        Err(FlowsheetError::Validation(issues))
    }
}

/// Validates the `nodes` sheet: `name` and `type` required, `color`
/// optional. Row order is preserved.
pub fn read_nodes(table: &SheetTable) -> Result<Vec<Node>> {
    let mut issues = Vec::new();
    let name_col = require_column(table, "name", &mut issues);
    let type_col = require_column(table, "type", &mut issues);
    let color_col = table.column("color");

    let mut nodes = Vec::with_capacity(table.rows.len());
    for (offset, row) in table.rows.iter().enumerate() {
        let mut reader = RowReader {
            sheet: table.sheet,
            row,
            row_number: offset + 2,
            issues: &mut issues,
        };
        let name = reader.required_text("name", name_col);
        let node_type = reader.required_text("type", type_col);
        let color = reader.optional_text("color", color_col);
        if let (Some(name), Some(node_type)) = (name, node_type) {
            nodes.push(Node {
                name,
                node_type,
                color,
            });
        }
    }

    finish(nodes, issues)
}

/// Validates the `links` sheet: `source`, `target` and a finite numeric
/// `value` required, `color` optional. Sign is not enforced here; the
/// layout stage rejects negative flows.
pub fn read_links(table: &SheetTable) -> Result<Vec<Link>> {
    let mut issues = Vec::new();
    let source_col = require_column(table, "source", &mut issues);
    let target_col = require_column(table, "target", &mut issues);
    let value_col = require_column(table, "value", &mut issues);
    let color_col = table.column("color");

    let mut links = Vec::with_capacity(table.rows.len());
    for (offset, row) in table.rows.iter().enumerate() {
        let mut reader = RowReader {
            sheet: table.sheet,
            row,
            row_number: offset + 2,
            issues: &mut issues,
        };
        let source = reader.required_text("source", source_col);
        let target = reader.required_text("target", target_col);
        let value = reader.required_number("value", value_col);
        let color = reader.optional_text("color", color_col);
        if let (Some(source), Some(target), Some(value)) = (source, target, value) {
            links.push(Link {
                source,
                target,
                value,
                color,
            });
        }
    }

    finish(links, issues)
}

/// Validates the `metadata` sheet: every column optional. Truncation to
/// the first row happens during assembly, not here.
pub fn read_metadata(table: &SheetTable) -> Result<Vec<Metadata>> {
    let header_col = table.column("header");
    let currency_col = table.column("currency");
    let abbreviation_col = table.column("abbreviation");

    let mut issues = Vec::new();
    let mut records = Vec::with_capacity(table.rows.len());
    for (offset, row) in table.rows.iter().enumerate() {
        let mut reader = RowReader {
            sheet: table.sheet,
            row,
            row_number: offset + 2,
            issues: &mut issues,
        };
        records.push(Metadata {
            header: reader.optional_text("header", header_col),
            currency: reader.optional_text("currency", currency_col),
            abbreviation: reader.optional_text("abbreviation", abbreviation_col),
        });
    }

    finish(records, issues)
}

/// Loads the three logical tables from the workbook. The loads are
/// independent blocking reads issued on the blocking pool; normalization
/// waits on all three here.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn load_workbook_tables(path: &Path) -> Result<(Vec<Node>, Vec<Link>, Vec<Metadata>)> {
    let (nodes, links, metadata) = tokio::try_join!(
        load_table(path.to_path_buf(), NODES_SHEET, read_nodes),
        load_table(path.to_path_buf(), LINKS_SHEET, read_links),
        load_table(path.to_path_buf(), METADATA_SHEET, read_metadata),
    )?;
    debug!(
        nodes = nodes.len(),
        links = links.len(),
        metadata = metadata.len(),
        "workbook tables loaded"
    );
    Ok((nodes, links, metadata))
}

async fn load_table<T, F>(path: PathBuf, sheet: &'static str, read: F) -> Result<Vec<T>>
where
    T: Send + 'static,
    F: FnOnce(&SheetTable) -> Result<Vec<T>> + Send + 'static,
{
    tokio::task::spawn_blocking(move || read(&read_sheet(&path, sheet)?)).await?
}
