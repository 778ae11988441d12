use std::path::{Path, PathBuf};

use rust_xlsxwriter::Workbook;
use tempfile::tempdir;

use flowsheet::config::{Alignment, Config, OutputTarget};
use flowsheet::error::FlowsheetError;
use flowsheet::pipeline;

struct SheetSpec<'a> {
    name: &'a str,
    columns: &'a [&'a str],
    rows: Vec<Vec<Cell<'a>>>,
}

enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Blank,
}

fn write_workbook(path: &Path, sheets: &[SheetSpec]) {
    let mut workbook = Workbook::new();
    for spec in sheets {
        let sheet = workbook.add_worksheet();
        sheet.set_name(spec.name).unwrap();
        for (col, name) in spec.columns.iter().enumerate() {
            sheet.write_string(0, col as u16, *name).unwrap();
        }
        for (r, row) in spec.rows.iter().enumerate() {
            for (c, cell) in row.iter().enumerate() {
                match cell {
                    Cell::Text(text) => {
                        sheet.write_string((r + 1) as u32, c as u16, *text).unwrap();
                    }
                    Cell::Number(value) => {
                        sheet.write_number((r + 1) as u32, c as u16, *value).unwrap();
                    }
                    Cell::Blank => {}
                }
            }
        }
    }
    workbook.save(path).unwrap();
}

fn demo_workbook(path: &Path, link_value: Cell) {
    write_workbook(
        path,
        &[
            SheetSpec {
                name: "nodes",
                columns: &["name", "type", "color"],
                rows: vec![
                    vec![Cell::Text("Revenue"), Cell::Text("source"), Cell::Blank],
                    vec![Cell::Text("Costs"), Cell::Text("loss"), Cell::Blank],
                ],
            },
            SheetSpec {
                name: "links",
                columns: &["source", "target", "value", "color"],
                rows: vec![vec![
                    Cell::Text("Revenue"),
                    Cell::Text("Costs"),
                    link_value,
                    Cell::Blank,
                ]],
            },
            SheetSpec {
                name: "metadata",
                columns: &["header", "currency", "abbreviation"],
                rows: vec![vec![Cell::Text("Demo"), Cell::Text("$"), Cell::Text("M")]],
            },
        ],
    );
}

fn config_for(input: PathBuf, output: &Path) -> Config {
    Config {
        input,
        output: OutputTarget::resolve(output.to_str().unwrap()),
        align: Alignment::Justify,
        node_width: 50.0,
        node_padding: 80.0,
        unsorted_nodes: false,
        unsorted_links: false,
        width: 1920,
        height: 1080,
    }
}

#[tokio::test]
async fn end_to_end_svg_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("demo.xlsx");
    let output = dir.path().join("demo.svg");
    demo_workbook(&input, Cell::Number(12.345));

    let summary = pipeline::run(&config_for(input, &output)).await.unwrap();
    assert_eq!(summary.nodes, 2);
    assert_eq!(summary.links, 1);
    assert_eq!(summary.layers, 2);

    let svg = std::fs::read_to_string(&output).unwrap();
    assert!(svg.contains(">Demo</text>"));
    // Metadata overrides carry through to the label formatting.
    assert!(svg.contains("> 12.35M$</tspan>"));
    assert!(svg.contains("> (12.35M$)</tspan>"));
}

#[tokio::test]
async fn end_to_end_png_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("demo.xlsx");
    let output = dir.path().join("demo.png");
    demo_workbook(&input, Cell::Number(12.345));

    pipeline::run(&config_for(input, &output)).await.unwrap();

    let png = std::fs::read(&output).unwrap();
    assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
}

#[tokio::test]
async fn non_numeric_link_value_fails_before_any_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("demo.xlsx");
    let output = dir.path().join("demo.svg");
    demo_workbook(&input, Cell::Text("a lot"));

    let err = pipeline::run(&config_for(input, &output)).await.unwrap_err();
    let root = err.downcast_ref::<FlowsheetError>().unwrap();
    assert!(matches!(root, FlowsheetError::Validation(_)));
    assert!(!output.exists());
}

#[tokio::test]
async fn missing_worksheet_fails_before_any_output() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("demo.xlsx");
    let output = dir.path().join("demo.svg");
    // Workbook with only a nodes sheet; links and metadata are absent.
    write_workbook(
        &input,
        &[SheetSpec {
            name: "nodes",
            columns: &["name", "type"],
            rows: vec![vec![Cell::Text("Revenue"), Cell::Text("source")]],
        }],
    );

    let err = pipeline::run(&config_for(input, &output)).await.unwrap_err();
    let root = err.downcast_ref::<FlowsheetError>().unwrap();
    assert!(matches!(root, FlowsheetError::Sheet { .. }));
    assert!(!output.exists());
}

#[tokio::test]
async fn link_to_unknown_node_fails_layout() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("demo.xlsx");
    let output = dir.path().join("demo.svg");
    write_workbook(
        &input,
        &[
            SheetSpec {
                name: "nodes",
                columns: &["name", "type"],
                rows: vec![vec![Cell::Text("Revenue"), Cell::Text("source")]],
            },
            SheetSpec {
                name: "links",
                columns: &["source", "target", "value"],
                rows: vec![vec![
                    Cell::Text("Revenue"),
                    Cell::Text("Nowhere"),
                    Cell::Number(1.0),
                ]],
            },
            SheetSpec {
                name: "metadata",
                columns: &["header", "currency", "abbreviation"],
                rows: vec![],
            },
        ],
    );

    let err = pipeline::run(&config_for(input, &output)).await.unwrap_err();
    let root = err.downcast_ref::<FlowsheetError>().unwrap();
    match root {
        FlowsheetError::UnknownNode { name, .. } => assert_eq!(name, "Nowhere"),
        other => panic!("expected unknown node error, got {other}"),
    }
    assert!(!output.exists());
}

#[tokio::test]
async fn empty_metadata_sheet_gets_defaults() {
    let dir = tempdir().unwrap();
    let input = dir.path().join("demo.xlsx");
    let output = dir.path().join("demo.svg");
    write_workbook(
        &input,
        &[
            SheetSpec {
                name: "nodes",
                columns: &["name", "type"],
                rows: vec![
                    vec![Cell::Text("In"), Cell::Text("source")],
                    vec![Cell::Text("Out"), Cell::Text("sink")],
                ],
            },
            SheetSpec {
                name: "links",
                columns: &["source", "target", "value"],
                rows: vec![vec![Cell::Text("In"), Cell::Text("Out"), Cell::Number(1.5)]],
            },
            SheetSpec {
                name: "metadata",
                columns: &["header", "currency", "abbreviation"],
                rows: vec![],
            },
        ],
    );

    pipeline::run(&config_for(input, &output)).await.unwrap();

    let svg = std::fs::read_to_string(&output).unwrap();
    assert!(svg.contains("> 1.50B€</tspan>"));
}
