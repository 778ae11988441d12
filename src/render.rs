//! Serializes computed geometry into an SVG document, and rasterizes it
//! to PNG when asked.

use std::fmt::Write as _;

use tracing::debug;

use crate::error::{FlowsheetError, Result};
use crate::graph::SankeyGraph;
use crate::layout::{Extent, SankeyLayout};

const MARGIN_TOP: f64 = 140.0;
const MARGIN_RIGHT: f64 = 250.0;
const MARGIN_BOTTOM: f64 = 30.0;
const MARGIN_LEFT: f64 = 50.0;

const DEFAULT_NODE_COLOR: &str = "#4682b4";
const DEFAULT_LINK_COLOR: &str = "#b0c4de";
const TITLE_COLOR: &str = "blue";
const TITLE_FONT_SIZE: f64 = 80.0;

#[derive(Debug, Clone, Copy)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Label typography is derived from the node padding, so labels
    /// shrink with denser diagrams.
    pub node_padding: f64,
}

/// Rectangle the layout may occupy, leaving room for the title above
/// and the last column's labels to the right.
pub fn diagram_extent(width: u32, height: u32) -> Extent {
    Extent {
        x0: MARGIN_LEFT,
        y0: MARGIN_TOP,
        x1: width as f64 - MARGIN_RIGHT,
        y1: height as f64 - MARGIN_BOTTOM,
    }
}

/// Formats a flow value for a label annotation: two decimals, then the
/// magnitude abbreviation, then the currency symbol ("12.35M$").
pub fn format_value(value: f64, currency: &str, abbreviation: &str) -> String {
    format!("{value:.2}{abbreviation}{currency}")
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Writes the diagram as a standalone SVG document: background, title,
/// link paths, node rectangles and labels with value annotations.
pub fn render_svg(
    layout: &SankeyLayout,
    graph: &SankeyGraph,
    config: &RenderConfig,
) -> Result<String> {
    let width = config.width;
    let height = config.height;
    let mut svg = String::new();

    writeln!(
        svg,
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">"
    )?;
    svg.push_str("  <rect width=\"100%\" height=\"100%\" fill=\"#fff\"/>\n");

    svg.push_str("  <g class=\"links\" fill=\"none\" stroke-opacity=\"0.5\">\n");
    for link in &layout.links {
        let source = &layout.nodes[link.source];
        let target = &layout.nodes[link.target];
        let x0 = source.x1;
        let x1 = target.x0;
        let mid = (x0 + x1) / 2.0;
        let stroke = link.color.as_deref().unwrap_or(DEFAULT_LINK_COLOR);
        writeln!(
            svg,
            "    <path d=\"M{:.1},{:.1}C{:.1},{:.1} {:.1},{:.1} {:.1},{:.1}\" stroke=\"{}\" stroke-width=\"{:.1}\"><title>{} → {}: {}</title></path>",
            x0,
            link.y0,
            mid,
            link.y0,
            mid,
            link.y1,
            x1,
            link.y1,
            stroke,
            link.width.max(1.0),
            escape_xml(&source.name),
            escape_xml(&target.name),
            link.value,
        )?;
    }
    svg.push_str("  </g>\n");

    svg.push_str("  <g class=\"nodes\">\n");
    for node in &layout.nodes {
        writeln!(
            svg,
            "    <rect x=\"{:.1}\" y=\"{:.1}\" width=\"{:.1}\" height=\"{:.1}\" fill=\"{}\"/>",
            node.x0,
            node.y0,
            node.x1 - node.x0,
            node.y1 - node.y0,
            node.color.as_deref().unwrap_or(DEFAULT_NODE_COLOR),
        )?;
    }
    svg.push_str("  </g>\n");

    if !graph.header.is_empty() {
        writeln!(
            svg,
            "  <text x=\"{:.1}\" y=\"70\" font-family=\"Arial\" font-size=\"{TITLE_FONT_SIZE}\" font-weight=\"bold\" text-anchor=\"middle\" fill=\"{TITLE_COLOR}\">{}</text>",
            width as f64 / 2.0,
            escape_xml(&graph.header),
        )?;
    }

    let font_size = config.node_padding / 2.5;
    let annotation_size = font_size * 0.75;
    svg.push_str("  <g class=\"labels\">\n");
    for node in &layout.nodes {
        // Interior columns are labelled above the node; the last column
        // to the node's right, where the margin leaves room.
        let interior = node.layer < layout.layers;
        let (x, y, anchor) = if interior {
            (
                (node.x0 + node.x1) / 2.0,
                node.y0 - config.node_padding / 2.0,
                "middle",
            )
        } else {
            (node.x1 + 6.0, (node.y0 + node.y1) / 2.0, "start")
        };
        let fill = node.color.as_deref().unwrap_or(DEFAULT_NODE_COLOR);
        let amount = format_value(node.value, &graph.currency, &graph.abbreviation);
        let annotation = if node.is_loss() {
            format!("({amount})")
        } else {
            amount
        };
        writeln!(
            svg,
            "    <text x=\"{x:.1}\" y=\"{y:.1}\" font-family=\"Arial\" font-size=\"{font_size:.1}\" font-weight=\"bold\" text-anchor=\"{anchor}\" fill=\"{fill}\">{}<tspan x=\"{x:.1}\" dy=\"{annotation_size:.1}\" font-size=\"{annotation_size:.1}\" font-weight=\"normal\" fill-opacity=\"0.7\"> {}</tspan></text>",
            escape_xml(&node.name),
            escape_xml(&annotation),
        )?;
    }
    svg.push_str("  </g>\n");

    svg.push_str("</svg>\n");
    debug!(bytes = svg.len(), "svg document rendered");
    Ok(svg)
}

/// Rasterizes a rendered SVG document to PNG bytes.
pub fn render_png(svg: &str) -> Result<Vec<u8>> {
    let mut options = resvg::usvg::Options::default();
    options.fontdb_mut().load_system_fonts();

    let tree = resvg::usvg::Tree::from_str(svg, &options)
        .map_err(|err| FlowsheetError::Render(format!("failed to parse generated SVG: {err}")))?;

    let size = tree.size().to_int_size();
    let mut pixmap = tiny_skia::Pixmap::new(size.width(), size.height()).ok_or_else(|| {
        FlowsheetError::Render(format!(
            "failed to allocate {}x{} surface",
            size.width(),
            size.height()
        ))
    })?;

    resvg::render(&tree, tiny_skia::Transform::identity(), &mut pixmap.as_mut());

    pixmap
        .encode_png()
        .map_err(|err| FlowsheetError::Render(format!("failed to encode PNG: {err}")))
}
