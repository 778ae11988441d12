//! One-shot pipeline: load the workbook tables, assemble the graph,
//! compute geometry, render, write the image. Any failure aborts the
//! run before an output file is written.

use std::fs;

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::config::{Config, OutputFormat};
use crate::graph::SankeyGraph;
use crate::layout::{compute_layout, LayoutConfig, SortMode};
use crate::loader::load_workbook_tables;
use crate::render::{diagram_extent, render_png, render_svg, RenderConfig};

/// Result of a complete diagram run.
#[derive(Debug)]
pub struct PipelineSummary {
    pub nodes: usize,
    pub links: usize,
    pub layers: usize,
    pub output_file: String,
}

#[instrument(skip(config), fields(input = %config.input.display()))]
pub async fn run(config: &Config) -> Result<PipelineSummary> {
    let (nodes, links, metadata) = load_workbook_tables(&config.input)
        .await
        .context("loading workbook tables")?;
    info!(nodes = nodes.len(), links = links.len(), "workbook loaded");

    let graph = SankeyGraph::assemble(nodes, links, metadata);

    let layout_config = LayoutConfig {
        node_width: config.node_width,
        node_padding: config.node_padding,
        align: config.align,
        node_order: if config.unsorted_nodes {
            SortMode::Unsorted
        } else {
            SortMode::Auto
        },
        link_order: if config.unsorted_links {
            SortMode::Unsorted
        } else {
            SortMode::Auto
        },
        extent: diagram_extent(config.width, config.height),
    };
    let layout = compute_layout(&graph, &layout_config).context("computing layout")?;

    let render_config = RenderConfig {
        width: config.width,
        height: config.height,
        node_padding: config.node_padding,
    };
    let svg = render_svg(&layout, &graph, &render_config).context("rendering SVG")?;

    let path = &config.output.path;
    match config.output.format {
        OutputFormat::Png => {
            let png = render_png(&svg).context("rasterizing PNG")?;
            fs::write(path, png)
                .with_context(|| format!("writing output file '{}'", path.display()))?;
        }
        OutputFormat::Svg => {
            fs::write(path, &svg)
                .with_context(|| format!("writing output file '{}'", path.display()))?;
        }
    }
    info!(output = %path.display(), "diagram written");

    Ok(PipelineSummary {
        nodes: layout.nodes.len(),
        links: layout.links.len(),
        layers: layout.layers + 1,
        output_file: path.display().to_string(),
    })
}
