//! Sankey geometry: layer assignment, column placement, vertical
//! stacking and link offsets.
//!
//! This is a deterministic single-pass placement. Node and link records
//! are never mutated; geometry lives in the layout types returned here.

use std::cmp::Ordering as CmpOrdering;
use std::collections::{HashMap, VecDeque};
use std::fmt;

use tracing::debug;

use crate::config::Alignment;
use crate::error::{FlowsheetError, Result};
use crate::graph::{SankeyGraph, LOSS_NODE_TYPE};

/// Ordering of nodes within a column, or of link slots along a node edge.
///
/// `Auto` is the default ordering (descending value for nodes, opposite
/// endpoint position for links); `Unsorted` keeps worksheet row order;
/// `Comparator` lets library callers supply their own ordering.
pub enum SortMode<T> {
    Auto,
    Unsorted,
    Comparator(fn(&T, &T) -> CmpOrdering),
}

impl<T> Clone for SortMode<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for SortMode<T> {}

impl<T> fmt::Debug for SortMode<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortMode::Auto => f.write_str("Auto"),
            SortMode::Unsorted => f.write_str("Unsorted"),
            SortMode::Comparator(_) => f.write_str("Comparator(..)"),
        }
    }
}

/// Rectangle the diagram is laid out into, in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct LayoutConfig {
    pub node_width: f64,
    pub node_padding: f64,
    pub align: Alignment,
    pub node_order: SortMode<LayoutNode>,
    pub link_order: SortMode<LayoutLink>,
    pub extent: Extent,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            node_width: 50.0,
            node_padding: 80.0,
            align: Alignment::Justify,
            node_order: SortMode::Auto,
            link_order: SortMode::Auto,
            extent: Extent {
                x0: 0.0,
                y0: 0.0,
                x1: 1920.0,
                y1: 1080.0,
            },
        }
    }
}

/// A node with computed geometry. `value` is the larger of the inbound
/// and outbound flow totals.
#[derive(Debug, Clone)]
pub struct LayoutNode {
    pub name: String,
    pub node_type: String,
    pub color: Option<String>,
    pub value: f64,
    pub layer: usize,
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

impl LayoutNode {
    pub fn is_loss(&self) -> bool {
        self.node_type == LOSS_NODE_TYPE
    }
}

/// A link with resolved endpoints (indices into the layout node list)
/// and computed geometry. `y0`/`y1` are the vertical midpoints of the
/// link at the source and target edges.
#[derive(Debug, Clone)]
pub struct LayoutLink {
    pub source: usize,
    pub target: usize,
    pub value: f64,
    pub width: f64,
    pub y0: f64,
    pub y1: f64,
    pub color: Option<String>,
}

/// Computed diagram geometry. `layers` is the highest layer index.
#[derive(Debug, Clone)]
pub struct SankeyLayout {
    pub nodes: Vec<LayoutNode>,
    pub links: Vec<LayoutLink>,
    pub layers: usize,
}

/// Lays out the graph. Fails on an empty graph, duplicate node names,
/// links referencing unknown nodes, negative flow values and cycles.
pub fn compute_layout(graph: &SankeyGraph, config: &LayoutConfig) -> Result<SankeyLayout> {
    if graph.nodes.is_empty() {
        return Err(FlowsheetError::EmptyGraph);
    }

    let n = graph.nodes.len();
    let mut index_by_name = HashMap::with_capacity(n);
    for (idx, node) in graph.nodes.iter().enumerate() {
        if index_by_name.insert(node.name.as_str(), idx).is_some() {
            return Err(FlowsheetError::DuplicateNode(node.name.clone()));
        }
    }

    let mut links = Vec::with_capacity(graph.links.len());
    for (index, link) in graph.links.iter().enumerate() {
        let source = *index_by_name
            .get(link.source.as_str())
            .ok_or_else(|| FlowsheetError::UnknownNode {
                index,
                name: link.source.clone(),
            })?;
        let target = *index_by_name
            .get(link.target.as_str())
            .ok_or_else(|| FlowsheetError::UnknownNode {
                index,
                name: link.target.clone(),
            })?;
        if !(link.value >= 0.0) {
            return Err(FlowsheetError::NegativeFlow {
                source_node: link.source.clone(),
                target: link.target.clone(),
                value: link.value,
            });
        }
        links.push(LayoutLink {
            source,
            target,
            value: link.value,
            width: 0.0,
            y0: 0.0,
            y1: 0.0,
            color: link.color.clone(),
        });
    }

    let mut outgoing: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut incoming: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (li, link) in links.iter().enumerate() {
        outgoing[link.source].push(li);
        incoming[link.target].push(li);
    }

    // Node value is the larger of the flow totals on either side, the
    // usual Sankey convention.
    let values: Vec<f64> = (0..n)
        .map(|i| {
            let outbound: f64 = outgoing[i].iter().map(|&li| links[li].value).sum();
            let inbound: f64 = incoming[i].iter().map(|&li| links[li].value).sum();
            outbound.max(inbound)
        })
        .collect();

    let depth = topological_rank(graph, &links, false)?;
    let height = topological_rank(graph, &links, true)?;
    let max_depth = depth.iter().copied().max().unwrap_or(0);

    let layer: Vec<usize> = (0..n)
        .map(|i| match config.align {
            Alignment::Left => depth[i],
            Alignment::Right => max_depth - height[i],
            Alignment::Justify => {
                if outgoing[i].is_empty() {
                    max_depth
                } else {
                    depth[i]
                }
            }
            Alignment::Center => {
                if !incoming[i].is_empty() {
                    depth[i]
                } else if !outgoing[i].is_empty() {
                    outgoing[i]
                        .iter()
                        .map(|&li| depth[links[li].target])
                        .min()
                        .unwrap_or(1)
                        .saturating_sub(1)
                } else {
                    0
                }
            }
        })
        .collect();

    let max_layer = layer.iter().copied().max().unwrap_or(0);
    let extent = config.extent;
    let kx = if max_layer == 0 {
        0.0
    } else {
        (extent.x1 - extent.x0 - config.node_width) / max_layer as f64
    };

    let mut nodes: Vec<LayoutNode> = graph
        .nodes
        .iter()
        .enumerate()
        .map(|(i, node)| {
            let x0 = extent.x0 + layer[i] as f64 * kx;
            LayoutNode {
                name: node.name.clone(),
                node_type: node.node_type.clone(),
                color: node.color.clone(),
                value: values[i],
                layer: layer[i],
                x0,
                x1: x0 + config.node_width,
                y0: 0.0,
                y1: 0.0,
            }
        })
        .collect();

    let mut columns: Vec<Vec<usize>> = vec![Vec::new(); max_layer + 1];
    for (i, &l) in layer.iter().enumerate() {
        columns[l].push(i);
    }
    for column in &mut columns {
        match config.node_order {
            SortMode::Unsorted => {}
            SortMode::Auto => column.sort_by(|&a, &b| {
                nodes[b]
                    .value
                    .partial_cmp(&nodes[a].value)
                    .unwrap_or(CmpOrdering::Equal)
            }),
            SortMode::Comparator(cmp) => column.sort_by(|&a, &b| cmp(&nodes[a], &nodes[b])),
        }
    }

    // One global value-to-pixel scale, chosen so the tallest column
    // still fits the extent.
    let mut ky = f64::INFINITY;
    for column in &columns {
        let sum: f64 = column.iter().map(|&i| nodes[i].value).sum();
        if sum > 0.0 {
            let available =
                (extent.y1 - extent.y0) - config.node_padding * column.len().saturating_sub(1) as f64;
            ky = ky.min(available / sum);
        }
    }
    if !ky.is_finite() {
        ky = 0.0;
    }
    ky = ky.max(0.0);

    for column in &columns {
        let mut y = extent.y0;
        for &i in column {
            let h = nodes[i].value * ky;
            nodes[i].y0 = y;
            nodes[i].y1 = y + h;
            y += h + config.node_padding;
        }
    }

    for link in &mut links {
        link.width = link.value * ky;
    }

    // Stagger link slots along each node edge so flows do not overlap.
    for i in 0..n {
        order_links(&mut outgoing[i], &links, &nodes, config.link_order, true);
        let mut y = nodes[i].y0;
        for &li in &outgoing[i] {
            links[li].y0 = y + links[li].width / 2.0;
            y += links[li].width;
        }

        order_links(&mut incoming[i], &links, &nodes, config.link_order, false);
        let mut y = nodes[i].y0;
        for &li in &incoming[i] {
            links[li].y1 = y + links[li].width / 2.0;
            y += links[li].width;
        }
    }

    debug!(
        nodes = nodes.len(),
        links = links.len(),
        layers = max_layer + 1,
        "layout computed"
    );

    Ok(SankeyLayout {
        nodes,
        links,
        layers: max_layer,
    })
}

fn order_links(
    slots: &mut [usize],
    links: &[LayoutLink],
    nodes: &[LayoutNode],
    mode: SortMode<LayoutLink>,
    at_source: bool,
) {
    match mode {
        SortMode::Unsorted => {}
        SortMode::Auto => slots.sort_by(|&a, &b| {
            let opposite = |li: usize| {
                if at_source {
                    nodes[links[li].target].y0
                } else {
                    nodes[links[li].source].y0
                }
            };
            opposite(a)
                .partial_cmp(&opposite(b))
                .unwrap_or(CmpOrdering::Equal)
        }),
        SortMode::Comparator(cmp) => slots.sort_by(|&a, &b| cmp(&links[a], &links[b])),
    }
}

/// Longest-path rank from the roots (or from the leaves when
/// `reversed`), via Kahn's algorithm. Detects cycles, self-loops
/// included.
fn topological_rank(
    graph: &SankeyGraph,
    links: &[LayoutLink],
    reversed: bool,
) -> Result<Vec<usize>> {
    let n = graph.nodes.len();
    let mut indegree = vec![0usize; n];
    let mut adjacency: Vec<Vec<usize>> = vec![Vec::new(); n];
    for link in links {
        let (from, to) = if reversed {
            (link.target, link.source)
        } else {
            (link.source, link.target)
        };
        adjacency[from].push(to);
        indegree[to] += 1;
    }

    let mut rank = vec![0usize; n];
    let mut queue: VecDeque<usize> = (0..n).filter(|&i| indegree[i] == 0).collect();
    let mut seen = 0;
    while let Some(node) = queue.pop_front() {
        seen += 1;
        for &next in &adjacency[node] {
            rank[next] = rank[next].max(rank[node] + 1);
            indegree[next] -= 1;
            if indegree[next] == 0 {
                queue.push_back(next);
            }
        }
    }

    if seen < n {
        let stuck = (0..n).find(|&i| indegree[i] > 0).unwrap_or(0);
        return Err(FlowsheetError::CircularLink(graph.nodes[stuck].name.clone()));
    }
    Ok(rank)
}
