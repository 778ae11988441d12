//! The graph description assembled from the three workbook tables.

/// Node type whose value annotation is rendered parenthesized.
pub const LOSS_NODE_TYPE: &str = "loss";

/// Currency symbol used when the metadata table leaves it blank.
pub const DEFAULT_CURRENCY: &str = "€";

/// Magnitude abbreviation used when the metadata table leaves it blank.
pub const DEFAULT_ABBREVIATION: &str = "B";

/// A participant in the flow graph. `name` is the unique identifier
/// links refer to; a missing `color` means the renderer default applies.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub node_type: String,
    pub color: Option<String>,
}

impl Node {
    pub fn is_loss(&self) -> bool {
        self.node_type == LOSS_NODE_TYPE
    }
}

/// A directed flow of `value` between two nodes, referenced by name.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub source: String,
    pub target: String,
    pub value: f64,
    pub color: Option<String>,
}

/// Workbook metadata as loaded: every field may be absent, which is
/// distinct from an empty string.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Metadata {
    pub header: Option<String>,
    pub currency: Option<String>,
    pub abbreviation: Option<String>,
}

/// The assembled graph description handed to layout and rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct SankeyGraph {
    pub header: String,
    pub currency: String,
    pub abbreviation: String,
    pub nodes: Vec<Node>,
    pub links: Vec<Link>,
}

impl SankeyGraph {
    /// Merges the three loaded tables into one graph description.
    ///
    /// Only the first metadata row is honored; extra rows are ignored.
    /// Absent metadata fields get the documented defaults. Nodes and
    /// links are carried over unchanged, in worksheet row order, which
    /// drives the default vertical ordering downstream. Referential
    /// integrity is checked by the layout stage, not here.
    pub fn assemble(nodes: Vec<Node>, links: Vec<Link>, metadata: Vec<Metadata>) -> Self {
        let meta = metadata.into_iter().next().unwrap_or_default();
        Self {
            header: meta.header.unwrap_or_default(),
            currency: meta
                .currency
                .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            abbreviation: meta
                .abbreviation
                .unwrap_or_else(|| DEFAULT_ABBREVIATION.to_string()),
            nodes,
            links,
        }
    }
}
