//! Flowsheet turns tabular financial data (nodes, flows, metadata) held
//! in an Excel workbook into a Sankey diagram, written as SVG or PNG.
//!
//! The pipeline runs once per invocation: the three worksheets are
//! loaded and validated ([`loader`]), merged into a graph description
//! with defaulted metadata ([`graph`]), laid out ([`layout`]) and
//! serialized ([`render`]).

pub mod config;
pub mod error;
pub mod graph;
pub mod layout;
pub mod loader;
pub mod logging;
pub mod pipeline;
pub mod render;
