use std::path::PathBuf;

use clap::Parser;
use tracing::error;

use flowsheet::config::{Alignment, Config, OutputTarget};
use flowsheet::logging;
use flowsheet::pipeline;

/// Renders Sankey diagrams from Excel flow tables.
///
/// The short help flag is disabled because `-h` selects the image
/// height; use `--help` for usage.
#[derive(Parser, Debug)]
#[command(name = "flowsheet", version, disable_help_flag = true)]
#[command(about = "Renders Sankey diagrams from Excel flow tables")]
struct Cli {
    /// Path to the input Excel workbook
    #[arg(short, long)]
    input: PathBuf,

    /// Output file name; .png selects raster output, .svg or a bare stem selects vector output
    #[arg(short, long, default_value = "output")]
    output: String,

    /// Node alignment
    #[arg(short, long, value_enum, default_value_t = Alignment::Justify)]
    align: Alignment,

    /// Node width in pixels
    #[arg(short = 'd', long, default_value_t = 50.0)]
    nodewidth: f64,

    /// Vertical padding between nodes in pixels
    #[arg(short = 'p', long, default_value_t = 80.0)]
    nodepadding: f64,

    /// Keep nodes in worksheet order instead of sorting by value
    #[arg(short = 'n', long)]
    nodesort: bool,

    /// Keep links in worksheet order instead of sorting by position
    #[arg(short = 'l', long)]
    linksort: bool,

    /// Image width in pixels
    #[arg(short, long, default_value_t = 1920)]
    width: u32,

    /// Image height in pixels
    #[arg(short = 'h', long, default_value_t = 1080)]
    height: u32,

    /// Print help
    #[arg(long, action = clap::ArgAction::HelpLong)]
    help: Option<bool>,
}

#[tokio::main]
async fn main() {
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config {
        input: cli.input,
        output: OutputTarget::resolve(&cli.output),
        align: cli.align,
        node_width: cli.nodewidth,
        node_padding: cli.nodepadding,
        unsorted_nodes: cli.nodesort,
        unsorted_links: cli.linksort,
        width: cli.width,
        height: cli.height,
    };

    match pipeline::run(&config).await {
        Ok(summary) => {
            println!("✅ Wrote {}", summary.output_file);
            println!("   Nodes:  {}", summary.nodes);
            println!("   Links:  {}", summary.links);
            println!("   Layers: {}", summary.layers);
        }
        Err(e) => {
            error!("pipeline failed: {e:#}");
            eprintln!("❌ {e:#}");
            std::process::exit(1);
        }
    }
}
