use std::path::{Path, PathBuf};

use clap::ValueEnum;

/// Horizontal alignment of node columns, matching the CLI choices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Alignment {
    Left,
    Right,
    Center,
    #[default]
    Justify,
}

/// Output image format, resolved from the output file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Svg,
    Png,
}

/// Where the rendered diagram is written, and in which format.
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTarget {
    pub path: PathBuf,
    pub format: OutputFormat,
}

impl OutputTarget {
    /// Resolves the `--output` argument: a `.png` extension selects
    /// raster output, `.svg` or a bare stem selects vector output, and
    /// any other extension is written as a vector document under the
    /// literal file name.
    pub fn resolve(spec: &str) -> Self {
        let path = Path::new(spec);
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("png") => Self {
                path: path.to_path_buf(),
                format: OutputFormat::Png,
            },
            Some(_) => Self {
                path: path.to_path_buf(),
                format: OutputFormat::Svg,
            },
            None => Self {
                path: PathBuf::from(format!("{spec}.svg")),
                format: OutputFormat::Svg,
            },
        }
    }
}

/// Pipeline configuration, built once from the parsed CLI in `main` and
/// passed into each stage. No stage reads ambient process state.
#[derive(Debug, Clone)]
pub struct Config {
    pub input: PathBuf,
    pub output: OutputTarget,
    pub align: Alignment,
    pub node_width: f64,
    pub node_padding: f64,
    /// Keep nodes in worksheet order instead of the default value ordering.
    pub unsorted_nodes: bool,
    /// Keep link slots in worksheet order instead of the default position ordering.
    pub unsorted_links: bool,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn png_extension_selects_raster_output() {
        let target = OutputTarget::resolve("chart.png");
        assert_eq!(target.format, OutputFormat::Png);
        assert_eq!(target.path, PathBuf::from("chart.png"));
    }

    #[test]
    fn svg_extension_selects_vector_output() {
        let target = OutputTarget::resolve("chart.svg");
        assert_eq!(target.format, OutputFormat::Svg);
        assert_eq!(target.path, PathBuf::from("chart.svg"));
    }

    #[test]
    fn bare_stem_gets_svg_extension() {
        let target = OutputTarget::resolve("output");
        assert_eq!(target.format, OutputFormat::Svg);
        assert_eq!(target.path, PathBuf::from("output.svg"));
    }

    #[test]
    fn other_extension_is_written_literally_as_vector() {
        let target = OutputTarget::resolve("chart.xml");
        assert_eq!(target.format, OutputFormat::Svg);
        assert_eq!(target.path, PathBuf::from("chart.xml"));
    }
}
