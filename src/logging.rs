use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initializes console logging on stderr, keeping stdout free for the
/// run summary. Verbosity is controlled with `RUST_LOG`.
pub fn init_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flowsheet=warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();
}
