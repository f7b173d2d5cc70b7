use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Console logging for the command-line tools.
///
/// `RUST_LOG` wins when set; otherwise `default_level` applies.
pub fn init(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(filter)
        .init();
}
