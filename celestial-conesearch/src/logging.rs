//! Subscriber setup for the command-line tools.

use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

/// Install a stderr subscriber honouring `RUST_LOG`.
///
/// Without `RUST_LOG` the level is `info`, or `debug` when `debug` is set.
/// stdout is left to the tools' own output.
pub fn init_subscriber(debug: bool) {
    let default_level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    let fmt_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let filter_layer = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
