use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Reads per-module levels from `SKIN_TRACKER_LOG`, falling back to
/// `skin_tracker=info`. Logs go to stderr so command output stays clean.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("SKIN_TRACKER_LOG")
        .unwrap_or_else(|_| EnvFilter::new("skin_tracker=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}
