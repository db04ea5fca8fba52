use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::{EnvFilter, fmt};

/// Initializes structured logging using `tracing-subscriber`.
///
/// Logs go to stderr so stdout only carries issued ids. The filter defaults to
/// `info` and can be overridden with `RUST_LOG` (e.g. `RUST_LOG=blockid=debug`
/// to see every top-up and escalation).
pub fn init_tracing() {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_span_events(FmtSpan::NONE)
        .with_target(false)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();
}
