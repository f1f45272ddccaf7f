use tracing_subscriber::EnvFilter;

/// Install the global subscriber, filtered by `RUST_LOG` or `default_level` when unset.
///
/// Logs go to stderr so they never mix with what the CLI prints. Installing twice is a no-op.
pub fn setup_tracing(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .with_writer(std::io::stderr)
        .compact()
        .try_init();
}
