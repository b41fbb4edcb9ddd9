use tracing_subscriber::EnvFilter;

/// Filter variable for diagnostics, e.g. `UEFORGE_LOG=ueforge_app=trace`
pub const LOG_ENV: &str = "UEFORGE_LOG";

/// Install the diagnostics subscriber.
///
/// Build output never goes through here; it travels on the `LogChannel`.
/// Diagnostics are written to stderr so they don't interleave with the
/// rendered build log on stdout.
pub fn init(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {}", e))
}
