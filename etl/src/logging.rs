use tracing_subscriber::EnvFilter;

/// Initialize structured logging for the pipeline binaries.
///
/// Honors `RUST_LOG` when set and falls back to `info` otherwise, so cron
/// output stays readable while a debug rerun can be dialed up per module.
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();
}
