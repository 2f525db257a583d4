use tracing_subscriber::EnvFilter;

/// Logs go to stderr; stdout is reserved for the worker's structured output.
pub fn setup_for_cli(env_filter: &str) {
    let filter = EnvFilter::try_new(env_filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .compact()
        .init();
}
