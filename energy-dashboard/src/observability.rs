use tracing_subscriber::EnvFilter;

/// Logs go to stderr so rendered views on stdout stay clean.
pub fn init_tracing() {
    let filter = EnvFilter::from_default_env()
        .add_directive("energy_dashboard=info".parse().unwrap_or_else(|_| "info".parse().unwrap()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
