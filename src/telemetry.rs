//! Logging bootstrap.

/// Installs an env-filtered `fmt` subscriber (`RUST_LOG`) unless the
/// embedding application has already set one.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("u_project=info")),
        )
        .with_target(true)
        .try_init();
}
