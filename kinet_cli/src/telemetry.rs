use tracing_subscriber::EnvFilter;

/// Installs the global fmt subscriber, honouring `RUST_LOG`. `log` records
/// from the client library are routed through it as well. Later calls are
/// no-ops.
pub fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .map(EnvFilter::new)
        .unwrap_or_else(|_| EnvFilter::new("kinet_cli=info,kinet_frontend=info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
