//! Startup logging configuration, matching `iqrah-cli`'s
//! `tracing_subscriber::fmt().with_target(false).compact().init()` pattern.

pub fn init() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
