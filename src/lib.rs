pub mod commands;
pub mod core;

use tracing_subscriber::EnvFilter;

/// Initialize structured logging. `RUST_LOG` wins over the debug flag.
pub fn init_logging(debug: bool) {
    let default_filter = if debug {
        "debug"
    } else {
        "info,installer_lib=debug"
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .with_writer(std::io::stderr)
        .try_init();

    tracing::info!("Installer {} starting...", env!("CARGO_PKG_VERSION"));
}
