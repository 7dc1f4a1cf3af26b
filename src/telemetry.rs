use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialise the process-wide tracing subscriber.
///
/// `RUST_LOG` wins over `default_level`. Safe to call more than once;
/// later calls are no-ops so embedding hosts keep their own subscriber.
pub fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}
