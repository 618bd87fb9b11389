//! Tracing bootstrap.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the log filter directives.
pub const LOG_ENV: &str = "AUDITFLOW_LOG";

/// Initialize tracing with the `AUDITFLOW_LOG` environment variable.
///
/// Defaults to "info" level if `AUDITFLOW_LOG` is not set or unparsable.
/// Calling it a second time in the same process is a no-op.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
