// Logging module - Logging infrastructure
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use std::io;

use crate::domain::error::{CliError, CliResult};

/// Initialize logging system.
///
/// `RUST_LOG` wins when set; otherwise only warnings are shown, or debug
/// output when `verbose`.
pub fn init_logging(verbose: bool) -> CliResult<()> {
    let default_filter = if verbose {
        "clikit=debug,calculator=debug,warn"
    } else {
        "clikit=warn,calculator=warn,error"
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_level(true)
                .with_file(verbose)
                .with_line_number(verbose)
        )
        .try_init()
        .map_err(|e| CliError::config(format!("Failed to initialize logging: {}", e)))?;

    tracing::debug!("clikit logging system initialized");
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_init_twice() {
        // The first call may race other tests; the second must fail cleanly.
        let _ = init_logging(false);
        assert!(init_logging(true).is_err());
    }
}
