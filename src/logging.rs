use std::io::{self, IsTerminal};

use tracing_subscriber::EnvFilter;

/// Installs the stderr subscriber for the binaries.
///
/// `quiet` wins over `verbose`; otherwise `RUST_LOG` applies, defaulting to `error`.
pub fn init(verbose: bool, quiet: bool) {
    let env_filter = if quiet {
        EnvFilter::new("off")
    } else if verbose {
        EnvFilter::new("mpstream=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("error"))
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr)
        .try_init();
}
