//! Log output for the CLI.
//!
//! The libraries log through the `log` facade; the subscriber installed here
//! bridges those records into `tracing` and writes them to stderr.

use tracing_subscriber::EnvFilter;

/// Filter for a `-v` count: warnings by default, then info, debug, trace.
/// `--quiet` keeps errors only.
pub fn level_for(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the stderr subscriber. `RUST_LOG` wins over the flags when set.
pub fn init(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(verbose, quiet)));

    // A second call in the same process is a no-op
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose > 1)
        .with_writer(std::io::stderr)
        .try_init();
}
