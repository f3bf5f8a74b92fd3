#![forbid(unsafe_code)]

//! Subscriber setup for the simulator.
//!
//! `RUST_LOG` wins when set; otherwise `--verbose` selects `debug` and the
//! default is `warn`. Logs always go to stderr so stdout stays parseable.

use std::io::IsTerminal;

use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

/// Install the global subscriber. A second call is a no-op.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_ansi(std::io::stderr().is_terminal())
        .with_writer(std::io::stderr);
    // Fails only when a subscriber is already installed.
    let _ = Registry::default().with(filter).with(fmt_layer).try_init();
}
