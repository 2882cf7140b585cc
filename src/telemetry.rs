//! Diagnostic logging for the binary: a `tracing-subscriber` fmt layer on stderr.
//!
//! Filter precedence: `--verbose` (debug for this crate), then `COMPOSE_RUNNER_LOG`,
//! then `warn`. Library code only emits events; it never installs a subscriber.

use std::env;

use once_cell::sync::OnceCell;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::ENV_LOG;

static INIT: OnceCell<()> = OnceCell::new();

fn filter_directive(verbose: bool) -> String {
    if verbose {
        return "compose_runner=debug,warn".to_string();
    }
    env::var(ENV_LOG)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "warn".to_string())
}

/// Install the global subscriber once. Returns false if one was already set elsewhere.
pub fn init(verbose: bool) -> bool {
    if INIT.get().is_some() {
        return true;
    }
    let env_filter = EnvFilter::try_new(filter_directive(verbose))
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);
    if tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .try_init()
        .is_err()
    {
        return false;
    }
    let _ = INIT.set(());
    true
}
