//! Log output for the scheduler.
//!
//! Log lines are written with `trace!`/`debug!`/`info!`/`warn!`/`error!`
//! imported from this module. Built with `--features tracing` they are the
//! `tracing` macros; built without it they swallow their arguments and the
//! crate carries no logging code at all.

/// Sends scheduler log events to stderr, stamped with time since start.
///
/// `RUST_LOG` picks what is shown; unset, it shows `pacer` at debug level,
/// which covers lifecycle and correction events but not per-event firing.
/// Safe to call more than once. Without the `tracing` feature this is a no-op.
#[cfg(feature = "tracing")]
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("pacer=debug"));

    // The scheduler is single-threaded, so thread ids and names are noise.
    let layer = fmt::layer()
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(fmt::time::uptime());

    // Err means a subscriber is already installed, e.g. by an earlier test.
    let _ = tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .try_init();
}

#[cfg(not(feature = "tracing"))]
pub const fn init_tracing() {}

#[cfg(feature = "tracing")]
pub(crate) use tracing::{debug, error, info, trace, warn};

// Accepts anything the tracing macros accept, field syntax included.
#[cfg(not(feature = "tracing"))]
macro_rules! discard {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "tracing"))]
pub(crate) use {
    discard as debug, discard as error, discard as info, discard as trace, discard as warn,
};
