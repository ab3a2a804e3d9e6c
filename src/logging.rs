//! Logging setup.
//!
//! The library only emits `tracing` events; nothing is printed unless the
//! application installs a subscriber. [`init_logger`] is a convenience for
//! binaries, tests and notebooks-turned-programs that just want readable
//! output.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Install a compact `fmt` subscriber filtered by `RUST_LOG`.
///
/// Without `RUST_LOG`, `bsutils` events are shown from `debug` level when
/// `verbose` is set and from `info` level otherwise. Calling it twice is
/// harmless: the second registration is ignored.
pub fn init_logger(verbose: bool) {
    let default_filter = if verbose {
        "bsutils=debug,info"
    } else {
        "bsutils=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .try_init();
}
