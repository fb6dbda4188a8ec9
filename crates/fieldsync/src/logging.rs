//! Logging setup.
//!
//! Failures the engine absorbs instead of returning (a collection read served
//! as empty, a push left unsynced, a probe that marks the engine offline) are
//! logged under [`DEGRADED_TARGET`]. They stay visible even with `--quiet`,
//! because each one means records are still waiting on the device.
//!
//! Output goes to stderr so command results on stdout (including `--json`)
//! stay machine-readable.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Target for failures the engine recovers from locally.
pub const DEGRADED_TARGET: &str = "fieldsync::degraded";

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors, plus absorbed failures.
    Quiet,
    /// Info and above.
    #[default]
    Normal,
    /// Debug and above.
    Verbose,
    /// Everything, including HTTP client internals.
    Trace,
}

impl Verbosity {
    /// Level applied to the `fieldsync` targets.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }
}

/// Filter directives used when `RUST_LOG` is unset.
#[must_use]
pub fn filter_directives(verbosity: Verbosity) -> String {
    let level = verbosity.to_level_filter();
    match verbosity {
        Verbosity::Quiet => format!("fieldsync={level},{DEGRADED_TARGET}=warn"),
        Verbosity::Normal | Verbosity::Verbose => format!("fieldsync={level}"),
        Verbosity::Trace => format!("fieldsync={level},reqwest=debug"),
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `verbosity` when set. Only the first call
/// installs anything.
///
/// ```no_run
/// use fieldsync::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// ```
pub fn init_logging(verbosity: Verbosity) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(verbosity)));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .try_init();
}

/// Warnings only, captured by the test harness.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}
