// Copyright (c) 2018-2022 The Botho Foundation

//! Logging utilities built on the `tracing` framework.
//!
//! Configuration is controlled via the `RUST_LOG` environment variable. The
//! signer and builder crates log phase transitions at `debug`, rejected
//! authentication at `warn`, and never log secret material.

/// Re-exported logging macros.
///
/// These accept a leading logger-handle argument for call-site compatibility
/// with the slog-era API this workspace used to expose; the argument is
/// accepted and ignored since `tracing`'s subscriber is process-global.
pub mod log {
    /// Log at info level. Logger parameter is accepted but ignored.
    #[macro_export]
    macro_rules! log_info {
        ($logger:expr, $($arg:tt)*) => {
            tracing::info!($($arg)*)
        };
    }

    /// Log at debug level. Logger parameter is accepted but ignored.
    #[macro_export]
    macro_rules! log_debug {
        ($logger:expr, $($arg:tt)*) => {
            tracing::debug!($($arg)*)
        };
    }

    /// Log at warn level. Logger parameter is accepted but ignored.
    #[macro_export]
    macro_rules! log_warn {
        ($logger:expr, $($arg:tt)*) => {
            tracing::warn!($($arg)*)
        };
    }

    /// Log at error level. Logger parameter is accepted but ignored.
    #[macro_export]
    macro_rules! log_error {
        ($logger:expr, $($arg:tt)*) => {
            tracing::error!($($arg)*)
        };
    }

    /// Log at trace level. Logger parameter is accepted but ignored.
    #[macro_export]
    macro_rules! log_trace {
        ($logger:expr, $($arg:tt)*) => {
            tracing::trace!($($arg)*)
        };
    }

    pub use log_debug as debug;
    pub use log_error as error;
    pub use log_info as info;
    pub use log_trace as trace;
    pub use log_warn as warn;
}

/// Installs a default `tracing` subscriber reading `RUST_LOG`.
///
/// Intended for binaries (the host agent), not library crates.
#[cfg(feature = "std")]
pub fn init_logger() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
