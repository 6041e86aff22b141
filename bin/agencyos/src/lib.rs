//! AgencyOS portal library
//!
//! Command implementations and the HTTP server behind the `agencyos` binary.
//!
//! # Modules
//!
//! - [`cmd`] - Command implementations (serve, resolve, check)
//! - [`server`] - Page-serving HTTP router

pub mod cmd;
pub mod server;

pub use agencyos_core::Config;

/// Initialize tracing with the specified verbosity level.
///
/// # Arguments
///
/// * `verbose` - Verbosity level (0 = WARN, 1 = INFO, 2 = DEBUG, 3+ = TRACE)
///
/// `RUST_LOG` directives are honored on top of the level.
pub fn init_tracing(verbose: u8) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();
}
