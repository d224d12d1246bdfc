//! Tracing subscriber setup for the binary
//!
//! The library only emits events; hosts embedding it install their own
//! subscriber.

use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Environment variable holding the filter directives
pub const LOG_ENV_VAR: &str = "GITSCOPE_LOG";

fn env_filter() -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(if cfg!(debug_assertions) {
            LevelFilter::DEBUG.into()
        } else {
            LevelFilter::INFO.into()
        })
        .with_env_var(LOG_ENV_VAR)
        .from_env_lossy()
}

/// Install the global subscriber: formatted events on stderr
///
/// Stdout stays reserved for command output.
pub fn init() -> color_eyre::Result<()> {
    let fmt = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(fmt)
        .with(env_filter())
        .try_init()?;
    Ok(())
}
