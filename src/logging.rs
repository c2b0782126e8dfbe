// ABOUTME: Structured logging setup. Output goes exclusively to stderr per the stdio transport contract.
// ABOUTME: stdout is reserved entirely for JSON-RPC frames; any log line on stdout would corrupt the wire.
//
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Logging configuration.
//!
//! MCP stdio transports multiplex JSON-RPC messages over stdout. A single
//! stray `println!` or misrouted log line interleaved with a response frame
//! breaks every client parsing the stream, so this module hard-codes stderr
//! as the only writer regardless of format or environment.

use std::io;

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter};

/// Initialize the global `tracing` subscriber from `RUST_LOG` (or the given
/// default directive when unset), writing exclusively to stderr.
///
/// # Errors
///
/// Returns an error if a global subscriber has already been installed.
pub fn init(default_directive: &str) -> Result<(), TryInitError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

    let layer = fmt::layer()
        .with_writer(io::stderr)
        .with_target(true)
        .with_ansi(false);

    tracing_subscriber::registry().with(filter).with(layer).try_init()
}

#[cfg(test)]
mod tests {
    #[test]
    fn default_directive_is_a_valid_env_filter() {
        assert!("info".parse::<tracing_subscriber::filter::LevelFilter>().is_ok());
    }
}
