//! Tracing subscriber setup
//!
//! Logs go to journald when it is reachable and to stderr otherwise.
//! `RUST_LOG` overrides the default filter.

use std::sync::Once;

use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_FILTER: &str = "tern=debug,tern_core=debug,smithay=warn";

const SYSLOG_IDENTIFIER: &str = "tern";

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging() {
    static INIT_LOG: Once = Once::new();
    INIT_LOG.call_once(|| {
        let filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        if let Ok(journald) = tracing_journald::layer() {
            tracing_subscriber::registry()
                .with(filter)
                .with(journald.with_syslog_identifier(SYSLOG_IDENTIFIER.to_string()))
                .init();
        } else {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    });
}

/// Stderr-only subscriber for tests; ignores an already installed one.
pub fn init_test_logging() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
