//! Shared helpers for the integration scenarios.

#![allow(dead_code)]

use std::env;
use std::sync::Once;
use std::thread;
use std::time::{Duration, Instant};

static INIT_TRACING: Once = Once::new();

/// Opt-in tracing for test runs: set `TRACE_TESTS=1`.
pub fn init_tracing() {
    if let Ok(val) = env::var("TRACE_TESTS") {
        if val == "1" {
            INIT_TRACING.call_once(|| {
                tracing_subscriber::fmt()
                    .with_env_filter("relay_rust=debug")
                    .init();
            });
        }
    }
}

/// Poll `condition` every few milliseconds until it holds or `timeout`
/// elapses; returns whether it held.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
