//! Shared helpers for integration tests

use chrono::NaiveDate;
use tracing_subscriber::EnvFilter;

/// Route `tracing` output through the test harness (`RUST_LOG=debug` to see it).
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Day of October 2010, the month the scenarios run in.
#[allow(dead_code)]
pub fn oct(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2010, 10, day).unwrap()
}
