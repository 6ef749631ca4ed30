//! Shared test setup. A `mod.rs` under a subdirectory rather than a bare
//! `tests/common.rs` so cargo treats this as a module included by other
//! test binaries instead of a standalone test target of its own.

use std::sync::Once;

static INIT: Once = Once::new();

/// Installs a `tracing` subscriber once per test process. `cargo test`
/// captures stdout per-test and only shows it for a failing test, so this
/// is what turns `lib.rs`'s `tracing::debug!` phase-boundary logs and
/// `vm.rs`'s `tracing::warn!` on a failed host call into visible output
/// when an integration test fails, instead of silently discarding them.
pub fn init_tracing() {
    INIT.call_once(|| {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .init();
    });
}
