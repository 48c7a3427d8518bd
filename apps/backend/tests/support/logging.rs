//! Unified test logging initialization for integration tests
//!
//! Integration test binaries cannot reach the crate's test-only
//! `test_bootstrap` module, so the same initialization lives here.
//!
//! The filter respects these variables in order of precedence:
//! 1. `TEST_LOG` (preferred)
//! 2. `RUST_LOG` (fallback)
//! 3. `"warn"` (default, quiet)
//!
//! ```bash
//! TEST_LOG=info cargo test --test turn_processing_test
//! ```

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static INIT: OnceCell<()> = OnceCell::new();

/// Initialize tracing for tests. Idempotent across the test binary.
pub fn init() {
    INIT.get_or_init(|| {
        let filter = std::env::var("TEST_LOG")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "warn".to_string());

        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new(filter))
            .with_test_writer()
            .without_time()
            .try_init()
            .ok();
    });
}

/// Automatically initialize logging for all integration test binaries.
///
/// This constructor runs once per integration test binary, ensuring logging
/// is set up before any tests run.
#[ctor::ctor]
fn _auto_init_for_integration_tests() {
    init();
}
