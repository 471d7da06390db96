// Moodscope Core - streaming pitch/loudness features and mood classification
// Single ingest path feeding read-only presentation snapshots

// Module declarations
pub mod analysis;
pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod fixtures;
pub mod http;
pub mod managers;
pub mod overlay;
pub mod telemetry;

// Re-exports for convenience
pub use api::*;

use once_cell::sync::OnceCell;
use tracing_subscriber::EnvFilter;

static LOGGING: OnceCell<()> = OnceCell::new();

/// Install the tracing subscriber once per process
///
/// Honours `RUST_LOG`, defaulting to `info`. `log` records from library
/// modules are forwarded through the subscriber's log bridge.
pub fn init_logging() {
    LOGGING.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let result = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
        if let Err(err) = result {
            eprintln!("Logging already initialized: {err}");
        }
    });
}
