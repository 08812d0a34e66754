//! attachment-filer
//!
//! Classifies retrieved attachments with a remote language model and files
//! them into per-client folders:
//!
//! ```text
//! input_files/statement.pdf
//!     └─► CLIENTS/Doe, John/Bank Statements/Chase1234 From Jan1 to Jan31.pdf
//! ```

pub mod classify;
pub mod clients;
pub mod config;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod routing;

pub use config::{ConfigError, FilerConfig};
pub use pipeline::{BatchReport, CancelFlag, Pipeline, PipelineError};

use tracing_subscriber::EnvFilter;

/// Load `.env` from the working directory, then its parent
pub fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        let _ = dotenvy::from_path("../.env");
    }
}

/// Initialize tracing with RUST_LOG env filter.
/// Default: warn for most crates, info for this one (per-document results visible).
/// Use RUST_LOG=debug for raw classifier responses and routing detail.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("warn,attachment_filer=info")),
        )
        .init();
}
