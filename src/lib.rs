// SWIFT Code Registry - Core Library
// Exposes all modules for use in the CLI, the API server, and tests

pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod import;
pub mod resolver;
pub mod rules;

#[cfg(feature = "server")]
pub mod api;

// Re-export commonly used types
pub use config::Config;
pub use db::{setup_database, BatchOutcome, Event, SqliteStore, SwiftCodeStore};
pub use entities::{SwiftCode, SwiftCodeCandidate};
pub use error::{RegistryError, Result};
pub use import::{
    load_file, read_rows, row_to_record, run_startup_import, ImportOutcome, ImportReport, RawRow,
    ACTOR_CLI, ACTOR_IMPORTER,
};
pub use resolver::{BranchView, Confirmation, CountryCodeView, CountryView, DetailView, Registry};
pub use rules::{
    derive_headquarter_code, is_headquarter_code, is_valid_swift_code, validate_and_normalize,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Install the tracing subscriber used by both binaries.
///
/// `RUST_LOG` wins; otherwise `info` globally and `debug` for this crate.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,swift_registry=debug".into());

    // A second call (e.g. from tests) keeps the first subscriber
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
