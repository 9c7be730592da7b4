// ⚙️ Configuration from environment variables
//
//   SWIFT_DB_PATH      SQLite database file (default: swift_codes.db)
//   SWIFT_IMPORT_PATH  spreadsheet/CSV loaded at startup into an empty store (optional)
//   SWIFT_BIND_ADDR    listen address for the API server (default: 0.0.0.0:8080)

use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "swift_codes.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub db_path: PathBuf,
    pub import_path: Option<PathBuf>,
    pub bind_addr: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Config {
            db_path: get("SWIFT_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH)),
            import_path: get("SWIFT_IMPORT_PATH").map(PathBuf::from),
            bind_addr: get("SWIFT_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}
