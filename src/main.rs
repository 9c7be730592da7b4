// SWIFT Code Registry - operator CLI
//
//   swift-registry import <file>      load a spreadsheet/CSV (only into an empty store)
//   swift-registry show <code>        details, with branches for headquarters
//   swift-registry country <iso2>     every code registered for a country
//   swift-registry history <code>     audit events for a code
//
// The database path comes from SWIFT_DB_PATH (see config.rs).

use anyhow::{bail, Result};
use std::env;
use std::path::Path;

use swift_registry::{
    init_tracing, run_startup_import, Config, ImportOutcome, Registry, SqliteStore, ACTOR_CLI,
};

fn main() -> Result<()> {
    init_tracing();

    let args: Vec<String> = env::args().collect();
    let config = Config::from_env();

    match (args.get(1).map(String::as_str), args.get(2)) {
        (Some("import"), Some(path)) => run_import(&config, Path::new(path)),
        (Some("show"), Some(code)) => run_show(&config, code),
        (Some("country"), Some(iso2)) => run_country(&config, iso2),
        (Some("history"), Some(code)) => run_history(&config, code),
        _ => {
            print_usage();
            Ok(())
        }
    }
}

fn print_usage() {
    println!("SWIFT Code Registry v{}", swift_registry::VERSION);
    println!();
    println!("Usage:");
    println!("  swift-registry import <file.xlsx|file.csv>");
    println!("  swift-registry show <swift-code>");
    println!("  swift-registry country <iso2>");
    println!("  swift-registry history <swift-code>");
}

fn open_registry(config: &Config) -> Result<Registry<SqliteStore>> {
    let store = SqliteStore::open(&config.db_path)?;
    Ok(Registry::new(store))
}

fn run_import(config: &Config, path: &Path) -> Result<()> {
    println!("📂 Importing {}", path.display());
    let registry = open_registry(config)?;

    match run_startup_import(registry.store(), path, ACTOR_CLI) {
        ImportOutcome::Imported(report) => {
            println!("✓ Rows read:   {}", report.rows_read);
            println!("✓ Inserted:    {}", report.inserted);
            println!("✓ Duplicates:  {}", report.duplicates);
            println!("✓ Skipped:     {}", report.skipped);
            Ok(())
        }
        ImportOutcome::Skipped { existing } => {
            println!("Database already contains {} SWIFT codes, nothing imported", existing);
            Ok(())
        }
        ImportOutcome::Failed { reason } => bail!("Import failed: {}", reason),
    }
}

fn run_show(config: &Config, code: &str) -> Result<()> {
    let registry = open_registry(config)?;
    let view = registry.resolve_details(code)?;
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

fn run_country(config: &Config, iso2: &str) -> Result<()> {
    let registry = open_registry(config)?;
    let view = registry.resolve_by_country(iso2)?;
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

fn run_history(config: &Config, code: &str) -> Result<()> {
    let registry = open_registry(config)?;
    let events = registry.history(code)?;

    if events.is_empty() {
        println!("No events recorded for {}", code);
        return Ok(());
    }

    for event in events {
        println!(
            "{}  {:<20} by {:<8} {}",
            event.timestamp.to_rfc3339(),
            event.event_type,
            event.actor,
            event.data
        );
    }
    Ok(())
}
