// 🗄️ Code Record Store - SQLite
// One row per SWIFT code, plus an append-only audit trail of events

use crate::entities::SwiftCode;
use crate::error::{RegistryError, Result};
use anyhow::Context;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ============================================================================
// STORE CONTRACT
// ============================================================================

/// What the resolution engine needs from persistence.
///
/// Lookups return records in the store's natural (insertion) order.
pub trait SwiftCodeStore {
    fn get(&self, code: &str) -> Result<Option<SwiftCode>>;

    fn get_by_country(&self, country_iso2: &str) -> Result<Vec<SwiftCode>>;

    /// Every record whose back-reference equals `headquarter_code` (8 chars)
    fn get_by_headquarter_code(&self, headquarter_code: &str) -> Result<Vec<SwiftCode>>;

    /// Fails with `AlreadyExists` when the code is already stored
    fn insert(&self, record: &SwiftCode) -> Result<()>;

    /// Insert many records atomically, skipping codes already present
    fn insert_batch(&self, records: &[SwiftCode]) -> Result<BatchOutcome>;

    /// Returns false when nothing was deleted
    fn delete(&self, code: &str) -> Result<bool>;

    fn count(&self) -> Result<i64>;

    fn record_event(&self, event: &Event) -> Result<()>;

    /// Events for one SWIFT code, newest first
    fn events_for(&self, code: &str) -> Result<Vec<Event>>;
}

/// Result of a bulk insert
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub inserted: usize,
    pub duplicates: usize,
}

// ============================================================================
// AUDIT EVENTS
// ============================================================================

pub const ENTITY_SWIFT_CODE: &str = "swift_code";
pub const ENTITY_IMPORT: &str = "import";

/// Event for audit trail ("every change is an event")
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Event {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub entity_type: String,
    pub entity_id: String,
    pub data: serde_json::Value,
    pub actor: String,
}

impl Event {
    pub fn new(
        event_type: &str,
        entity_type: &str,
        entity_id: &str,
        data: serde_json::Value,
        actor: &str,
    ) -> Self {
        Self {
            event_id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event_type: event_type.to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            data,
            actor: actor.to_string(),
        }
    }
}

// ============================================================================
// SQLITE STORE
// ============================================================================

pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) a database file and make sure the schema exists
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database {}", path.display()))?;
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    pub fn open_in_memory() -> anyhow::Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

pub fn setup_database(conn: &Connection) -> anyhow::Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")
        .context("Failed to enable WAL mode")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS swift_codes (
            swift_code VARCHAR(11) PRIMARY KEY NOT NULL,
            bank_name TEXT NOT NULL,
            address TEXT NOT NULL DEFAULT '',
            country_iso2 VARCHAR(2) NOT NULL,
            country_name TEXT NOT NULL,
            is_headquarter INTEGER NOT NULL,
            headquarter_code VARCHAR(8),
            time_zone TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS events (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            event_id TEXT UNIQUE NOT NULL,
            timestamp TEXT NOT NULL,
            event_type TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            entity_id TEXT NOT NULL,
            data TEXT NOT NULL,
            actor TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;

    // ==========================================================================
    // Indexes
    // ==========================================================================
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_swift_codes_country ON swift_codes(country_iso2)",
        [],
    )?;

    // Branch lookup: the headquarters → branches relation is this index
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_swift_codes_headquarter ON swift_codes(headquarter_code)",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_events_entity ON events(entity_type, entity_id)",
        [],
    )?;

    Ok(())
}

const SELECT_COLUMNS: &str = "SELECT swift_code, bank_name, address, country_iso2, country_name,
        is_headquarter, headquarter_code, time_zone
 FROM swift_codes";

fn row_to_swift_code(row: &Row<'_>) -> rusqlite::Result<SwiftCode> {
    Ok(SwiftCode {
        code: row.get(0)?,
        bank_name: row.get(1)?,
        address: row.get(2)?,
        country_iso2: row.get(3)?,
        country_name: row.get(4)?,
        is_headquarter: row.get(5)?,
        headquarter_code: row.get(6)?,
        time_zone: row.get(7)?,
    })
}

fn insert_row(conn: &Connection, record: &SwiftCode) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO swift_codes (
            swift_code, bank_name, address, country_iso2, country_name,
            is_headquarter, headquarter_code, time_zone
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            record.code,
            record.bank_name,
            record.address,
            record.country_iso2,
            record.country_name,
            record.is_headquarter,
            record.headquarter_code,
            record.time_zone,
        ],
    )
}

// Only the primary key counts as "already exists"; other constraint failures are real errors
fn is_duplicate_code(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
                && e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
    )
}

fn text_conversion_failure<E>(column: usize, err: E) -> rusqlite::Error
where
    E: std::error::Error + Send + Sync + 'static,
{
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(err))
}

impl SqliteStore {
    fn query_records(&self, where_clause: &str, value: &str) -> Result<Vec<SwiftCode>> {
        let sql = format!("{} WHERE {} ORDER BY rowid", SELECT_COLUMNS, where_clause);
        let mut stmt = self.conn.prepare(&sql)?;

        let records = stmt
            .query_map([value], row_to_swift_code)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }
}

impl SwiftCodeStore for SqliteStore {
    fn get(&self, code: &str) -> Result<Option<SwiftCode>> {
        Ok(self.query_records("swift_code = ?1", code)?.into_iter().next())
    }

    fn get_by_country(&self, country_iso2: &str) -> Result<Vec<SwiftCode>> {
        self.query_records("country_iso2 = ?1", country_iso2)
    }

    fn get_by_headquarter_code(&self, headquarter_code: &str) -> Result<Vec<SwiftCode>> {
        self.query_records("headquarter_code = ?1", headquarter_code)
    }

    fn insert(&self, record: &SwiftCode) -> Result<()> {
        match insert_row(&self.conn, record) {
            Ok(_) => Ok(()),
            Err(e) if is_duplicate_code(&e) => {
                Err(RegistryError::AlreadyExists(record.code.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn insert_batch(&self, records: &[SwiftCode]) -> Result<BatchOutcome> {
        let tx = self.conn.unchecked_transaction()?;
        let mut outcome = BatchOutcome::default();

        for record in records {
            match insert_row(&tx, record) {
                Ok(_) => outcome.inserted += 1,
                Err(e) if is_duplicate_code(&e) => {
                    tracing::warn!(swift_code = %record.code, "Duplicate SWIFT code skipped");
                    outcome.duplicates += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        tx.commit()?;
        Ok(outcome)
    }

    fn delete(&self, code: &str) -> Result<bool> {
        let deleted = self
            .conn
            .execute("DELETE FROM swift_codes WHERE swift_code = ?1", [code])?;
        Ok(deleted > 0)
    }

    fn count(&self) -> Result<i64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM swift_codes", [], |row| row.get(0))?;
        Ok(count)
    }

    fn record_event(&self, event: &Event) -> Result<()> {
        let data_json =
            serde_json::to_string(&event.data).context("Failed to serialize event data")?;

        self.conn.execute(
            "INSERT INTO events (
                event_id, timestamp, event_type, entity_type, entity_id, data, actor
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                event.event_id,
                event.timestamp.to_rfc3339(),
                event.event_type,
                event.entity_type,
                event.entity_id,
                data_json,
                event.actor,
            ],
        )?;

        Ok(())
    }

    fn events_for(&self, code: &str) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT event_id, timestamp, event_type, entity_type, entity_id, data, actor
             FROM events
             WHERE entity_type = ?1 AND entity_id = ?2
             ORDER BY timestamp DESC, id DESC",
        )?;

        let events = stmt
            .query_map(params![ENTITY_SWIFT_CODE, code], |row| {
                let timestamp_str: String = row.get(1)?;
                let data_json: String = row.get(5)?;

                Ok(Event {
                    event_id: row.get(0)?,
                    timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
                        .map_err(|e| text_conversion_failure(1, e))?
                        .with_timezone(&Utc),
                    event_type: row.get(2)?,
                    entity_type: row.get(3)?,
                    entity_id: row.get(4)?,
                    data: serde_json::from_str(&data_json)
                        .map_err(|e| text_conversion_failure(5, e))?,
                    actor: row.get(6)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(events)
    }
}

// ============================================================================
// TESTS
// ============================================================================
