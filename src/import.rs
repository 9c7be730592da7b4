// 📥 Import Adapter - spreadsheet/CSV → SWIFT code records
//
// Column layout of the source sheet (header row skipped):
//   0 country ISO2 | 1 SWIFT code | 2 code type | 3 bank name | 4 address
//   5 town | 6 country name | 7 time zone
//
// Classification comes from the code's suffix alone; the import never
// receives a flag it would have to check.

use crate::db::{BatchOutcome, Event, SwiftCodeStore, ENTITY_IMPORT};
use crate::entities::SwiftCode;
use crate::error::RegistryError;
use crate::rules::{derive_headquarter_code, is_headquarter_code};
use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use sha2::{Digest, Sha256};
use std::path::Path;

pub const ACTOR_IMPORTER: &str = "importer";
pub const ACTOR_CLI: &str = "cli";

const COL_COUNTRY_ISO2: usize = 0;
const COL_SWIFT_CODE: usize = 1;
const COL_BANK_NAME: usize = 3;
const COL_ADDRESS: usize = 4;
const COL_TOWN: usize = 5;
const COL_COUNTRY_NAME: usize = 6;
const COL_TIME_ZONE: usize = 7;

// ============================================================================
// RAW ROWS
// ============================================================================

/// One source row, cells already reduced to trimmed text (`None` = blank)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    /// 1-based row number in the source, header included
    pub line_number: usize,
    pub country_iso2: Option<String>,
    pub swift_code: Option<String>,
    pub bank_name: Option<String>,
    pub address: Option<String>,
    pub town: Option<String>,
    pub country_name: Option<String>,
    pub time_zone: Option<String>,
}

impl RawRow {
    fn from_cells<F>(line_number: usize, cell: F) -> Self
    where
        F: Fn(usize) -> Option<String>,
    {
        RawRow {
            line_number,
            country_iso2: cell(COL_COUNTRY_ISO2),
            swift_code: cell(COL_SWIFT_CODE),
            bank_name: cell(COL_BANK_NAME),
            address: cell(COL_ADDRESS),
            town: cell(COL_TOWN),
            country_name: cell(COL_COUNTRY_NAME),
            time_zone: cell(COL_TIME_ZONE),
        }
    }

    /// "address, town", or whichever of the two is present
    pub fn full_address(&self) -> String {
        match (self.address.as_deref(), self.town.as_deref()) {
            (Some(address), Some(town)) => format!("{}, {}", address, town),
            (Some(address), None) => address.to_string(),
            (None, Some(town)) => town.to_string(),
            (None, None) => String::new(),
        }
    }
}

fn non_blank(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Spreadsheet cell → text. Integral numbers lose their ".0".
fn cell_text(cell: &Data) -> Option<String> {
    match cell {
        Data::String(s) => non_blank(s),
        Data::Int(n) => Some(n.to_string()),
        Data::Float(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
        Data::Float(n) => Some(n.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

// ============================================================================
// SOURCE READERS
// ============================================================================

/// Read every data row from a CSV or spreadsheet source, picked by extension
pub fn read_rows(path: &Path) -> Result<Vec<RawRow>> {
    if !path.exists() {
        return Err(anyhow!("SWIFT codes file not found: {}", path.display()));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "csv" => read_csv_rows(path),
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => read_workbook_rows(path),
        other => Err(anyhow!("Unsupported import file type '{}': {}", other, path.display())),
    }
}

pub fn read_csv_rows(path: &Path) -> Result<Vec<RawRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .context("Failed to open CSV file")?;

    let mut rows = Vec::new();
    for (index, result) in rdr.records().enumerate() {
        let record = result.with_context(|| format!("Failed to read CSV row {}", index + 2))?;
        rows.push(RawRow::from_cells(index + 2, |col| {
            record.get(col).and_then(non_blank)
        }));
    }

    Ok(rows)
}

/// First sheet of an xlsx/xls/xlsb/ods workbook
pub fn read_workbook_rows(path: &Path) -> Result<Vec<RawRow>> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| anyhow!("Failed to open workbook {}: {}", path.display(), e))?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| anyhow!("Workbook has no sheets: {}", path.display()))?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| anyhow!("Failed to read sheet '{}': {}", sheet_name, e))?;

    // Data may not begin at A1
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let start_row = start_row as usize;
    let start_col = start_col as usize;

    let mut rows = Vec::new();
    for (offset, row) in range.rows().enumerate() {
        let sheet_row = start_row + offset;
        if sheet_row == 0 {
            continue; // header
        }

        rows.push(RawRow::from_cells(sheet_row + 1, |col| {
            col.checked_sub(start_col)
                .and_then(|i| row.get(i))
                .and_then(cell_text)
        }));
    }

    Ok(rows)
}

// ============================================================================
// ROW → RECORD
// ============================================================================

/// Map a raw row to a record using the same derivation rules as the API path.
///
/// Fails with `FieldEmpty` when the row has no SWIFT code, and with
/// `CodeTooShortForDerivation` for branch codes under 8 characters.
pub fn row_to_record(row: &RawRow) -> std::result::Result<SwiftCode, RegistryError> {
    let code = row
        .swift_code
        .clone()
        .ok_or(RegistryError::FieldEmpty { field: "swiftCode" })?;

    let is_headquarter = is_headquarter_code(&code);
    let headquarter_code = derive_headquarter_code(&code, is_headquarter)?;

    Ok(SwiftCode {
        bank_name: row.bank_name.clone().unwrap_or_default(),
        address: row.full_address(),
        country_iso2: row.country_iso2.as_deref().unwrap_or_default().to_uppercase(),
        country_name: row.country_name.as_deref().unwrap_or_default().to_uppercase(),
        is_headquarter,
        headquarter_code,
        time_zone: row.time_zone.clone(),
        code,
    })
}

// ============================================================================
// LOADING
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub rows_read: usize,
    pub inserted: usize,
    pub duplicates: usize,
    pub skipped: usize,
}

/// Read the source and insert every usable row. Bad rows are skipped with a
/// warning; a source that cannot be read fails the whole load.
pub fn load_file<S: SwiftCodeStore>(store: &S, path: &Path, actor: &str) -> Result<ImportReport> {
    tracing::info!(path = %path.display(), "Starting to parse SWIFT codes file");

    let rows = read_rows(path)?;
    let fingerprint = file_fingerprint(path)?;
    let mut records = Vec::with_capacity(rows.len());
    let mut skipped = 0;

    for row in &rows {
        match row_to_record(row) {
            Ok(record) => records.push(record),
            Err(e) => {
                tracing::warn!(line = row.line_number, reason = %e, "Skipping row");
                skipped += 1;
            }
        }
    }

    tracing::info!(parsed = records.len(), skipped, "Parsed SWIFT codes");

    let BatchOutcome { inserted, duplicates } = store
        .insert_batch(&records)
        .context("Failed to save imported SWIFT codes")?;

    let report = ImportReport {
        rows_read: rows.len(),
        inserted,
        duplicates,
        skipped,
    };

    let event = Event::new(
        "import_completed",
        ENTITY_IMPORT,
        &path.display().to_string(),
        serde_json::json!({
            "sha256": fingerprint,
            "rows_read": report.rows_read,
            "inserted": report.inserted,
            "duplicates": report.duplicates,
            "skipped": report.skipped,
        }),
        actor,
    );
    if let Err(e) = store.record_event(&event) {
        tracing::error!(error = %e, "Failed to record import event");
    }

    Ok(report)
}

/// SHA-256 of the source file, kept with the import event for provenance
pub fn file_fingerprint(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}

// ============================================================================
// STARTUP IMPORT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    /// Store already had records; nothing read
    Skipped { existing: i64 },
    Imported(ImportReport),
    /// Logged and swallowed; the service keeps running with what it has
    Failed { reason: String },
}

/// One-time bulk load, only into an empty store.
///
/// Never returns an error: an unreadable source leaves the store as it was.
/// The empty check is not atomic against other processes sharing the
/// database.
pub fn run_startup_import<S: SwiftCodeStore>(store: &S, path: &Path, actor: &str) -> ImportOutcome {
    let existing = match store.count() {
        Ok(n) => n,
        Err(e) => {
            tracing::error!(error = %e, "Could not count SWIFT codes, skipping import");
            return ImportOutcome::Failed { reason: e.to_string() };
        }
    };

    if existing > 0 {
        tracing::info!(existing, "Database already contains SWIFT codes, skipping import");
        return ImportOutcome::Skipped { existing };
    }

    match load_file(store, path, actor) {
        Ok(report) => {
            tracing::info!(
                inserted = report.inserted,
                duplicates = report.duplicates,
                skipped = report.skipped,
                "Successfully saved SWIFT codes to the database"
            );
            ImportOutcome::Imported(report)
        }
        Err(e) => {
            let reason = format!("{:#}", e);
            tracing::error!(
                path = %path.display(),
                error = %reason,
                "Error importing SWIFT codes file"
            );
            ImportOutcome::Failed { reason }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
