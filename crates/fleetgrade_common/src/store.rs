//! Record Store - SQLite persistence of classified records
//!
//! Schema:
//! - computers: one row per report, `file_name` primary key, list fields
//!   stored as JSON arrays
//!
//! Batches are upserted in one transaction (replace on conflict). Single
//! fields can be corrected in place; the column is chosen from
//! [`RecordField`], never from free text.

use crate::error::{FleetError, Result};
use crate::facts::{
    Category, ClassifiedRecord, RawFacts, RecordField, SlotCount, SmartStatus, NOT_FOUND,
};
use crate::sort::natural_cmp;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS computers (
        file_name TEXT PRIMARY KEY,
        machine_name TEXT NOT NULL,
        os_version TEXT NOT NULL,
        cpu TEXT NOT NULL,
        motherboard TEXT NOT NULL,
        cpu_socket TEXT NOT NULL,
        gpu TEXT NOT NULL,
        monitor TEXT NOT NULL,
        printers TEXT NOT NULL,
        total_ram_text TEXT NOT NULL,
        ram_modules TEXT NOT NULL,
        ram_slots_used INTEGER NOT NULL,
        ram_slots_free TEXT NOT NULL,
        disks TEXT NOT NULL,
        bios_date_text TEXT NOT NULL,
        local_ip TEXT NOT NULL,
        mac_address TEXT NOT NULL,
        smart_status TEXT NOT NULL,
        smart_problem_details TEXT NOT NULL,
        smart_display_details TEXT NOT NULL,
        category INTEGER NOT NULL,
        problems TEXT NOT NULL,
        recommendation TEXT NOT NULL,
        last_updated TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_computers_category ON computers(category);
"#;

/// SQLite-backed record store
pub struct RecordStore {
    conn: Connection,
}

impl RecordStore {
    /// Open (and create if needed) the database at `path`
    pub fn open_at<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Insert or replace every record, stamping `last_updated`
    pub fn upsert_all(&self, records: &[ClassifiedRecord]) -> Result<usize> {
        let now = Utc::now();
        let columns: Vec<&str> = RecordField::ALL.iter().map(|f| f.column()).collect();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT OR REPLACE INTO computers ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        );

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for record in records {
                stmt.execute(params_from_iter(row_values(record, now)?))?;
            }
        }
        tx.commit()?;
        Ok(records.len())
    }

    /// Correct one field of one record. Returns false if the record does not exist.
    pub fn update_field(&self, file_name: &str, field: RecordField, value: &str) -> Result<bool> {
        let encoded = encode_field_value(field, value)?;
        let sql = format!(
            "UPDATE computers SET {} = ?1, last_updated = ?2 WHERE file_name = ?3",
            field.column()
        );
        let changed = self.conn.execute(&sql, params![encoded, Utc::now().to_rfc3339(), file_name])?;
        Ok(changed > 0)
    }

    /// Every record, in natural file-name order
    pub fn fetch_all(&self) -> Result<Vec<ClassifiedRecord>> {
        let sql = format!("SELECT {} FROM computers", select_columns());
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], read_row)?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row??);
        }
        records.sort_by(|a, b| natural_cmp(a.file_name(), b.file_name()));
        Ok(records)
    }

    pub fn get(&self, file_name: &str) -> Result<Option<ClassifiedRecord>> {
        let sql = format!("SELECT {} FROM computers WHERE file_name = ?1", select_columns());
        let record = self
            .conn
            .query_row(&sql, params![file_name], read_row)
            .optional()?;
        record.transpose()
    }

    pub fn count(&self) -> Result<usize> {
        let n: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM computers", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

fn select_columns() -> String {
    RecordField::ALL
        .iter()
        .map(|f| f.column())
        .collect::<Vec<_>>()
        .join(", ")
}

fn encode_list(items: &[String]) -> Result<Value> {
    Ok(Value::Text(serde_json::to_string(items)?))
}

/// Lists are JSON; older rows may hold "; "-joined text
fn decode_list(text: &str) -> Vec<String> {
    serde_json::from_str(text).unwrap_or_else(|_| split_list(text))
}

fn split_list(text: &str) -> Vec<String> {
    text.split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty() && *s != NOT_FOUND)
        .map(str::to_string)
        .collect()
}

fn row_values(record: &ClassifiedRecord, now: DateTime<Utc>) -> Result<Vec<Value>> {
    let f = &record.facts;
    let mut values = Vec::with_capacity(RecordField::ALL.len());
    for field in RecordField::ALL {
        let value = match field {
            RecordField::Printers => encode_list(&f.printers)?,
            RecordField::RamModules => encode_list(&f.ram_modules)?,
            RecordField::Disks => encode_list(&f.disks)?,
            RecordField::SmartProblemDetails => encode_list(&f.smart_problem_details)?,
            RecordField::SmartDisplayDetails => encode_list(&f.smart_display_details)?,
            RecordField::RamSlotsUsed => Value::Integer(f.ram_slots_used as i64),
            RecordField::Category => Value::Integer(record.category.as_u8() as i64),
            RecordField::LastUpdated => Value::Text(now.to_rfc3339()),
            other => Value::Text(record.display_value(other)),
        };
        values.push(value);
    }
    Ok(values)
}

fn invalid(field: RecordField, value: &str) -> FleetError {
    FleetError::InvalidFieldValue {
        field: field.column().to_string(),
        value: value.to_string(),
    }
}

/// Validate user input for one column and convert it to its stored form
fn encode_field_value(field: RecordField, value: &str) -> Result<Value> {
    let trimmed = value.trim();
    match field {
        RecordField::FileName | RecordField::LastUpdated => Err(invalid(field, value)),
        RecordField::Category => trimmed
            .parse::<u8>()
            .ok()
            .and_then(Category::from_u8)
            .map(|c| Value::Integer(c.as_u8() as i64))
            .ok_or_else(|| invalid(field, value)),
        RecordField::RamSlotsUsed => trimmed
            .parse::<u32>()
            .map(|n| Value::Integer(n as i64))
            .map_err(|_| invalid(field, value)),
        RecordField::RamSlotsFree => SlotCount::parse(trimmed)
            .map(|s| Value::Text(s.to_string()))
            .ok_or_else(|| invalid(field, value)),
        RecordField::SmartStatus => SmartStatus::parse(trimmed)
            .map(|s| Value::Text(s.as_str().to_string()))
            .ok_or_else(|| invalid(field, value)),
        f if f.is_list() => encode_list(&split_list(trimmed)),
        _ if trimmed.is_empty() => Ok(Value::Text(NOT_FOUND.to_string())),
        _ => Ok(Value::Text(trimmed.to_string())),
    }
}

fn read_row(row: &Row<'_>) -> rusqlite::Result<Result<ClassifiedRecord>> {
    let text = |i: usize| row.get::<_, String>(i);
    let file_name = text(0)?;

    let smart_text = text(17)?;
    let category_raw: i64 = row.get(20)?;
    let last_updated: Option<String> = row.get(23)?;

    let facts = RawFacts {
        file_name: file_name.clone(),
        machine_name: text(1)?,
        os_version: text(2)?,
        cpu: text(3)?,
        motherboard: text(4)?,
        cpu_socket: text(5)?,
        gpu: text(6)?,
        monitor: text(7)?,
        printers: decode_list(&text(8)?),
        total_ram_text: text(9)?,
        ram_modules: decode_list(&text(10)?),
        ram_slots_used: u32::try_from(row.get::<_, i64>(11)?.max(0)).unwrap_or(u32::MAX),
        ram_slots_free: SlotCount::parse(&text(12)?).unwrap_or_default(),
        disks: decode_list(&text(13)?),
        bios_date_text: text(14)?,
        local_ip: text(15)?,
        mac_address: text(16)?,
        smart_status: SmartStatus::parse(&smart_text).unwrap_or_default(),
        smart_problem_details: decode_list(&text(18)?),
        smart_display_details: decode_list(&text(19)?),
    };

    let Some(category) = u8::try_from(category_raw).ok().and_then(Category::from_u8) else {
        return Ok(Err(FleetError::InvalidFieldValue {
            field: format!("category of {}", file_name),
            value: category_raw.to_string(),
        }));
    };

    Ok(Ok(ClassifiedRecord {
        facts,
        category,
        problems: text(21)?,
        recommendation: text(22)?,
        last_updated: last_updated
            .and_then(|t| DateTime::parse_from_rfc3339(&t).ok())
            .map(|t| t.with_timezone(&Utc)),
    }))
}
