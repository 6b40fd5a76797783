//! Repository module for sheet CRUD operations
//!
//! Typed repositories over the row store. Each repository is bound to one
//! table name supplied by configuration.

pub mod bom;
pub mod measurement;

pub use bom::BomRepository;
pub use measurement::MeasurementRepository;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::ids::parse_id;
use crate::row_store::{Sheet, SheetRow, StoreError, StoreResult};

pub(crate) fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_timestamp(sheet: &Sheet, row: &SheetRow<'_>, cell: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(cell.trim())
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|err| malformed(sheet, row, format!("created_at '{}': {}", cell, err)))
}

pub(crate) fn parse_row_id(sheet: &Sheet, row: &SheetRow<'_>, cell: &str) -> StoreResult<i64> {
    parse_id(cell).ok_or_else(|| malformed(sheet, row, format!("id '{}' is not an integer", cell)))
}

pub(crate) fn malformed(sheet: &Sheet, row: &SheetRow<'_>, message: String) -> StoreError {
    StoreError::Malformed {
        table: sheet.name().to_string(),
        row: row.index,
        message,
    }
}

/// Lay out named values in the table's own column order. Each field lists
/// the header names it may be stored under; unknown columns stay empty.
pub(crate) fn project_row(headers: &[String], fields: &[(&[&str], String)]) -> Vec<String> {
    headers
        .iter()
        .map(|header| {
            fields
                .iter()
                .find(|(names, _)| names.contains(&header.as_str()))
                .map(|(_, value)| value.clone())
                .unwrap_or_default()
        })
        .collect()
}
