//! Row id assignment.
//!
//! Two policies are supported. `RowPosition` derives the id from the current
//! row count, so ids can repeat once rows are deleted. `Sequence` keeps a per-table high-water mark in the
//! `_sequences` sidecar table and never hands out the same id twice.

use serde::{Deserialize, Serialize};

use crate::row_store::{RowStore, StoreError, StoreResult};

pub const SEQUENCE_TABLE: &str = "_sequences";
pub const SEQUENCE_COLUMNS: [&str; 2] = ["table_name", "last_id"];

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IdPolicy {
    RowPosition,
    #[default]
    Sequence,
}

/// Id for the next row appended to `table`. The table must exist.
pub fn next_id(store: &mut dyn RowStore, table: &str, policy: IdPolicy) -> StoreResult<i64> {
    match policy {
        IdPolicy::RowPosition => Ok(row_position_id(store.last_row(table)?)),
        IdPolicy::Sequence => next_sequence_id(store, table),
    }
}

/// `last_row` counts the header, so a header-only table yields 1 and a table
/// with n data rows yields n + 1.
pub fn row_position_id(last_row: usize) -> i64 {
    if last_row <= 1 {
        1
    } else {
        last_row as i64
    }
}

/// Lenient id parse: sheets may hold ids as `7` or `7.0`.
pub fn parse_id(cell: &str) -> Option<i64> {
    let cell = cell.trim();
    cell.parse::<i64>().ok().or_else(|| {
        cell.parse::<f64>()
            .ok()
            .filter(|value| value.fract() == 0.0 && value.is_finite())
            .map(|value| value as i64)
    })
}

/// Largest id currently stored in `table`, 0 when there is none.
pub fn max_existing_id(store: &dyn RowStore, table: &str) -> StoreResult<i64> {
    let Some(sheet) = store.open_table(table)? else {
        return Ok(0);
    };
    let Some(column) = sheet.column("id") else {
        return Ok(0);
    };
    Ok(sheet
        .rows()
        .filter_map(|row| parse_id(row.cell(column)))
        .max()
        .unwrap_or(0)
        .max(0))
}

fn next_sequence_id(store: &mut dyn RowStore, table: &str) -> StoreResult<i64> {
    store.ensure_table(SEQUENCE_TABLE, &SEQUENCE_COLUMNS)?;
    let floor = max_existing_id(store, table)?;

    let sequences = store.read_all(SEQUENCE_TABLE)?;
    let entry = sequences.iter().enumerate().find(|(_, row)| {
        row.iter()
            .any(|(column, value)| column == "table_name" && value == table)
    });

    match entry {
        Some((offset, row)) => {
            let row_index = offset + 2;
            let last = row
                .iter()
                .find(|(column, _)| column == "last_id")
                .and_then(|(_, cell)| parse_id(cell))
                .ok_or_else(|| StoreError::Malformed {
                    table: SEQUENCE_TABLE.to_string(),
                    row: row_index,
                    message: format!("last_id for '{}' is not an integer", table),
                })?;
            let next = last.max(floor) + 1;
            store.update_cell(SEQUENCE_TABLE, row_index, 2, next.to_string())?;
            Ok(next)
        }
        None => {
            let next = floor + 1;
            store.append_row(
                SEQUENCE_TABLE,
                vec![table.to_string(), next.to_string()],
            )?;
            Ok(next)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    fn table_with_rows(ids: &[i64]) -> MemoryStore {
        let mut store = MemoryStore::new();
        store.create_table("t", &["id", "value"]).unwrap();
        for id in ids {
            store
                .append_row("t", vec![id.to_string(), String::new()])
                .unwrap();
        }
        store
    }

    #[test]
    fn test_row_position_formula() {
        assert_eq!(row_position_id(0), 1);
        assert_eq!(row_position_id(1), 1);
        assert_eq!(row_position_id(2), 2);
        assert_eq!(row_position_id(7), 7);
    }

    #[test]
    fn test_row_position_reuses_ids_after_delete() {
        let mut store = table_with_rows(&[1, 2, 3]);
        store.delete_row("t", 4).unwrap();

        // Three rows remain counting the header, so id 3 comes back.
        let id = next_id(&mut store, "t", IdPolicy::RowPosition).unwrap();
        assert_eq!(id, 3);
    }

    #[test]
    fn test_sequence_never_reuses_ids() {
        let mut store = table_with_rows(&[]);
        let first = next_id(&mut store, "t", IdPolicy::Sequence).unwrap();
        store.append_row("t", vec![first.to_string(), String::new()]).unwrap();
        let second = next_id(&mut store, "t", IdPolicy::Sequence).unwrap();
        store.append_row("t", vec![second.to_string(), String::new()]).unwrap();

        store.delete_row("t", 3).unwrap();
        let third = next_id(&mut store, "t", IdPolicy::Sequence).unwrap();

        assert_eq!((first, second, third), (1, 2, 3));
    }

    #[test]
    fn test_sequence_seeds_from_existing_rows() {
        let mut store = table_with_rows(&[4, 9, 2]);
        assert_eq!(next_id(&mut store, "t", IdPolicy::Sequence).unwrap(), 10);
        assert_eq!(next_id(&mut store, "t", IdPolicy::Sequence).unwrap(), 11);
    }

    #[test]
    fn test_parse_id_accepts_float_cells() {
        assert_eq!(parse_id(" 12 "), Some(12));
        assert_eq!(parse_id("12.0"), Some(12));
        assert_eq!(parse_id("12.5"), None);
        assert_eq!(parse_id("abc"), None);
    }

    #[test]
    fn test_malformed_sequence_row() {
        let mut store = table_with_rows(&[]);
        store.create_table(SEQUENCE_TABLE, &SEQUENCE_COLUMNS).unwrap();
        store
            .append_row(SEQUENCE_TABLE, vec!["t".into(), "many".into()])
            .unwrap();

        assert!(matches!(
            next_id(&mut store, "t", IdPolicy::Sequence),
            Err(StoreError::Malformed { .. })
        ));
    }
}
