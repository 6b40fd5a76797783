//! CSV workbook row store
//!
//! A directory of `<table>.csv` files standing in for the sheets of a
//! spreadsheet. Every mutation rewrites the file through a temporary file and
//! a rename, so a crash leaves either the old or the new table on disk.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::row_store::{grid, RowStore, StoreError, StoreResult};

static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);
const TEMP_PREFIX: &str = ".bomsheet.tmp.";

#[derive(Debug, Clone)]
pub struct CsvWorkbook {
    root: PathBuf,
}

impl CsvWorkbook {
    /// Open (and create if needed) the workbook directory.
    pub fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        tracing::info!(path = %root.display(), "Opened CSV workbook");
        Ok(Self { root })
    }

    fn table_path(&self, table: &str) -> StoreResult<PathBuf> {
        let valid = !table.is_empty()
            && !table.starts_with('.')
            && table
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidTableName(table.to_string()));
        }
        Ok(self.root.join(format!("{}.csv", table)))
    }

    fn load(&self, table: &str) -> StoreResult<Vec<Vec<String>>> {
        let path = self.table_path(table)?;
        if !path.exists() {
            return Err(StoreError::TableNotFound(table.to_string()));
        }

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&path)?;

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(rows)
    }

    fn save(&self, table: &str, rows: &[Vec<String>]) -> StoreResult<()> {
        let path = self.table_path(table)?;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_writer(Vec::new());
        for row in rows {
            writer.write_record(row)?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| StoreError::Io(err.into_error()))?;

        atomic_write(&self.root, &path, &bytes)?;
        Ok(())
    }

    fn modify<T>(
        &mut self,
        table: &str,
        edit: impl FnOnce(&mut Vec<Vec<String>>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let mut rows = self.load(table)?;
        let result = edit(&mut rows)?;
        self.save(table, &rows)?;
        Ok(result)
    }
}

impl RowStore for CsvWorkbook {
    fn table_exists(&self, table: &str) -> StoreResult<bool> {
        Ok(self.table_path(table)?.exists())
    }

    fn create_table(&mut self, table: &str, headers: &[&str]) -> StoreResult<()> {
        if self.table_exists(table)? {
            return Err(StoreError::TableExists(table.to_string()));
        }
        let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        self.save(table, &[header])
    }

    fn read_values(&self, table: &str) -> StoreResult<Vec<Vec<String>>> {
        self.load(table)
    }

    fn append_row(&mut self, table: &str, values: Vec<String>) -> StoreResult<usize> {
        self.modify(table, |rows| Ok(grid::append(rows, values)))
    }

    fn update_cell(
        &mut self,
        table: &str,
        row: usize,
        column: usize,
        value: String,
    ) -> StoreResult<()> {
        self.modify(table, |rows| grid::update_cell(table, rows, row, column, value))
    }

    fn delete_row(&mut self, table: &str, row: usize) -> StoreResult<()> {
        self.modify(table, |rows| grid::delete_row(table, rows, row))
    }
}

fn atomic_write(dir: &Path, path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp_path = dir.join(format!(
        "{}{}.{}",
        TEMP_PREFIX,
        std::process::id(),
        TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));

    let write_result = (|| -> io::Result<()> {
        let mut tmp_file: File = OpenOptions::new()
            .create_new(true)
            .write(true)
            .open(&tmp_path)?;
        tmp_file.write_all(bytes)?;
        tmp_file.sync_all()?;
        drop(tmp_file);
        fs::rename(&tmp_path, path)
    })();

    if write_result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }
    write_result
}
