//! Row Store Adapter
//!
//! The narrow, spreadsheet-shaped interface the repositories are written
//! against. A table is a grid of text cells whose first row holds the column
//! names. Row and column indices are 1-based, matching spreadsheet
//! addressing, and row 1 is reserved for the header.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("table '{0}' not found")]
    TableNotFound(String),

    #[error("table '{0}' already exists")]
    TableExists(String),

    #[error("invalid table name '{0}'")]
    InvalidTableName(String),

    #[error("table '{table}' has no '{column}' column")]
    MissingColumn { table: String, column: String },

    #[error("row {row} is out of range for table '{table}'")]
    RowOutOfRange { table: String, row: usize },

    #[error("column {column} is out of range for table '{table}'")]
    ColumnOutOfRange { table: String, column: usize },

    #[error("row {row} of table '{table}' is malformed: {message}")]
    Malformed {
        table: String,
        row: usize,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("store task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Store handle shared by the repositories. Holding the lock for the length
/// of one repository call makes read-then-write sequences atomic.
pub type SharedStore = Arc<Mutex<Box<dyn RowStore>>>;

pub fn shared(store: impl RowStore + 'static) -> SharedStore {
    Arc::new(Mutex::new(Box::new(store)))
}

/// Run `operation` against the locked store on the blocking pool, since
/// file-backed stores do synchronous I/O. The lock is held until it returns.
pub async fn with_store<T, F>(store: &SharedStore, operation: F) -> StoreResult<T>
where
    T: Send + 'static,
    F: FnOnce(&mut dyn RowStore) -> StoreResult<T> + Send + 'static,
{
    let mut guard = Arc::clone(store).lock_owned().await;
    tokio::task::spawn_blocking(move || operation(&mut **guard)).await?
}

pub trait RowStore: Send {
    fn table_exists(&self, table: &str) -> StoreResult<bool>;

    /// Create a table whose first row is `headers`.
    fn create_table(&mut self, table: &str, headers: &[&str]) -> StoreResult<()>;

    /// Every row of the table, header included.
    fn read_values(&self, table: &str) -> StoreResult<Vec<Vec<String>>>;

    /// Append a row and return its 1-based index.
    fn append_row(&mut self, table: &str, values: Vec<String>) -> StoreResult<usize>;

    fn update_cell(
        &mut self,
        table: &str,
        row: usize,
        column: usize,
        value: String,
    ) -> StoreResult<()>;

    fn delete_row(&mut self, table: &str, row: usize) -> StoreResult<()>;

    /// Snapshot of the table, or `None` when it does not exist.
    fn open_table(&self, table: &str) -> StoreResult<Option<Sheet>> {
        if !self.table_exists(table)? {
            return Ok(None);
        }
        Ok(Some(Sheet::new(table, self.read_values(table)?)))
    }

    /// Data rows as ordered `(column, value)` pairs. Missing tables read as empty.
    fn read_all(&self, table: &str) -> StoreResult<Vec<Vec<(String, String)>>> {
        let Some(sheet) = self.open_table(table)? else {
            return Ok(Vec::new());
        };
        Ok(sheet
            .rows()
            .map(|row| {
                row.iter()
                    .map(|(column, value)| (column.to_string(), value.to_string()))
                    .collect()
            })
            .collect())
    }

    /// Index of the last populated row; 1 for a header-only table.
    fn last_row(&self, table: &str) -> StoreResult<usize> {
        Ok(self.read_values(table)?.len())
    }

    /// Create the table unless it exists. Returns whether it was created.
    fn ensure_table(&mut self, table: &str, headers: &[&str]) -> StoreResult<bool> {
        if self.table_exists(table)? {
            return Ok(false);
        }
        self.create_table(table, headers)?;
        tracing::info!(table, "Created table");
        Ok(true)
    }
}

/// Read-only snapshot of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Sheet {
    name: String,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, mut values: Vec<Vec<String>>) -> Self {
        let headers = if values.is_empty() {
            Vec::new()
        } else {
            values.remove(0)
        };
        Self {
            name: name.into(),
            headers,
            rows: values,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// 0-based position of the first header matching any of `names`.
    pub fn column_any(&self, names: &[&str]) -> Option<usize> {
        names
            .iter()
            .find_map(|name| self.headers.iter().position(|header| header == name))
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.column_any(&[name])
    }

    pub fn require_column(&self, names: &[&str]) -> StoreResult<usize> {
        self.column_any(names).ok_or_else(|| StoreError::MissingColumn {
            table: self.name.clone(),
            column: names.first().copied().unwrap_or_default().to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Data rows in storage order.
    pub fn rows(&self) -> impl Iterator<Item = SheetRow<'_>> {
        self.rows.iter().enumerate().map(move |(offset, values)| SheetRow {
            index: offset + 2,
            headers: &self.headers,
            values,
        })
    }
}

/// One data row viewed as an ordered column-name to value mapping.
#[derive(Debug, Clone, Copy)]
pub struct SheetRow<'a> {
    /// 1-based sheet row, so the first data row is 2.
    pub index: usize,
    headers: &'a [String],
    values: &'a [String],
}

impl<'a> SheetRow<'a> {
    /// Cell at a 0-based column; short rows read as empty cells.
    pub fn cell(&self, column: usize) -> &'a str {
        self.values.get(column).map(String::as_str).unwrap_or("")
    }

    /// Spreadsheets keep emptied rows around; they carry no record.
    pub fn is_blank(&self) -> bool {
        self.values.iter().all(|value| value.trim().is_empty())
    }

    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.headers
            .iter()
            .position(|header| header == name)
            .map(|column| self.cell(column))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        let headers = self.headers;
        let values = self.values;
        headers
            .iter()
            .enumerate()
            .map(move |(column, header)| {
                (
                    header.as_str(),
                    values.get(column).map(String::as_str).unwrap_or(""),
                )
            })
    }
}

/// Grid edits shared by every backend.
pub(crate) mod grid {
    use super::{StoreError, StoreResult};

    pub fn append(rows: &mut Vec<Vec<String>>, values: Vec<String>) -> usize {
        rows.push(values);
        rows.len()
    }

    pub fn update_cell(
        table: &str,
        rows: &mut [Vec<String>],
        row: usize,
        column: usize,
        value: String,
    ) -> StoreResult<()> {
        if row < 2 || row > rows.len() {
            return Err(StoreError::RowOutOfRange {
                table: table.to_string(),
                row,
            });
        }
        if column == 0 {
            return Err(StoreError::ColumnOutOfRange {
                table: table.to_string(),
                column,
            });
        }

        let cells = &mut rows[row - 1];
        if cells.len() < column {
            cells.resize(column, String::new());
        }
        cells[column - 1] = value;
        Ok(())
    }

    pub fn delete_row(table: &str, rows: &mut Vec<Vec<String>>, row: usize) -> StoreResult<()> {
        if row < 2 || row > rows.len() {
            return Err(StoreError::RowOutOfRange {
                table: table.to_string(),
                row,
            });
        }
        rows.remove(row - 1);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Sheet {
        Sheet::new(
            "bom",
            vec![
                vec!["id".into(), "part_no".into(), "assembly_serial_number".into()],
                vec!["1".into(), "A".into()],
                vec!["2".into(), "B".into(), "S1".into()],
            ],
        )
    }

    #[test]
    fn test_sheet_rows_are_one_based_after_header() {
        let sheet = sample();
        let indices: Vec<usize> = sheet.rows().map(|row| row.index).collect();
        assert_eq!(indices, vec![2, 3]);
        assert_eq!(sheet.len(), 2);
    }

    #[test]
    fn test_short_rows_read_as_empty_cells() {
        let sheet = sample();
        let first = sheet.rows().next().unwrap();
        assert_eq!(first.get("assembly_serial_number"), Some(""));
        assert_eq!(first.get("missing"), None);

        let pairs: Vec<(&str, &str)> = first.iter().collect();
        assert_eq!(
            pairs,
            vec![("id", "1"), ("part_no", "A"), ("assembly_serial_number", "")]
        );
    }

    #[test]
    fn test_column_aliases() {
        let sheet = sample();
        assert_eq!(
            sheet.column_any(&["sub_assembly_serial_number", "assembly_serial_number"]),
            Some(2)
        );
        assert!(matches!(
            sheet.require_column(&["created_at"]),
            Err(StoreError::MissingColumn { .. })
        ));
    }

    #[test]
    fn test_grid_protects_header_row() {
        let mut rows = vec![vec!["id".to_string()], vec!["1".to_string()]];
        assert!(grid::delete_row("t", &mut rows, 1).is_err());
        assert!(grid::update_cell("t", &mut rows, 1, 1, "x".into()).is_err());
        assert!(grid::delete_row("t", &mut rows, 3).is_err());

        grid::update_cell("t", &mut rows, 2, 3, "z".into()).unwrap();
        assert_eq!(rows[1], vec!["1".to_string(), String::new(), "z".to_string()]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_with_store_serialises_blocking_writers() {
        let dir = tempfile::tempdir().unwrap();
        let store = shared(crate::csv_workbook::CsvWorkbook::open(dir.path()).unwrap());
        with_store(&store, |store| store.create_table("t", &["id"]))
            .await
            .unwrap();

        let writers: Vec<_> = (0..16)
            .map(|id| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    with_store(&store, move |store| {
                        store.append_row("t", vec![id.to_string()])
                    })
                    .await
                })
            })
            .collect();
        for writer in writers {
            writer.await.unwrap().unwrap();
        }

        let rows = with_store(&store, |store| store.read_values("t")).await.unwrap();
        assert_eq!(rows.len(), 17);
    }
}
