//! In-process row store, used for ephemeral deployments and tests.

use std::collections::BTreeMap;

use crate::row_store::{grid, RowStore, StoreError, StoreResult};

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    tables: BTreeMap<String, Vec<Vec<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn rows_mut(&mut self, table: &str) -> StoreResult<&mut Vec<Vec<String>>> {
        self.tables
            .get_mut(table)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
    }
}

impl RowStore for MemoryStore {
    fn table_exists(&self, table: &str) -> StoreResult<bool> {
        Ok(self.tables.contains_key(table))
    }

    fn create_table(&mut self, table: &str, headers: &[&str]) -> StoreResult<()> {
        if self.tables.contains_key(table) {
            return Err(StoreError::TableExists(table.to_string()));
        }
        let header: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
        self.tables.insert(table.to_string(), vec![header]);
        Ok(())
    }

    fn read_values(&self, table: &str) -> StoreResult<Vec<Vec<String>>> {
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
    }

    fn append_row(&mut self, table: &str, values: Vec<String>) -> StoreResult<usize> {
        Ok(grid::append(self.rows_mut(table)?, values))
    }

    fn update_cell(
        &mut self,
        table: &str,
        row: usize,
        column: usize,
        value: String,
    ) -> StoreResult<()> {
        grid::update_cell(table, self.rows_mut(table)?, row, column, value)
    }

    fn delete_row(&mut self, table: &str, row: usize) -> StoreResult<()> {
        grid::delete_row(table, self.rows_mut(table)?, row)
    }

    fn last_row(&self, table: &str) -> StoreResult<usize> {
        self.tables
            .get(table)
            .map(Vec::len)
            .ok_or_else(|| StoreError::TableNotFound(table.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_append_and_read() {
        let mut store = MemoryStore::new();
        assert!(store.ensure_table("t", &["id", "name"]).unwrap());
        assert!(!store.ensure_table("t", &["id", "name"]).unwrap());

        let row = store
            .append_row("t", vec!["1".to_string(), "first".to_string()])
            .unwrap();
        assert_eq!(row, 2);
        assert_eq!(store.last_row("t").unwrap(), 2);

        let sheet = store.open_table("t").unwrap().unwrap();
        assert_eq!(sheet.headers(), ["id".to_string(), "name".to_string()]);
        assert_eq!(sheet.rows().next().unwrap().get("name"), Some("first"));

        let rows = store.read_all("t").unwrap();
        assert_eq!(
            rows,
            vec![vec![
                ("id".to_string(), "1".to_string()),
                ("name".to_string(), "first".to_string()),
            ]]
        );
        assert!(store.read_all("missing").unwrap().is_empty());
    }

    #[test]
    fn test_missing_table() {
        let mut store = MemoryStore::new();
        assert!(store.open_table("nope").unwrap().is_none());
        assert!(matches!(
            store.append_row("nope", vec![]),
            Err(StoreError::TableNotFound(_))
        ));
        assert!(matches!(
            store.create_table("t", &["id"]).and_then(|_| store.create_table("t", &["id"])),
            Err(StoreError::TableExists(_))
        ));
    }

    #[test]
    fn test_delete_shifts_rows_up() {
        let mut store = MemoryStore::new();
        store.create_table("t", &["id"]).unwrap();
        for id in 1..=3 {
            store.append_row("t", vec![id.to_string()]).unwrap();
        }

        store.delete_row("t", 2).unwrap();
        let values = store.read_values("t").unwrap();
        assert_eq!(values.len(), 3);
        assert_eq!(values[1], vec!["2".to_string()]);
    }
}
