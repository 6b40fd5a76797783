//! BOM Repository
//!
//! CRUD operations for BOM relationship rows.

use anyhow::{Context, Result};
use chrono::Utc;

use bomsheet_models::{
    BomInsertOutcome, BomRecord, InsertReceipt, NewBomRecord, BOM_COLUMNS, LEGACY_ASSEMBLY_COLUMN,
};

use super::{format_timestamp, parse_row_id, parse_timestamp, project_row};
use crate::ids::{next_id, IdPolicy};
use crate::row_store::{with_store, RowStore, SharedStore, StoreResult};

const ID: &[&str] = &["id"];
const PART_NO: &[&str] = &["part_no"];
const SERIAL_NUMBER: &[&str] = &["serial_number"];
const ASSEMBLY_LINK: &[&str] = &["sub_assembly_serial_number", LEGACY_ASSEMBLY_COLUMN];
const CREATED_AT: &[&str] = &["created_at"];

#[derive(Clone)]
pub struct BomRepository {
    store: SharedStore,
    table: String,
    id_policy: IdPolicy,
}

impl BomRepository {
    pub fn new(store: SharedStore, table: impl Into<String>, id_policy: IdPolicy) -> Self {
        Self {
            store,
            table: table.into(),
            id_policy,
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Create the sheet with its header row unless it already exists.
    pub async fn initialize(&self) -> Result<bool> {
        let table = self.table.clone();
        with_store(&self.store, move |store| store.ensure_table(&table, &BOM_COLUMNS))
            .await
            .with_context(|| format!("Unable to initialize BOM sheet '{}'", self.table))
    }

    /// Append a relationship row unconditionally
    pub async fn add(&self, record: NewBomRecord) -> Result<InsertReceipt> {
        let repo = self.clone();
        let payload = record.clone();
        let receipt = with_store(&self.store, move |store| repo.insert(store, &payload))
            .await
            .context("Unable to add BOM data")?;

        tracing::info!(
            id = receipt.id,
            row = receipt.row,
            part_no = %record.part_no,
            serial_number = %record.serial_number,
            "Added BOM record"
        );
        Ok(receipt)
    }

    /// Append a relationship row unless the same
    /// `(part_no, serial_number, sub_assembly_serial_number)` triple is stored.
    /// The first matching row is returned untouched.
    pub async fn add_if_not_exists(&self, record: NewBomRecord) -> Result<BomInsertOutcome> {
        let repo = self.clone();
        let outcome = with_store(&self.store, move |store| {
            let existing = repo
                .load(store)?
                .into_iter()
                .find(|stored| stored.same_relationship(&record));
            match existing {
                Some(existing) => Ok(BomInsertOutcome::existing(existing)),
                None => repo.insert(store, &record).map(BomInsertOutcome::created),
            }
        })
        .await
        .context("Unable to add BOM data")?;

        match (&outcome.receipt, &outcome.data) {
            (Some(receipt), _) => {
                tracing::info!(id = receipt.id, row = receipt.row, "Added BOM record")
            }
            (None, Some(existing)) => {
                tracing::debug!(id = existing.id, "BOM relationship already exists")
            }
            (None, None) => {}
        }
        Ok(outcome)
    }

    /// All relationship rows in storage order
    pub async fn find_all(&self) -> Result<Vec<BomRecord>> {
        let repo = self.clone();
        with_store(&self.store, move |store| repo.load(store))
            .await
            .context("Unable to retrieve BOM data")
    }

    fn insert(&self, store: &mut dyn RowStore, record: &NewBomRecord) -> StoreResult<InsertReceipt> {
        store.ensure_table(&self.table, &BOM_COLUMNS)?;
        let headers = match store.open_table(&self.table)? {
            Some(sheet) if !sheet.headers().is_empty() => sheet.headers().to_vec(),
            _ => BOM_COLUMNS.iter().map(|h| h.to_string()).collect(),
        };

        let id = next_id(store, &self.table, self.id_policy)?;
        let created_at = record.created_at.unwrap_or_else(Utc::now);
        let values = project_row(
            &headers,
            &[
                (ID, id.to_string()),
                (PART_NO, record.part_no.clone()),
                (SERIAL_NUMBER, record.serial_number.clone()),
                (ASSEMBLY_LINK, record.assembly_link().to_string()),
                (CREATED_AT, format_timestamp(created_at)),
            ],
        );

        let row = store.append_row(&self.table, values)?;
        Ok(InsertReceipt {
            id,
            table: self.table.clone(),
            row,
        })
    }

    fn load(&self, store: &dyn RowStore) -> StoreResult<Vec<BomRecord>> {
        let Some(sheet) = store.open_table(&self.table)? else {
            return Ok(Vec::new());
        };
        if sheet.is_empty() {
            return Ok(Vec::new());
        }

        let id = sheet.require_column(ID)?;
        let part_no = sheet.require_column(PART_NO)?;
        let serial_number = sheet.require_column(SERIAL_NUMBER)?;
        let link = sheet.column_any(ASSEMBLY_LINK);
        let created_at = sheet.require_column(CREATED_AT)?;

        sheet
            .rows()
            .filter(|row| !row.is_blank())
            .map(|row| -> StoreResult<BomRecord> {
                Ok(BomRecord {
                    id: parse_row_id(&sheet, &row, row.cell(id))?,
                    part_no: row.cell(part_no).to_string(),
                    serial_number: row.cell(serial_number).to_string(),
                    sub_assembly_serial_number: link
                        .map(|column| row.cell(column).to_string())
                        .unwrap_or_default(),
                    created_at: parse_timestamp(&sheet, &row, row.cell(created_at))?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::row_store::shared;

    fn repository(policy: IdPolicy) -> BomRepository {
        BomRepository::new(shared(MemoryStore::new()), "bom", policy)
    }

    #[tokio::test]
    async fn test_add_assigns_sequential_ids() {
        let repo = repository(IdPolicy::RowPosition);

        let first = repo.add(NewBomRecord::new("CASE", "C-1")).await.unwrap();
        let second = repo
            .add(NewBomRecord::new("PCB", "P-1").with_assembly("C-1"))
            .await
            .unwrap();

        assert_eq!((first.id, first.row), (1, 2));
        assert_eq!((second.id, second.row), (2, 3));
        assert_eq!(first.table, "bom");

        let records = repo.find_all().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].sub_assembly_serial_number, "C-1");
        assert!(!records[0].has_assembly_link());
    }

    #[tokio::test]
    async fn test_find_all_on_missing_sheet_is_empty() {
        let repo = repository(IdPolicy::Sequence);
        assert!(repo.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_if_not_exists_returns_first_match() {
        let repo = repository(IdPolicy::Sequence);
        let record = NewBomRecord::new("PCB", "P-1").with_assembly("C-1");

        let created = repo.add_if_not_exists(record.clone()).await.unwrap();
        assert!(created.created);
        assert_eq!(created.receipt.as_ref().map(|r| r.id), Some(1));

        let again = repo.add_if_not_exists(record).await.unwrap();
        assert!(!again.created);
        assert!(again.existing);
        assert_eq!(again.data.as_ref().map(|r| r.id), Some(1));
        assert_eq!(repo.find_all().await.unwrap().len(), 1);

        // A different link is a different relationship.
        let other = repo
            .add_if_not_exists(NewBomRecord::new("PCB", "P-1"))
            .await
            .unwrap();
        assert!(other.created);
    }

    #[tokio::test]
    async fn test_reads_legacy_assembly_header() {
        let mut store = MemoryStore::new();
        store
            .create_table(
                "bom",
                &["id", "part_no", "serial_number", "assembly_serial_number", "created_at"],
            )
            .unwrap();
        let repo = BomRepository::new(shared(store), "bom", IdPolicy::Sequence);

        repo.add(NewBomRecord::new("PCB", "P-1").with_assembly("C-1"))
            .await
            .unwrap();

        let records = repo.find_all().await.unwrap();
        assert_eq!(records[0].sub_assembly_serial_number, "C-1");
    }

    #[tokio::test]
    async fn test_malformed_id_is_a_storage_error() {
        let mut store = MemoryStore::new();
        store.create_table("bom", &BOM_COLUMNS).unwrap();
        store
            .append_row(
                "bom",
                vec![
                    "x".into(),
                    "A".into(),
                    "S1".into(),
                    String::new(),
                    "2024-01-01T00:00:00.000Z".into(),
                ],
            )
            .unwrap();
        let repo = BomRepository::new(shared(store), "bom", IdPolicy::Sequence);

        let err = repo.find_all().await.unwrap_err();
        assert!(format!("{:#}", err).contains("Unable to retrieve BOM data"));
    }
}
