//! Measurement Repository
//!
//! CRUD operations for measurement rows, plus upsert keyed on
//! `(serial_number, para_name)`.

use anyhow::{Context, Result};
use chrono::Utc;
use std::collections::BTreeSet;

use bomsheet_models::{
    DeleteReceipt, InsertReceipt, MeasurementFilter, MeasurementRecord, MeasurementUpdate,
    NewMeasurement, ParaValue, UpdateReceipt, UpsertAction, UpsertOutcome, MEASUREMENT_COLUMNS,
};

use super::{format_timestamp, parse_row_id, parse_timestamp, project_row};
use crate::ids::{next_id, IdPolicy};
use crate::row_store::{with_store, RowStore, SharedStore, Sheet, StoreResult};

const ID: &[&str] = &["id"];
const SERIAL_NUMBER: &[&str] = &["serial_number"];
const PARA_NAME: &[&str] = &["para_name"];
const PARA_VALUE: &[&str] = &["para_value"];
const CREATED_AT: &[&str] = &["created_at"];

/// A parsed record together with its 1-based sheet row.
type Located = (usize, MeasurementRecord);

#[derive(Clone)]
pub struct MeasurementRepository {
    store: SharedStore,
    table: String,
    id_policy: IdPolicy,
}

impl MeasurementRepository {
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
        with_store(&self.store, move |store| {
            store.ensure_table(&table, &MEASUREMENT_COLUMNS)
        })
        .await
        .with_context(|| format!("Unable to initialize measurements sheet '{}'", self.table))
    }

    pub async fn add(&self, measurement: NewMeasurement) -> Result<InsertReceipt> {
        let repo = self.clone();
        let payload = measurement.clone();
        let receipt = with_store(&self.store, move |store| repo.insert(store, &payload))
            .await
            .context("Unable to add measurements data")?;

        tracing::info!(
            id = receipt.id,
            row = receipt.row,
            serial_number = %measurement.serial_number,
            para_name = %measurement.para_name,
            "Added measurement"
        );
        Ok(receipt)
    }

    /// Measurements in storage order, optionally restricted to one serial number
    pub async fn find_all(&self, filter: &MeasurementFilter) -> Result<Vec<MeasurementRecord>> {
        let records = self
            .snapshot()
            .await
            .context("Unable to retrieve measurements data")?;

        Ok(records
            .into_iter()
            .map(|(_, record)| record)
            .filter(|record| filter.accepts(record))
            .collect())
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<MeasurementRecord>> {
        let records = self
            .snapshot()
            .await
            .context("Unable to retrieve measurements data")?;

        Ok(records
            .into_iter()
            .map(|(_, record)| record)
            .find(|record| record.id == id))
    }

    /// Overwrite the fields present in `update` on the first row with its id.
    /// `created_at` is reset to now. Returns `None` when no row has the id.
    pub async fn update(&self, update: MeasurementUpdate) -> Result<Option<UpdateReceipt>> {
        let repo = self.clone();
        let id = update.id.get();
        let receipt = with_store(&self.store, move |store| repo.apply_update(store, update))
            .await
            .context("Unable to update measurement data")?;

        match &receipt {
            Some(receipt) => tracing::info!(id, row = receipt.row, "Updated measurement"),
            None => tracing::debug!(id, "Measurement to update not found"),
        }
        Ok(receipt)
    }

    /// Remove the first row with `id`. Returns `None` when no row has the id.
    pub async fn delete(&self, id: i64) -> Result<Option<DeleteReceipt>> {
        let repo = self.clone();
        let receipt = with_store(&self.store, move |store| {
            let located = repo
                .load(store)?
                .into_iter()
                .find(|(_, record)| record.id == id);
            let Some((row, _)) = located else {
                return Ok(None);
            };

            store.delete_row(&repo.table, row)?;
            Ok(Some(DeleteReceipt {
                id,
                table: repo.table.clone(),
                row,
                deleted: true,
            }))
        })
        .await
        .context("Unable to delete measurement data")?;

        match &receipt {
            Some(receipt) => tracing::info!(id, row = receipt.row, "Deleted measurement"),
            None => tracing::debug!(id, "Measurement to delete not found"),
        }
        Ok(receipt)
    }

    /// Update the first row whose `(serial_number, para_name)` equals the
    /// input exactly, or append a new row when none does.
    pub async fn upsert(&self, measurement: NewMeasurement) -> Result<UpsertOutcome> {
        let repo = self.clone();
        let payload = measurement.clone();
        let outcome = with_store(&self.store, move |store| repo.apply_upsert(store, &payload))
            .await
            .context("Unable to upsert measurement data")?;

        tracing::info!(
            id = outcome.id,
            row = outcome.row,
            action = ?outcome.action,
            serial_number = %measurement.serial_number,
            para_name = %measurement.para_name,
            "Upserted measurement"
        );
        Ok(outcome)
    }

    /// Distinct serial numbers with measurements, sorted lexicographically
    pub async fn serial_numbers(&self) -> Result<Vec<String>> {
        let records = self
            .snapshot()
            .await
            .context("Unable to retrieve serial numbers")?;

        let distinct: BTreeSet<String> = records
            .into_iter()
            .map(|(_, record)| record.serial_number)
            .filter(|serial| !serial.is_empty())
            .collect();
        Ok(distinct.into_iter().collect())
    }

    async fn snapshot(&self) -> StoreResult<Vec<Located>> {
        let repo = self.clone();
        with_store(&self.store, move |store| repo.load(store)).await
    }

    fn insert(
        &self,
        store: &mut dyn RowStore,
        measurement: &NewMeasurement,
    ) -> StoreResult<InsertReceipt> {
        store.ensure_table(&self.table, &MEASUREMENT_COLUMNS)?;
        let headers = match store.open_table(&self.table)? {
            Some(sheet) if !sheet.headers().is_empty() => sheet.headers().to_vec(),
            _ => MEASUREMENT_COLUMNS.iter().map(|h| h.to_string()).collect(),
        };

        let id = next_id(store, &self.table, self.id_policy)?;
        let created_at = measurement.created_at.unwrap_or_else(Utc::now);
        let values = project_row(
            &headers,
            &[
                (ID, id.to_string()),
                (SERIAL_NUMBER, measurement.serial_number.clone()),
                (PARA_NAME, measurement.para_name.clone()),
                (PARA_VALUE, measurement.para_value.to_cell()),
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

    fn apply_update(
        &self,
        store: &mut dyn RowStore,
        update: MeasurementUpdate,
    ) -> StoreResult<Option<UpdateReceipt>> {
        let Some(sheet) = store.open_table(&self.table)? else {
            return Ok(None);
        };
        let id = update.id.get();
        let Some((row, current)) = parse_rows(&sheet)?
            .into_iter()
            .find(|(_, record)| record.id == id)
        else {
            return Ok(None);
        };

        let serial_number = update.serial_number.unwrap_or(current.serial_number);
        let para_name = update.para_name.unwrap_or(current.para_name);
        let para_value = update.para_value.unwrap_or(current.para_value);

        let cells = [
            (SERIAL_NUMBER, serial_number.clone()),
            (PARA_NAME, para_name.clone()),
            (PARA_VALUE, para_value.to_cell()),
            (CREATED_AT, format_timestamp(Utc::now())),
        ];
        for (names, value) in cells {
            let column = sheet.require_column(names)?;
            store.update_cell(&self.table, row, column + 1, value)?;
        }

        Ok(Some(UpdateReceipt {
            id,
            table: self.table.clone(),
            row,
            updated: true,
            serial_number,
            para_name,
            para_value,
        }))
    }

    fn apply_upsert(
        &self,
        store: &mut dyn RowStore,
        measurement: &NewMeasurement,
    ) -> StoreResult<UpsertOutcome> {
        store.ensure_table(&self.table, &MEASUREMENT_COLUMNS)?;

        if let Some(sheet) = store.open_table(&self.table)? {
            let existing = parse_rows(&sheet)?.into_iter().find(|(_, record)| {
                record.matches_key(&measurement.serial_number, &measurement.para_name)
            });

            if let Some((row, record)) = existing {
                let created_at = measurement.created_at.unwrap_or_else(Utc::now);
                let value_column = sheet.require_column(PARA_VALUE)?;
                let created_column = sheet.require_column(CREATED_AT)?;
                store.update_cell(
                    &self.table,
                    row,
                    value_column + 1,
                    measurement.para_value.to_cell(),
                )?;
                store.update_cell(
                    &self.table,
                    row,
                    created_column + 1,
                    format_timestamp(created_at),
                )?;

                return Ok(UpsertOutcome {
                    id: record.id,
                    table: self.table.clone(),
                    row,
                    action: UpsertAction::Updated,
                });
            }
        }

        let receipt = self.insert(store, measurement)?;
        Ok(UpsertOutcome {
            id: receipt.id,
            table: receipt.table,
            row: receipt.row,
            action: UpsertAction::Inserted,
        })
    }

    fn load(&self, store: &dyn RowStore) -> StoreResult<Vec<Located>> {
        match store.open_table(&self.table)? {
            Some(sheet) => parse_rows(&sheet),
            None => Ok(Vec::new()),
        }
    }
}

fn parse_rows(sheet: &Sheet) -> StoreResult<Vec<Located>> {
    if sheet.is_empty() {
        return Ok(Vec::new());
    }

    let id = sheet.require_column(ID)?;
    let serial_number = sheet.require_column(SERIAL_NUMBER)?;
    let para_name = sheet.require_column(PARA_NAME)?;
    let para_value = sheet.require_column(PARA_VALUE)?;
    let created_at = sheet.require_column(CREATED_AT)?;

    sheet
        .rows()
        .filter(|row| !row.is_blank())
        .map(|row| -> StoreResult<Located> {
            let record = MeasurementRecord {
                id: parse_row_id(sheet, &row, row.cell(id))?,
                serial_number: row.cell(serial_number).to_string(),
                para_name: row.cell(para_name).to_string(),
                para_value: ParaValue::from_cell(row.cell(para_value)),
                created_at: parse_timestamp(sheet, &row, row.cell(created_at))?,
            };
            Ok((row.index, record))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::row_store::shared;
    use bomsheet_models::RecordId;

    fn repository() -> MeasurementRepository {
        MeasurementRepository::new(shared(MemoryStore::new()), "measurements", IdPolicy::Sequence)
    }

    #[tokio::test]
    async fn test_add_and_filter_by_serial_number() {
        let repo = repository();
        repo.add(NewMeasurement::new("SN-1", "Voltage", 3.3)).await.unwrap();
        repo.add(NewMeasurement::new("SN-2", "Voltage", 5)).await.unwrap();
        repo.add(NewMeasurement::new("SN-1", "Current", 0.5)).await.unwrap();

        let all = repo.find_all(&MeasurementFilter::default()).await.unwrap();
        assert_eq!(all.len(), 3);

        let filter = MeasurementFilter {
            serial_number: Some("SN-1".to_string()),
        };
        let sn1 = repo.find_all(&filter).await.unwrap();
        let names: Vec<&str> = sn1.iter().map(|m| m.para_name.as_str()).collect();
        assert_eq!(names, vec!["Voltage", "Current"]);
        assert_eq!(sn1[0].para_value, ParaValue::from(3.3));
    }

    #[tokio::test]
    async fn test_upsert_updates_first_match_in_place() {
        let repo = repository();

        let inserted = repo
            .upsert(NewMeasurement::new("SN-1", "Voltage", 3.3))
            .await
            .unwrap();
        assert_eq!(inserted.action, UpsertAction::Inserted);

        let updated = repo
            .upsert(NewMeasurement::new("SN-1", "Voltage", 3.1))
            .await
            .unwrap();
        assert_eq!(updated.action, UpsertAction::Updated);
        assert_eq!(updated.id, inserted.id);
        assert_eq!(updated.row, inserted.row);

        let all = repo.find_all(&MeasurementFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].para_value, ParaValue::from(3.1));
        assert_eq!(all[0].serial_number, "SN-1");
    }

    #[tokio::test]
    async fn test_upsert_key_is_case_sensitive() {
        let repo = repository();
        repo.upsert(NewMeasurement::new("SN-1", "Voltage", 1)).await.unwrap();
        let outcome = repo
            .upsert(NewMeasurement::new("SN-1", "voltage", 2))
            .await
            .unwrap();

        assert_eq!(outcome.action, UpsertAction::Inserted);
        assert_eq!(repo.find_all(&MeasurementFilter::default()).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_only_touches_first_duplicate() {
        let repo = repository();
        repo.add(NewMeasurement::new("SN-1", "Voltage", 1)).await.unwrap();
        repo.add(NewMeasurement::new("SN-1", "Voltage", 2)).await.unwrap();

        let outcome = repo
            .upsert(NewMeasurement::new("SN-1", "Voltage", 9))
            .await
            .unwrap();
        assert_eq!(outcome.id, 1);

        let values: Vec<ParaValue> = repo
            .find_all(&MeasurementFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.para_value)
            .collect();
        assert_eq!(values, vec![ParaValue::from(9), ParaValue::from(2)]);
    }

    #[tokio::test]
    async fn test_update_keeps_omitted_fields() {
        let repo = repository();
        let receipt = repo
            .add(NewMeasurement::new("SN-1", "Voltage", 3.3))
            .await
            .unwrap();

        let updated = repo
            .update(MeasurementUpdate {
                id: RecordId(receipt.id),
                serial_number: None,
                para_name: None,
                para_value: Some(ParaValue::from(4.2)),
            })
            .await
            .unwrap()
            .expect("row exists");

        assert!(updated.updated);
        assert_eq!(updated.serial_number, "SN-1");
        assert_eq!(updated.para_name, "Voltage");

        let stored = repo.find_by_id(receipt.id).await.unwrap().unwrap();
        assert_eq!(stored.para_value, ParaValue::from(4.2));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_id() {
        let repo = repository();
        repo.add(NewMeasurement::new("SN-1", "Voltage", 1)).await.unwrap();

        let update = MeasurementUpdate {
            id: RecordId(42),
            serial_number: None,
            para_name: Some("X".to_string()),
            para_value: None,
        };
        assert!(repo.update(update).await.unwrap().is_none());
        assert!(repo.delete(42).await.unwrap().is_none());

        let all = repo.find_all(&MeasurementFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].para_name, "Voltage");
    }

    #[tokio::test]
    async fn test_delete_removes_row() {
        let repo = repository();
        repo.add(NewMeasurement::new("SN-1", "A", 1)).await.unwrap();
        let second = repo.add(NewMeasurement::new("SN-1", "B", 2)).await.unwrap();

        let receipt = repo.delete(second.id).await.unwrap().unwrap();
        assert_eq!(receipt.row, 3);
        assert!(receipt.deleted);
        assert!(repo.find_by_id(second.id).await.unwrap().is_none());

        let next = repo.add(NewMeasurement::new("SN-1", "C", 3)).await.unwrap();
        assert_eq!(next.id, 3);
    }

    #[tokio::test]
    async fn test_serial_numbers_sorted_and_distinct() {
        let repo = repository();
        for (serial, name) in [("SN-2", "A"), ("SN-1", "A"), ("SN-2", "B"), ("SN-10", "A")] {
            repo.add(NewMeasurement::new(serial, name, 1)).await.unwrap();
        }

        assert_eq!(
            repo.serial_numbers().await.unwrap(),
            vec!["SN-1", "SN-10", "SN-2"]
        );
    }
}
