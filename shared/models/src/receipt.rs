//! Results returned by write operations.

use serde::{Deserialize, Serialize};

use crate::bom::BomRecord;
use crate::measurement::ParaValue;

/// Where a newly appended row landed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InsertReceipt {
    pub id: i64,
    pub table: String,
    pub row: usize,
}

/// Outcome of add-if-not-exists on the BOM table.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct BomInsertOutcome {
    pub created: bool,
    pub existing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(flatten)]
    pub receipt: Option<InsertReceipt>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<BomRecord>,
}

impl BomInsertOutcome {
    pub fn created(receipt: InsertReceipt) -> Self {
        Self {
            created: true,
            existing: false,
            message: None,
            receipt: Some(receipt),
            data: None,
        }
    }

    pub fn existing(record: BomRecord) -> Self {
        Self {
            created: false,
            existing: true,
            message: Some("BOM relationship already exists".to_string()),
            receipt: None,
            data: Some(record),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateReceipt {
    pub id: i64,
    pub table: String,
    pub row: usize,
    pub updated: bool,
    pub serial_number: String,
    pub para_name: String,
    pub para_value: ParaValue,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteReceipt {
    pub id: i64,
    pub table: String,
    pub row: usize,
    pub deleted: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum UpsertAction {
    Updated,
    Inserted,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: i64,
    pub table: String,
    pub row: usize,
    pub action: UpsertAction,
}
