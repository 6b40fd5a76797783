//! Request Router
//!
//! Turns an `{action, table, data}` request into one typed [`Operation`] and
//! runs it against the repositories. Every shape check happens before any
//! storage is touched.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use bomsheet_models::{
    ApiRequest, MeasurementFilter, MeasurementUpdate, NewBomRecord, NewMeasurement, RecordId,
};
use bomsheet_utils::{build_tree, parse_payload, BomsheetError, BomsheetResult};

use crate::state::AppState;

const MISSING_TABLE_OR_DATA: &str = "Missing table or data parameter";
const MISSING_ID: &str = "Missing table, data, or id parameter";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Add,
    AddBomIfNotExists,
    Get,
    Update,
    Delete,
    Upsert,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::AddBomIfNotExists => "add_bom_if_not_exists",
            Self::Get => "get",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Upsert => "upsert",
        }
    }
}

impl FromStr for Action {
    type Err = BomsheetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "add" => Ok(Self::Add),
            "add_bom_if_not_exists" => Ok(Self::AddBomIfNotExists),
            "get" => Ok(Self::Get),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "upsert" => Ok(Self::Upsert),
            other => Err(BomsheetError::validation(
                "action",
                format!("Invalid action: {}", other),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Table {
    Bom,
    Measurements,
    BomTree,
    SerialNumbers,
}

impl Table {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bom => "bom",
            Self::Measurements => "measurements",
            Self::BomTree => "bom_tree",
            Self::SerialNumbers => "serial_numbers",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Table {
    type Err = BomsheetError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "bom" => Ok(Self::Bom),
            "measurements" => Ok(Self::Measurements),
            "bom_tree" => Ok(Self::BomTree),
            "serial_numbers" => Ok(Self::SerialNumbers),
            other => Err(BomsheetError::validation(
                "table",
                format!("Invalid table type: {}", other),
            )),
        }
    }
}

/// A fully validated request.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    AddBom(NewBomRecord),
    AddBomIfNotExists(NewBomRecord),
    AddMeasurement(NewMeasurement),
    GetBom,
    GetMeasurements(MeasurementFilter),
    GetMeasurement(RecordId),
    GetBomTree,
    GetSerialNumbers,
    UpdateMeasurement(MeasurementUpdate),
    DeleteMeasurement(RecordId),
    UpsertMeasurement(NewMeasurement),
}

impl Operation {
    pub fn action(&self) -> Action {
        match self {
            Self::AddBom(_) | Self::AddMeasurement(_) => Action::Add,
            Self::AddBomIfNotExists(_) => Action::AddBomIfNotExists,
            Self::GetBom
            | Self::GetMeasurements(_)
            | Self::GetMeasurement(_)
            | Self::GetBomTree
            | Self::GetSerialNumbers => Action::Get,
            Self::UpdateMeasurement(_) => Action::Update,
            Self::DeleteMeasurement(_) => Action::Delete,
            Self::UpsertMeasurement(_) => Action::Upsert,
        }
    }

    pub fn table(&self) -> Table {
        match self {
            Self::AddBom(_) | Self::AddBomIfNotExists(_) | Self::GetBom => Table::Bom,
            Self::GetBomTree => Table::BomTree,
            Self::GetSerialNumbers => Table::SerialNumbers,
            Self::AddMeasurement(_)
            | Self::GetMeasurements(_)
            | Self::GetMeasurement(_)
            | Self::UpdateMeasurement(_)
            | Self::DeleteMeasurement(_)
            | Self::UpsertMeasurement(_) => Table::Measurements,
        }
    }

    /// Check a raw request against the dispatch table.
    pub fn from_request(request: ApiRequest) -> BomsheetResult<Self> {
        let action = non_empty(request.action)
            .ok_or_else(|| BomsheetError::validation("action", "Missing action parameter"))?;
        let action: Action = action.parse()?;
        let table = non_empty(request.table);
        let data = request.data.filter(|data| !data.is_null());

        match action {
            Action::Add => {
                let (table, data) = require_table_and_data(table, data)?;
                match table.parse::<Table>()? {
                    Table::Bom => {
                        let record: NewBomRecord = parse_payload(data)?;
                        if record.if_not_exists {
                            Ok(Self::AddBomIfNotExists(record))
                        } else {
                            Ok(Self::AddBom(record))
                        }
                    }
                    Table::Measurements => Ok(Self::AddMeasurement(parse_payload(data)?)),
                    other => Err(invalid_table(other.as_str())),
                }
            }
            Action::Get => {
                let table = table
                    .ok_or_else(|| BomsheetError::validation("table", "Missing table parameter"))?;
                match table.parse::<Table>()? {
                    Table::Bom => Ok(Self::GetBom),
                    Table::Measurements => {
                        let id = data
                            .as_ref()
                            .and_then(|data| data.get("id"))
                            .filter(|id| !id.is_null())
                            .map(record_id)
                            .transpose()?;
                        match id {
                            Some(id) => Ok(Self::GetMeasurement(id)),
                            None => Ok(Self::GetMeasurements(measurement_filter(data)?)),
                        }
                    }
                    Table::BomTree => Ok(Self::GetBomTree),
                    Table::SerialNumbers => Ok(Self::GetSerialNumbers),
                }
            }
            Action::Update => {
                let (table, data) = require_id(table, data)?;
                if table != Table::Measurements.as_str() {
                    return Err(unsupported("Update", &table));
                }
                Ok(Self::UpdateMeasurement(parse_payload(data)?))
            }
            Action::Delete => {
                let (table, data) = require_id(table, data)?;
                if table != Table::Measurements.as_str() {
                    return Err(unsupported("Delete", &table));
                }
                let id = data.get("id").unwrap_or(&Value::Null);
                Ok(Self::DeleteMeasurement(record_id(id)?))
            }
            Action::Upsert => {
                let (table, data) = require_table_and_data(table, data)?;
                if table != Table::Measurements.as_str() {
                    return Err(unsupported("Upsert", &table));
                }
                Ok(Self::UpsertMeasurement(parse_payload(data)?))
            }
            Action::AddBomIfNotExists => {
                let (table, data) = require_table_and_data(table, data)?;
                if table != Table::Bom.as_str() {
                    return Err(unsupported("add_bom_if_not_exists", &table));
                }
                Ok(Self::AddBomIfNotExists(parse_payload(data)?))
            }
        }
    }

    /// Run the operation and return the `data` field of the success envelope.
    pub async fn execute(self, state: &AppState) -> BomsheetResult<Value> {
        let value = match self {
            Self::AddBom(record) => to_value(state.bom.add(record).await?)?,
            Self::AddBomIfNotExists(record) => to_value(state.bom.add_if_not_exists(record).await?)?,
            Self::AddMeasurement(measurement) => to_value(state.measurements.add(measurement).await?)?,
            Self::GetBom => to_value(state.bom.find_all().await?)?,
            Self::GetMeasurements(filter) => to_value(state.measurements.find_all(&filter).await?)?,
            Self::GetMeasurement(id) => {
                let record = state
                    .measurements
                    .find_by_id(id.get())
                    .await?
                    .ok_or_else(|| measurement_not_found(id))?;
                to_value(record)?
            }
            Self::GetBomTree => {
                let records = state.bom.find_all().await?;
                to_value(build_tree(&records))?
            }
            Self::GetSerialNumbers => to_value(state.measurements.serial_numbers().await?)?,
            Self::UpdateMeasurement(update) => {
                let id = update.id;
                let receipt = state
                    .measurements
                    .update(update)
                    .await?
                    .ok_or_else(|| measurement_not_found(id))?;
                to_value(receipt)?
            }
            Self::DeleteMeasurement(id) => {
                let receipt = state
                    .measurements
                    .delete(id.get())
                    .await?
                    .ok_or_else(|| measurement_not_found(id))?;
                to_value(receipt)?
            }
            Self::UpsertMeasurement(measurement) => {
                to_value(state.measurements.upsert(measurement).await?)?
            }
        };
        Ok(value)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

fn require_table_and_data(
    table: Option<String>,
    data: Option<Value>,
) -> BomsheetResult<(String, Value)> {
    match (table, data) {
        (Some(table), Some(data)) => Ok((table, data)),
        _ => Err(BomsheetError::validation("data", MISSING_TABLE_OR_DATA)),
    }
}

fn require_id(table: Option<String>, data: Option<Value>) -> BomsheetResult<(String, Value)> {
    let has_id = data
        .as_ref()
        .and_then(|data| data.get("id"))
        .map(|id| match id {
            Value::Null => false,
            Value::String(text) => !text.is_empty(),
            Value::Number(number) => number.as_f64() != Some(0.0),
            _ => true,
        })
        .unwrap_or(false);

    match (table, data) {
        (Some(table), Some(data)) if has_id => Ok((table, data)),
        _ => Err(BomsheetError::validation("id", MISSING_ID)),
    }
}

fn measurement_filter(data: Option<Value>) -> BomsheetResult<MeasurementFilter> {
    match data {
        Some(data) if data.is_object() => serde_json::from_value(data)
            .map_err(|err| BomsheetError::validation("serial_number", format!("Invalid data: {}", err))),
        _ => Ok(MeasurementFilter::default()),
    }
}

fn record_id(id: &Value) -> BomsheetResult<RecordId> {
    RecordId::deserialize(id)
        .map_err(|err| BomsheetError::validation("id", format!("Invalid data: {}", err)))
}

fn invalid_table(table: &str) -> BomsheetError {
    BomsheetError::validation("table", format!("Invalid table type: {}", table))
}

fn unsupported(action: &str, table: &str) -> BomsheetError {
    BomsheetError::validation(
        "table",
        format!("{} not supported for table: {}", action, table),
    )
}

fn measurement_not_found(id: RecordId) -> BomsheetError {
    BomsheetError::not_found(format!("Measurement with ID {}", id))
}

fn to_value<T: serde::Serialize>(value: T) -> BomsheetResult<Value> {
    serde_json::to_value(value).map_err(|err| BomsheetError::internal(err.to_string()))
}
