//! Measurement domain models.
//!
//! A measurement is one named parameter value recorded against a serial number.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use validator::Validate;

use crate::record_id::RecordId;

/// Header row written when the measurements sheet is created.
pub const MEASUREMENT_COLUMNS: [&str; 5] = [
    "id",
    "serial_number",
    "para_name",
    "para_value",
    "created_at",
];

/// Scalar parameter value. Sheets hold text, so values are re-typed on read.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ParaValue {
    Bool(bool),
    Number(serde_json::Number),
    Text(String),
}

impl ParaValue {
    /// Re-type a stored cell. Anything that parses as a number is a number,
    /// so text such as `"007"` comes back as `7`.
    pub fn from_cell(cell: &str) -> Self {
        if let Ok(int) = cell.parse::<i64>() {
            return Self::Number(int.into());
        }
        if let Some(number) = cell
            .parse::<f64>()
            .ok()
            .and_then(serde_json::Number::from_f64)
        {
            return Self::Number(number);
        }
        match cell {
            "true" | "TRUE" => Self::Bool(true),
            "false" | "FALSE" => Self::Bool(false),
            _ => Self::Text(cell.to_string()),
        }
    }

    pub fn to_cell(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ParaValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{}", value),
            Self::Number(value) => write!(f, "{}", value),
            Self::Text(value) => f.write_str(value),
        }
    }
}

impl From<f64> for ParaValue {
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value)
            .map(Self::Number)
            .unwrap_or_else(|| Self::Text(value.to_string()))
    }
}

impl From<i64> for ParaValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<i32> for ParaValue {
    fn from(value: i32) -> Self {
        Self::Number(value.into())
    }
}

impl From<&str> for ParaValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// One stored measurement row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MeasurementRecord {
    pub id: i64,
    pub serial_number: String,
    pub para_name: String,
    pub para_value: ParaValue,
    pub created_at: DateTime<Utc>,
}

impl MeasurementRecord {
    /// Natural key used by upsert: exact, case-sensitive equality.
    pub fn matches_key(&self, serial_number: &str, para_name: &str) -> bool {
        self.serial_number == serial_number && self.para_name == para_name
    }
}

/// Payload for add and upsert.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct NewMeasurement {
    #[validate(length(min = 1, max = 200, message = "Serial number must be between 1 and 200 characters"))]
    pub serial_number: String,
    #[validate(length(min = 1, max = 200, message = "Parameter name must be between 1 and 200 characters"))]
    pub para_name: String,
    pub para_value: ParaValue,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl NewMeasurement {
    pub fn new(
        serial_number: impl Into<String>,
        para_name: impl Into<String>,
        para_value: impl Into<ParaValue>,
    ) -> Self {
        Self {
            serial_number: serial_number.into(),
            para_name: para_name.into(),
            para_value: para_value.into(),
            created_at: None,
        }
    }
}

/// Payload for update-by-id. Omitted fields keep their stored value.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct MeasurementUpdate {
    pub id: RecordId,
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "Serial number must be between 1 and 200 characters"))]
    pub serial_number: Option<String>,
    #[serde(default)]
    #[validate(length(min = 1, max = 200, message = "Parameter name must be between 1 and 200 characters"))]
    pub para_name: Option<String>,
    #[serde(default)]
    pub para_value: Option<ParaValue>,
}

/// Optional filter for listing measurements.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct MeasurementFilter {
    #[serde(default)]
    pub serial_number: Option<String>,
}

impl MeasurementFilter {
    pub fn accepts(&self, record: &MeasurementRecord) -> bool {
        match self.serial_number.as_deref() {
            Some(serial) if !serial.is_empty() => record.serial_number == serial,
            _ => true,
        }
    }
}
