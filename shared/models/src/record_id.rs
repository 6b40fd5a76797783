//! Row identifiers as sent by browser clients.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Integer row id. Clients send it either as a JSON number or a numeric string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordId(pub i64);

impl RecordId {
    pub fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl Serialize for RecordId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.0)
    }
}

impl<'de> Deserialize<'de> for RecordId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Float(f64),
            Text(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Int(id) => Ok(Self(id)),
            Raw::Float(id) if id.fract() == 0.0 => Ok(Self(id as i64)),
            Raw::Float(id) => Err(serde::de::Error::custom(format!(
                "id must be an integer, got {}",
                id
            ))),
            Raw::Text(text) => text
                .trim()
                .parse::<i64>()
                .map(Self)
                .map_err(|_| serde::de::Error::custom(format!("id must be numeric, got '{}'", text))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_numbers_and_numeric_strings() {
        let from_number: RecordId = serde_json::from_str("7").unwrap();
        let from_float: RecordId = serde_json::from_str("7.0").unwrap();
        let from_text: RecordId = serde_json::from_str("\" 7 \"").unwrap();
        assert_eq!(from_number, RecordId(7));
        assert_eq!(from_float, RecordId(7));
        assert_eq!(from_text, RecordId(7));
    }

    #[test]
    fn rejects_non_numeric_ids() {
        assert!(serde_json::from_str::<RecordId>("\"abc\"").is_err());
        assert!(serde_json::from_str::<RecordId>("1.5").is_err());
        assert!(serde_json::from_str::<RecordId>("null").is_err());
    }
}
