//! BOM domain models.
//!
//! A BOM row links one serial-numbered unit of a part to the serial number of
//! the assembly it is built into. The tree types describe the hierarchy that
//! is derived from those rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use validator::Validate;

/// Header row written when the BOM sheet is created.
pub const BOM_COLUMNS: [&str; 5] = [
    "id",
    "part_no",
    "serial_number",
    "sub_assembly_serial_number",
    "created_at",
];

/// Header used for the assembly link by older sheets.
pub const LEGACY_ASSEMBLY_COLUMN: &str = "assembly_serial_number";

/// One stored BOM relationship row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BomRecord {
    pub id: i64,
    pub part_no: String,
    pub serial_number: String,
    /// Serial number of the assembly this unit belongs to; empty for top-level units.
    #[serde(default, alias = "assembly_serial_number")]
    pub sub_assembly_serial_number: String,
    pub created_at: DateTime<Utc>,
}

impl BomRecord {
    pub fn has_assembly_link(&self) -> bool {
        !self.sub_assembly_serial_number.is_empty()
    }

    /// Natural-key comparison used by add-if-not-exists.
    pub fn same_relationship(&self, candidate: &NewBomRecord) -> bool {
        self.part_no == candidate.part_no
            && self.serial_number == candidate.serial_number
            && self.sub_assembly_serial_number == candidate.assembly_link()
    }
}

/// Payload for inserting a BOM relationship.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq)]
pub struct NewBomRecord {
    #[validate(length(min = 1, max = 200, message = "Part number must be between 1 and 200 characters"))]
    pub part_no: String,
    #[validate(length(min = 1, max = 200, message = "Serial number must be between 1 and 200 characters"))]
    pub serial_number: String,
    #[serde(default, alias = "assembly_serial_number")]
    #[validate(length(max = 200, message = "Sub-assembly serial number must be at most 200 characters"))]
    pub sub_assembly_serial_number: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Request flag selecting add-if-not-exists semantics; never stored.
    #[serde(default, skip_serializing)]
    pub if_not_exists: bool,
}

impl NewBomRecord {
    pub fn new(part_no: impl Into<String>, serial_number: impl Into<String>) -> Self {
        Self {
            part_no: part_no.into(),
            serial_number: serial_number.into(),
            sub_assembly_serial_number: None,
            created_at: None,
            if_not_exists: false,
        }
    }

    pub fn with_assembly(mut self, serial_number: impl Into<String>) -> Self {
        self.sub_assembly_serial_number = Some(serial_number.into());
        self
    }

    /// The assembly link as stored: a missing link is an empty cell.
    pub fn assembly_link(&self) -> &str {
        self.sub_assembly_serial_number.as_deref().unwrap_or("")
    }
}

/// A part in the BOM hierarchy with every serial number seen for it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BomTreeNode {
    pub part_no: String,
    pub serial_numbers: Vec<String>,
    pub children: BTreeMap<String, BomTreeNode>,
}

/// Root part number to its subtree.
pub type BomForest = BTreeMap<String, BomTreeNode>;

impl BomTreeNode {
    pub fn new(part_no: impl Into<String>) -> Self {
        Self {
            part_no: part_no.into(),
            ..Self::default()
        }
    }

    pub fn child(&self, part_no: &str) -> Option<&BomTreeNode> {
        self.children.get(part_no)
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of nodes in this subtree, the node itself included.
    pub fn node_count(&self) -> usize {
        1 + self.children.values().map(BomTreeNode::node_count).sum::<usize>()
    }
}
