//! BOM Tree Builder
//!
//! Each record names the serial number of the assembly it is fitted into.
//! Resolving that serial to its part yields a parent-to-child edge between
//! parts. Parts that never appear as a child are the roots of the forest.
//!
//! Children are tracked by part number while edges are collected and only
//! materialised at the end, so every embedded child is the complete node
//! regardless of record order.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

use bomsheet_models::{BomForest, BomRecord, BomTreeNode};

#[derive(Default)]
struct PartEntry<'a> {
    serial_numbers: Vec<&'a str>,
    children: BTreeSet<&'a str>,
}

/// Build the part forest from BOM records. Never fails: dangling assembly
/// links are ignored and cycles are cut at the first revisit along a path.
pub fn build_tree(records: &[BomRecord]) -> BomForest {
    let mut serial_to_part: HashMap<&str, &str> = HashMap::new();
    let mut parts: BTreeMap<&str, PartEntry<'_>> = BTreeMap::new();

    for record in records {
        let entry = parts.entry(record.part_no.as_str()).or_default();
        let serial = record.serial_number.as_str();
        if serial.is_empty() {
            continue;
        }
        serial_to_part.insert(serial, record.part_no.as_str());
        if !entry.serial_numbers.contains(&serial) {
            entry.serial_numbers.push(serial);
        }
    }

    let mut child_parts: HashSet<&str> = HashSet::new();
    let mut dangling = 0usize;
    for record in records.iter().filter(|r| r.has_assembly_link()) {
        let Some(parent) = serial_to_part.get(record.sub_assembly_serial_number.as_str()) else {
            dangling += 1;
            continue;
        };
        if let Some(entry) = parts.get_mut(parent) {
            entry.children.insert(record.part_no.as_str());
        }
        child_parts.insert(record.part_no.as_str());
    }

    let forest: BomForest = parts
        .keys()
        .filter(|part| !child_parts.contains(*part))
        .map(|part| {
            let mut path = Vec::new();
            (part.to_string(), materialize(*part, &parts, &mut path))
        })
        .collect();

    tracing::debug!(
        records = records.len(),
        parts = parts.len(),
        roots = forest.len(),
        dangling,
        "Built BOM tree"
    );
    forest
}

fn materialize<'a>(
    part: &'a str,
    parts: &BTreeMap<&'a str, PartEntry<'a>>,
    path: &mut Vec<&'a str>,
) -> BomTreeNode {
    let mut node = BomTreeNode::new(part);
    let Some(entry) = parts.get(part) else {
        return node;
    };
    node.serial_numbers = entry.serial_numbers.iter().map(|s| s.to_string()).collect();

    path.push(part);
    for child in &entry.children {
        if path.contains(child) {
            continue;
        }
        node.children
            .insert(child.to_string(), materialize(*child, parts, path));
    }
    path.pop();
    node
}
