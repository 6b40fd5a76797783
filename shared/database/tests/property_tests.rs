//! Property tests for the sheet repositories.

use std::collections::HashSet;

use bomsheet_database::{
    shared, BomRepository, IdPolicy, MeasurementRepository, MemoryStore,
};
use bomsheet_models::{MeasurementFilter, NewBomRecord, NewMeasurement, UpsertAction};
use proptest::prelude::*;

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("test runtime")
}

fn measurements() -> MeasurementRepository {
    MeasurementRepository::new(shared(MemoryStore::new()), "measurements", IdPolicy::Sequence)
}

mod upsert_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Repeated upserts of one key leave exactly one record holding the last value.
        #[test]
        fn prop_upsert_keeps_single_record(
            serial in "SN-[0-9]{1,4}",
            name in "[A-Za-z]{1,12}",
            values in prop::collection::vec(-1000i64..1000, 1..8),
        ) {
            let rt = runtime();
            let repo = measurements();

            let mut first_id = None;
            for (round, value) in values.iter().enumerate() {
                let outcome = rt
                    .block_on(repo.upsert(NewMeasurement::new(serial.as_str(), name.as_str(), *value)))
                    .unwrap();
                let expected = if round == 0 { UpsertAction::Inserted } else { UpsertAction::Updated };
                prop_assert_eq!(outcome.action, expected);
                prop_assert_eq!(*first_id.get_or_insert(outcome.id), outcome.id);
            }

            let stored = rt.block_on(repo.find_all(&MeasurementFilter::default())).unwrap();
            prop_assert_eq!(stored.len(), 1);
            prop_assert_eq!(stored[0].para_value.to_cell(), values[values.len() - 1].to_string());
        }
    }
}

mod id_tests {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        /// Sequence ids stay unique across any mix of adds and deletes.
        #[test]
        fn prop_sequence_ids_unique(ops in prop::collection::vec(any::<bool>(), 1..30)) {
            let rt = runtime();
            let repo = measurements();
            let mut seen = HashSet::new();
            let mut live = Vec::new();

            for (step, add) in ops.into_iter().enumerate() {
                if add || live.is_empty() {
                    let receipt = rt
                        .block_on(repo.add(NewMeasurement::new("SN-1", format!("p{}", step), 1)))
                        .unwrap();
                    prop_assert!(seen.insert(receipt.id));
                    live.push(receipt.id);
                } else {
                    let id = live.remove(0);
                    prop_assert!(rt.block_on(repo.delete(id)).unwrap().is_some());
                }
            }

            let stored = rt.block_on(repo.find_all(&MeasurementFilter::default())).unwrap();
            prop_assert_eq!(stored.len(), live.len());
        }

        /// Under the row-position policy the id of an append equals its data row count.
        #[test]
        fn prop_row_position_ids_track_rows(count in 1usize..20) {
            let rt = runtime();
            let repo = BomRepository::new(shared(MemoryStore::new()), "bom", IdPolicy::RowPosition);

            for n in 0..count {
                let receipt = rt
                    .block_on(repo.add(NewBomRecord::new("PART", format!("S{}", n))))
                    .unwrap();
                prop_assert_eq!(receipt.id, (n + 1) as i64);
                prop_assert_eq!(receipt.row, n + 2);
            }
        }
    }
}
