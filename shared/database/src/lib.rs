pub mod csv_workbook;
pub mod ids;
pub mod memory;
pub mod repositories;
pub mod row_store;

pub use csv_workbook::CsvWorkbook;
pub use ids::IdPolicy;
pub use memory::MemoryStore;
pub use repositories::*;
pub use row_store::{
    shared, with_store, RowStore, SharedStore, Sheet, SheetRow, StoreError, StoreResult,
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    Csv,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StorageBackend,
    pub data_dir: PathBuf,
    pub bom_table: String,
    pub measurements_table: String,
    pub id_policy: IdPolicy,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Csv,
            data_dir: PathBuf::from("data"),
            bom_table: "bom".to_string(),
            measurements_table: "measurements".to_string(),
            id_policy: IdPolicy::Sequence,
        }
    }
}

/// Open the configured backend and wrap it for sharing between repositories.
pub fn initialize_store(config: &StoreConfig) -> Result<SharedStore> {
    let store = match config.backend {
        StorageBackend::Memory => {
            tracing::info!("Using in-memory row store");
            shared(MemoryStore::new())
        }
        StorageBackend::Csv => {
            let workbook = CsvWorkbook::open(&config.data_dir).with_context(|| {
                format!("Failed to open workbook at {}", config.data_dir.display())
            })?;
            shared(workbook)
        }
    };
    Ok(store)
}

/// Build both repositories over one store and make sure their sheets exist.
pub async fn initialize_repositories(
    config: &StoreConfig,
) -> Result<(BomRepository, MeasurementRepository)> {
    let store = initialize_store(config)?;
    let bom = BomRepository::new(store.clone(), config.bom_table.clone(), config.id_policy);
    let measurements = MeasurementRepository::new(
        store,
        config.measurements_table.clone(),
        config.id_policy,
    );

    bom.initialize().await?;
    measurements.initialize().await?;
    Ok((bom, measurements))
}
