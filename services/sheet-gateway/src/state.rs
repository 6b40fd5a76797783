use std::sync::Arc;

use anyhow::Result;
use bomsheet_database::{initialize_repositories, BomRepository, MeasurementRepository};
use bomsheet_utils::AppConfig;

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AppState {
    pub bom: Arc<BomRepository>,
    pub measurements: Arc<MeasurementRepository>,
    pub config: Arc<AppConfig>,
    pub metrics: Metrics,
}

impl AppState {
    /// Open the configured store, create missing sheets and register metrics.
    pub async fn initialize(config: AppConfig) -> Result<Self> {
        config.validate()?;
        let (bom, measurements) = initialize_repositories(&config.storage).await?;
        tracing::info!(
            bom_table = bom.table(),
            measurements_table = measurements.table(),
            "Sheets ready"
        );

        Ok(Self {
            bom: Arc::new(bom),
            measurements: Arc::new(measurements),
            config: Arc::new(config),
            metrics: Metrics::new()?,
        })
    }
}
