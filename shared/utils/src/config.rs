use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;

use bomsheet_database::StoreConfig;

use crate::error::{BomsheetError, BomsheetResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StoreConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub max_request_size: usize,
    /// Serve the bundled HTML page on `GET /` instead of the health response.
    pub serve_html: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
    pub file_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_request_size: 1024 * 1024, // 1MB
            serve_html: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
            file_path: None,
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(
                File::with_name(&format!(
                    "config/{}",
                    env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into())
                ))
                .required(false),
            )
            // Add local config (gitignored)
            .add_source(File::with_name("config/local").required(false))
            // BOMSHEET__STORAGE__DATA_DIR=/var/lib/bomsheet and friends
            .add_source(Environment::with_prefix("BOMSHEET").separator("__"));

        config.build()?.try_deserialize()
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Reject settings that deserialize fine but cannot run.
    pub fn validate(&self) -> BomsheetResult<()> {
        if self.server.max_request_size == 0 {
            return Err(BomsheetError::configuration(
                "server.max_request_size must be greater than zero",
            ));
        }

        let storage = &self.storage;
        if storage.bom_table.trim().is_empty() || storage.measurements_table.trim().is_empty() {
            return Err(BomsheetError::configuration("table names must not be empty"));
        }
        if storage.bom_table == storage.measurements_table {
            return Err(BomsheetError::configuration(format!(
                "bom and measurements cannot share the table '{}'",
                storage.bom_table
            )));
        }
        Ok(())
    }
}
