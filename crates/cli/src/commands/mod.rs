pub mod chat;
pub mod config;
pub mod doctor;
pub mod fetch;
pub mod models;
pub mod search;

use std::sync::Arc;

use kitfinder_catalog::{HttpCatalogSource, HttpCatalogSourceConfig};
use kitfinder_core::catalog::fixtures::demo_source;
use kitfinder_core::catalog::{CatalogClient, CatalogError, CatalogSource};
use kitfinder_core::config::{AppConfig, LoadOptions};
use serde::Serialize;
use serde_json::Value;
use tokio::runtime::Runtime;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;
pub const EXIT_CATALOG_UNAVAILABLE: u8 = 4;
pub const EXIT_CATALOG_PROTOCOL: u8 = 5;
pub const EXIT_INVALID_SELECTION: u8 = 6;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::emit(0, command, None, message.into(), None)
    }

    pub fn success_with_data(command: &str, message: impl Into<String>, data: impl Serialize) -> Self {
        match serde_json::to_value(data) {
            Ok(data) => Self::emit(0, command, None, message.into(), Some(data)),
            Err(error) => Self::failure(command, "serialization", error.to_string(), 1),
        }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::emit(exit_code, command, Some(error_class), message.into(), None)
    }

    /// Maps a catalog failure onto an error class and exit code.
    pub fn catalog_failure(command: &str, error: &CatalogError) -> Self {
        let (error_class, exit_code) = match error {
            CatalogError::UnsupportedModel { .. } => ("unsupported_model", EXIT_INVALID_SELECTION),
            CatalogError::YearUnavailable { .. } => ("year_unavailable", EXIT_INVALID_SELECTION),
            CatalogError::BackendUnavailable { .. } => {
                ("backend_unavailable", EXIT_CATALOG_UNAVAILABLE)
            }
            CatalogError::Protocol { .. } => ("protocol", EXIT_CATALOG_PROTOCOL),
        };
        Self::failure(command, error_class, error.to_string(), exit_code)
    }

    fn emit(
        exit_code: u8,
        command: &str,
        error_class: Option<&str>,
        message: String,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: if error_class.is_some() { "error" } else { "ok" }.to_string(),
            error_class: error_class.map(str::to_string),
            message,
            data,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Loaded configuration plus the catalog source commands run against.
pub struct CommandContext {
    pub config: AppConfig,
    pub source: Arc<dyn CatalogSource>,
    pub demo: bool,
}

impl CommandContext {
    /// `demo` swaps the HTTP backend for the bundled in-memory catalog.
    pub fn load(command: &str, demo: bool) -> Result<Self, CommandResult> {
        let config = AppConfig::load(LoadOptions::default()).map_err(|error| {
            CommandResult::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                EXIT_CONFIG,
            )
        })?;

        let source: Arc<dyn CatalogSource> = if demo {
            Arc::new(demo_source())
        } else {
            let source = HttpCatalogSource::new(HttpCatalogSourceConfig::from(&config.catalog))
                .map_err(|error| CommandResult::catalog_failure(command, &error))?;
            Arc::new(source)
        };

        Ok(Self { config, source, demo })
    }

    pub fn catalog(&self) -> CatalogClient {
        CatalogClient::from_config(self.source.clone(), &self.config.catalog)
    }
}

pub fn runtime(command: &str) -> Result<Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            EXIT_RUNTIME,
        )
    })
}
