use kitfinder_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

use crate::commands::{CommandResult, EXIT_CONFIG};

#[derive(Debug, Serialize)]
struct ModelRow<'a> {
    key: &'a str,
    display_name: String,
    catalog_id: u32,
    years: &'a [u16],
    latest_year: Option<u16>,
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "models",
                "config_validation",
                format!("configuration issue: {error}"),
                EXIT_CONFIG,
            );
        }
    };

    let rows = config
        .catalog
        .models
        .iter()
        .map(|model| ModelRow {
            key: &model.key,
            display_name: model.display_name(),
            catalog_id: model.catalog_id,
            years: &model.years,
            latest_year: model.latest_year(),
        })
        .collect::<Vec<_>>();

    CommandResult::success_with_data("models", format!("{} models configured", rows.len()), rows)
}
