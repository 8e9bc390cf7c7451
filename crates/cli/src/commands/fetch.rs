use kitfinder_core::domain::model::DEFAULT_MODEL_YEAR;

use crate::commands::{runtime, CommandContext, CommandResult};

/// Loads one model/year listing and reports counts, facets, price range and
/// per-type categories.
pub fn run(demo: bool, model: &str, year: Option<u16>) -> CommandResult {
    let context = match CommandContext::load("fetch", demo) {
        Ok(context) => context,
        Err(result) => return result,
    };
    let runtime = match runtime("fetch") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let model = model.trim().to_lowercase();
    let year = year.unwrap_or(DEFAULT_MODEL_YEAR);
    let catalog = context.catalog();

    match runtime.block_on(catalog.load(&model, year)) {
        Ok(snapshot) => {
            let summary = snapshot.summary();
            let message = if summary.total_accessories == 0 {
                format!("no accessories listed for {} {year}", snapshot.model.display_name())
            } else {
                format!(
                    "{} accessories across {} types for {} {year}",
                    summary.total_accessories,
                    summary.types.len(),
                    snapshot.model.display_name()
                )
            };
            CommandResult::success_with_data("fetch", message, summary)
        }
        Err(error) => CommandResult::catalog_failure("fetch", &error),
    }
}
