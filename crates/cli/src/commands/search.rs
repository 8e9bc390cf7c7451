use crate::commands::{runtime, CommandContext, CommandResult, EXIT_INVALID_SELECTION};

pub fn run(demo: bool, term: &str, model: Option<&str>, year: Option<u16>) -> CommandResult {
    let term = term.trim();
    if term.is_empty() {
        return CommandResult::failure(
            "search",
            "invalid_input",
            "search term must not be empty",
            EXIT_INVALID_SELECTION,
        );
    }

    let context = match CommandContext::load("search", demo) {
        Ok(context) => context,
        Err(result) => return result,
    };
    let runtime = match runtime("search") {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let model = model.map(|model| model.trim().to_lowercase());
    let catalog = context.catalog();
    match runtime.block_on(catalog.search(term, model.as_deref(), year)) {
        Ok(results) => {
            let message = format!(
                "{} matches for `{term}` in {} (showing {})",
                results.total_results,
                results.model,
                results.accessories.len()
            );
            CommandResult::success_with_data("search", message, results)
        }
        Err(error) => CommandResult::catalog_failure("search", &error),
    }
}
