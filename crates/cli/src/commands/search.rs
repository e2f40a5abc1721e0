use std::path::Path;

use saleslens_core::search_products;
use tracing::info;

use crate::commands::{load_records, CommandResult, EXIT_PARTIAL};

pub fn run(csv_path: &Path, config_path: Option<&Path>, term: &str) -> CommandResult {
    let normalized = match load_records("search", config_path, csv_path) {
        Ok(normalized) => normalized,
        Err(result) => return result,
    };

    match search_products(&normalized.records, term) {
        Ok(found) => {
            info!(
                event_name = "cli.search.completed",
                term = %found.term,
                matched_products = found.matched_products.len(),
                transactions = found.transactions,
                "search command completed"
            );
            let message = if found.is_empty() {
                format!("no products match `{}`", found.term)
            } else {
                format!(
                    "{} product(s) across {} transaction(s) match `{}`",
                    found.matched_products.len(),
                    found.transactions,
                    found.term
                )
            };
            CommandResult::report("search", message, found)
        }
        Err(error) => CommandResult::failure("search", "computation", error.to_string(), EXIT_PARTIAL),
    }
}
