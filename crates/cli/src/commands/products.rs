use std::path::Path;

use saleslens_core::{product_catalog, NormalizationReport, ProductSummary};
use serde::Serialize;

use crate::commands::{load_records, CommandResult, EXIT_PARTIAL};

#[derive(Serialize)]
struct ProductsPayload {
    normalization: NormalizationReport,
    products: Vec<ProductSummary>,
}

pub fn run(csv_path: &Path, config_path: Option<&Path>) -> CommandResult {
    let normalized = match load_records("products", config_path, csv_path) {
        Ok(normalized) => normalized,
        Err(result) => return result,
    };

    match product_catalog(&normalized.records) {
        Ok(products) => {
            let message = format!("{} product(s)", products.len());
            CommandResult::report(
                "products",
                message,
                ProductsPayload { normalization: normalized.report, products },
            )
        }
        Err(error) => CommandResult::failure("products", "computation", error.to_string(), EXIT_PARTIAL),
    }
}
