use std::path::Path;

use saleslens_core::config::ConfigOverrides;
use saleslens_core::{Engine, EngineReport, TransactionSet};
use serde::Serialize;
use tracing::info;

use crate::commands::{engine_failure, input, input_failure, load_config, CommandResult};

#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    /// Overrides `analysis.top_n`; non-positive keeps every entry.
    pub top_n: Option<i64>,
    pub include_records: bool,
}

#[derive(Serialize)]
struct AnalyzePayload<'a> {
    #[serde(flatten)]
    report: &'a EngineReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    records: Option<&'a TransactionSet>,
}

pub fn run(csv_path: &Path, config_path: Option<&Path>, options: &AnalyzeOptions) -> CommandResult {
    let overrides = ConfigOverrides { top_n: options.top_n, ..ConfigOverrides::default() };
    let config = match load_config("analyze", config_path, overrides) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let engine = match Engine::from_config(&config) {
        Ok(engine) => engine,
        Err(error) => return engine_failure("analyze", &error),
    };
    let table = match input::read_table(csv_path) {
        Ok(table) => table,
        Err(error) => return input_failure("analyze", &error),
    };
    let report = match engine.run(&table) {
        Ok(report) => report,
        Err(error) => return engine_failure("analyze", &error),
    };

    info!(
        event_name = "cli.analyze.completed",
        path = %csv_path.display(),
        rows_kept = report.normalization.rows_kept,
        failed_analyses = report.bundle.failures.len(),
        "analyze command completed"
    );

    let payload = AnalyzePayload {
        report: &report,
        records: options.include_records.then_some(&report.records),
    };
    let summary = format!(
        "analyzed {} of {} row(s) ({} dropped)",
        report.normalization.rows_kept,
        report.normalization.rows_read,
        report.normalization.rows_dropped()
    );

    if report.is_complete() {
        CommandResult::report("analyze", summary, payload)
    } else {
        let missing: Vec<&str> =
            report.bundle.missing().into_iter().map(|name| name.as_str()).collect();
        let mut message = format!("{summary}; failed analyses: [{}]", missing.join(", "));
        if report.overview.is_none() {
            message.push_str("; overview unavailable");
        }
        CommandResult::partial("analyze", message, payload)
    }
}
