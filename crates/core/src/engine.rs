//! End-to-end pipeline: raw table in, report out.

use serde::Serialize;
use tracing::{info, warn};

use crate::analysis::{Analyzer, ResultBundle};
use crate::config::AppConfig;
use crate::domain::transaction::TransactionSet;
use crate::errors::EngineError;
use crate::explore::{overview, Overview};
use crate::normalize::{NormalizationReport, Normalizer, RawTable};

/// Output of one engine run. `records` stays available for ad-hoc queries but
/// is not serialized with the report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EngineReport {
    #[serde(skip)]
    pub records: TransactionSet,
    pub normalization: NormalizationReport,
    /// `None` when the headline figures could not be computed; the reason is
    /// in `bundle.warnings`.
    pub overview: Option<Overview>,
    pub bundle: ResultBundle,
}

impl EngineReport {
    pub fn is_complete(&self) -> bool {
        self.bundle.is_complete() && self.overview.is_some()
    }
}

#[derive(Clone, Debug, Default)]
pub struct Engine {
    normalizer: Normalizer,
    analyzer: Analyzer,
}

impl Engine {
    pub fn new(normalizer: Normalizer, analyzer: Analyzer) -> Self {
        Self { normalizer, analyzer }
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, EngineError> {
        config.validate().map_err(|error| EngineError::Configuration(error.to_string()))?;
        Ok(Self::new(Normalizer::new(config.normalize.clone()), Analyzer::new(config.analysis)))
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn run(&self, table: &RawTable) -> Result<EngineReport, EngineError> {
        let normalized = self.normalizer.normalize(table)?;
        let mut bundle = self.analyzer.analyze(&normalized.records);

        let overview = match overview(&normalized.records) {
            Ok(overview) => Some(overview),
            Err(error) => {
                warn!(
                    event_name = "engine.run.overview_failed",
                    error = %error,
                    "overview could not be computed"
                );
                bundle.warnings.push(format!("overview: {error}"));
                None
            }
        };

        info!(
            event_name = "engine.run.completed",
            rows_read = normalized.report.rows_read,
            rows_kept = normalized.report.rows_kept,
            failed_analyses = bundle.failures.len(),
            "engine run completed"
        );

        Ok(EngineReport {
            records: normalized.records,
            normalization: normalized.report,
            overview,
            bundle,
        })
    }
}
