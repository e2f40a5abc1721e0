//! Named analyses over a normalized record set.
//!
//! [`Analyzer::analyze`] runs every [`AnalysisName`] independently. A failing
//! analysis, whether it returns a [`ComputationError`] or panics, is recorded
//! in [`ResultBundle::failures`] and the remaining analyses still run.
//!
//! Catching a panic does not silence the process panic hook, which runs before
//! unwinding. The default hook writes a plain-text report to stderr; binaries
//! that log JSON should install a hook that routes the report through
//! `tracing` (the `saleslens` CLI does) and can use [`panic_message`] for it.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::aggregate::{aggregate, group_and_reduce, keys, reducers};
use crate::config::AnalysisConfig;
use crate::domain::pair::ProductPair;
use crate::domain::ranked::RankedResult;
use crate::domain::transaction::TransactionSet;
use crate::errors::ComputationError;
use crate::pairs::{PairMiner, PairMiningStats};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisName {
    BestSellingProducts,
    MonthlySales,
    RegionalSales,
    SalesByDay,
    FrequentCustomers,
    AveragePurchaseValue,
    CustomerRecency,
    CustomerPurchaseFrequency,
    TopProductPairs,
}

impl AnalysisName {
    pub const ALL: [AnalysisName; 9] = [
        AnalysisName::BestSellingProducts,
        AnalysisName::MonthlySales,
        AnalysisName::RegionalSales,
        AnalysisName::SalesByDay,
        AnalysisName::FrequentCustomers,
        AnalysisName::AveragePurchaseValue,
        AnalysisName::CustomerRecency,
        AnalysisName::CustomerPurchaseFrequency,
        AnalysisName::TopProductPairs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BestSellingProducts => "best_selling_products",
            Self::MonthlySales => "monthly_sales",
            Self::RegionalSales => "regional_sales",
            Self::SalesByDay => "sales_by_day",
            Self::FrequentCustomers => "frequent_customers",
            Self::AveragePurchaseValue => "average_purchase_value",
            Self::CustomerRecency => "customer_recency",
            Self::CustomerPurchaseFrequency => "customer_purchase_frequency",
            Self::TopProductPairs => "top_product_pairs",
        }
    }
}

impl fmt::Display for AnalysisName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AnalysisName {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim();
        Self::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(value))
            .ok_or_else(|| format!("unknown analysis `{value}`"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "entries", rename_all = "snake_case")]
pub enum AnalysisOutput {
    Quantities(RankedResult<u64>),
    Revenue(RankedResult<Decimal>),
    Dates(RankedResult<NaiveDate>),
    Counts(RankedResult<u64>),
    Pairs(Vec<ProductPair>),
}

impl AnalysisOutput {
    pub fn len(&self) -> usize {
        match self {
            Self::Quantities(ranked) | Self::Counts(ranked) => ranked.len(),
            Self::Revenue(ranked) => ranked.len(),
            Self::Dates(ranked) => ranked.len(),
            Self::Pairs(pairs) => pairs.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AnalysisFailure {
    pub analysis: AnalysisName,
    pub message: String,
    pub error: ComputationError,
}

/// Everything handed to presentation for one record set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ResultBundle {
    pub results: BTreeMap<AnalysisName, AnalysisOutput>,
    pub failures: Vec<AnalysisFailure>,
    pub warnings: Vec<String>,
    pub pair_mining: Option<PairMiningStats>,
}

impl ResultBundle {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Analyses without a result, in canonical order.
    pub fn missing(&self) -> Vec<AnalysisName> {
        AnalysisName::ALL.into_iter().filter(|name| !self.results.contains_key(name)).collect()
    }

    pub fn get(&self, name: AnalysisName) -> Option<&AnalysisOutput> {
        self.results.get(&name)
    }

    pub fn quantities(&self, name: AnalysisName) -> Option<&RankedResult<u64>> {
        match self.get(name)? {
            AnalysisOutput::Quantities(ranked) | AnalysisOutput::Counts(ranked) => Some(ranked),
            _ => None,
        }
    }

    pub fn revenue(&self, name: AnalysisName) -> Option<&RankedResult<Decimal>> {
        match self.get(name)? {
            AnalysisOutput::Revenue(ranked) => Some(ranked),
            _ => None,
        }
    }

    pub fn dates(&self, name: AnalysisName) -> Option<&RankedResult<NaiveDate>> {
        match self.get(name)? {
            AnalysisOutput::Dates(ranked) => Some(ranked),
            _ => None,
        }
    }

    pub fn pairs(&self) -> Option<&[ProductPair]> {
        match self.get(AnalysisName::TopProductPairs)? {
            AnalysisOutput::Pairs(pairs) => Some(pairs),
            _ => None,
        }
    }
}

struct Computed {
    output: AnalysisOutput,
    pair_mining: Option<PairMiningStats>,
}

impl From<AnalysisOutput> for Computed {
    fn from(output: AnalysisOutput) -> Self {
        Self { output, pair_mining: None }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Analyzer {
    config: AnalysisConfig,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn analyze(&self, records: &TransactionSet) -> ResultBundle {
        let mut bundle = ResultBundle::default();

        for name in AnalysisName::ALL {
            match isolate(name, || self.compute(name, records)) {
                Ok(computed) => {
                    debug!(
                        event_name = "engine.analysis.completed",
                        analysis = name.as_str(),
                        entries = computed.output.len(),
                        "analysis completed"
                    );
                    if let Some(stats) = computed.pair_mining {
                        if stats.customers_skipped > 0 {
                            bundle.warnings.push(format!(
                                "{name}: {} customer(s) above {} distinct products were left out of pair mining",
                                stats.customers_skipped, self.config.max_distinct_products_per_customer
                            ));
                        }
                        bundle.pair_mining = Some(stats);
                    }
                    bundle.results.insert(name, computed.output);
                }
                Err(failure) => {
                    error!(
                        event_name = "engine.analysis.failed",
                        analysis = name.as_str(),
                        error = %failure.error,
                        "analysis failed; sibling analyses continue"
                    );
                    bundle.failures.push(failure);
                }
            }
        }

        info!(
            event_name = "engine.analysis.bundle_ready",
            records = records.len(),
            completed = bundle.results.len(),
            failed = bundle.failures.len(),
            "result bundle assembled"
        );
        bundle
    }

    /// Runs a single analysis without isolation.
    pub fn run(
        &self,
        name: AnalysisName,
        records: &TransactionSet,
    ) -> Result<AnalysisOutput, ComputationError> {
        self.compute(name, records).map(|computed| computed.output)
    }

    fn compute(
        &self,
        name: AnalysisName,
        records: &TransactionSet,
    ) -> Result<Computed, ComputationError> {
        let top_n = self.config.top_n;
        let output = match name {
            AnalysisName::BestSellingProducts => AnalysisOutput::Quantities(aggregate(
                records,
                keys::product,
                reducers::sum_quantity,
                top_n,
            )?),
            AnalysisName::MonthlySales => AnalysisOutput::Revenue(RankedResult::by_key(
                group_and_reduce(records, keys::month, reducers::sum_revenue)?,
            )),
            AnalysisName::RegionalSales => AnalysisOutput::Revenue(aggregate(
                records,
                keys::region,
                reducers::sum_revenue,
                0,
            )?),
            AnalysisName::SalesByDay => AnalysisOutput::Revenue(aggregate(
                records,
                keys::weekday,
                reducers::sum_revenue,
                0,
            )?),
            AnalysisName::FrequentCustomers => AnalysisOutput::Revenue(aggregate(
                records,
                keys::customer,
                reducers::sum_revenue,
                top_n,
            )?),
            AnalysisName::AveragePurchaseValue => AnalysisOutput::Revenue(aggregate(
                records,
                keys::customer,
                reducers::mean_revenue,
                top_n,
            )?),
            AnalysisName::CustomerRecency => AnalysisOutput::Dates(aggregate(
                records,
                keys::customer,
                reducers::latest_date,
                top_n,
            )?),
            AnalysisName::CustomerPurchaseFrequency => AnalysisOutput::Counts(aggregate(
                records,
                keys::customer,
                reducers::count,
                top_n,
            )?),
            AnalysisName::TopProductPairs => {
                let mining = PairMiner::new(self.config.max_distinct_products_per_customer)
                    .mine(records, top_n);
                return Ok(Computed {
                    output: AnalysisOutput::Pairs(mining.pairs),
                    pair_mining: Some(mining.stats),
                });
            }
        };

        Ok(output.into())
    }
}

/// Runs every analysis with the default configuration.
pub fn analyze(records: &TransactionSet) -> ResultBundle {
    Analyzer::default().analyze(records)
}

fn isolate<T>(
    name: AnalysisName,
    compute: impl FnOnce() -> Result<T, ComputationError>,
) -> Result<T, AnalysisFailure> {
    let outcome = panic::catch_unwind(AssertUnwindSafe(compute)).unwrap_or_else(|payload| {
        Err(ComputationError::Panicked { message: panic_message(payload.as_ref()) })
    });

    outcome.map_err(|error| AnalysisFailure { analysis: name, message: error.to_string(), error })
}

/// Text of a panic payload, for the `&str` and `String` payloads `panic!` produces.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| (*message).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
