pub mod aggregate;
pub mod analysis;
pub mod config;
pub mod domain;
pub mod engine;
pub mod errors;
pub mod explore;
pub mod normalize;
pub mod pairs;

pub use aggregate::{aggregate, group_and_reduce, Group};
pub use analysis::{
    analyze, panic_message, AnalysisFailure, AnalysisName, AnalysisOutput, Analyzer, ResultBundle,
};
pub use config::{AnalysisConfig, AppConfig, ConfigError, LoadOptions, NormalizeConfig};
pub use domain::pair::ProductPair;
pub use domain::ranked::{RankedEntry, RankedResult};
pub use domain::transaction::{CustomerId, Transaction, TransactionId, TransactionSet};
pub use engine::{Engine, EngineReport};
pub use errors::{ComputationError, EngineError, ParseWarning, SchemaError, WarningKind};
pub use explore::{overview, product_catalog, search_products, Overview, ProductSearch, ProductSummary};
pub use normalize::{normalize, Column, NormalizationReport, Normalized, Normalizer, RawTable};
pub use pairs::{mine_pairs, PairMiner, PairMining, PairMiningStats};
