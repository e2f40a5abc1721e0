use std::env;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_DATE_FORMAT: &str = "%m/%d/%Y";
pub const DEFAULT_TOP_N: usize = 10;
pub const DEFAULT_MAX_DISTINCT_PRODUCTS: usize = 200;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppConfig {
    pub normalize: NormalizeConfig,
    pub analysis: AnalysisConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizeConfig {
    pub date_format: String,
    /// Cell values treated as missing, compared case-insensitively after trimming.
    pub missing_markers: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct AnalysisConfig {
    /// Cap for the capped views. `0` keeps every entry.
    pub top_n: usize,
    /// Customers with more distinct products are left out of pair mining.
    /// `0` disables the cap.
    pub max_distinct_products_per_customer: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub date_format: Option<String>,
    pub top_n: Option<i64>,
    pub max_distinct_products_per_customer: Option<usize>,
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            normalize: NormalizeConfig::default(),
            analysis: AnalysisConfig::default(),
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            date_format: DEFAULT_DATE_FORMAT.to_string(),
            missing_markers: ["NA", "N/A", "NaN", "null"].map(str::to_string).to_vec(),
        }
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            max_distinct_products_per_customer: DEFAULT_MAX_DISTINCT_PRODUCTS,
        }
    }
}

impl NormalizeConfig {
    pub fn is_missing(&self, cell: &str) -> bool {
        let cell = cell.trim();
        cell.is_empty() || self.missing_markers.iter().any(|marker| marker.eq_ignore_ascii_case(cell))
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

/// Non-positive caps mean "everything".
pub fn top_n_from_signed(value: i64) -> usize {
    usize::try_from(value).unwrap_or(0)
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("saleslens.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(normalize) = patch.normalize {
            if let Some(date_format) = normalize.date_format {
                self.normalize.date_format = date_format;
            }
            if let Some(missing_markers) = normalize.missing_markers {
                self.normalize.missing_markers = missing_markers;
            }
        }

        if let Some(analysis) = patch.analysis {
            if let Some(top_n) = analysis.top_n {
                self.analysis.top_n = top_n_from_signed(top_n);
            }
            if let Some(max_distinct) = analysis.max_distinct_products_per_customer {
                self.analysis.max_distinct_products_per_customer = max_distinct;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SALESLENS_NORMALIZE_DATE_FORMAT") {
            self.normalize.date_format = value;
        }
        if let Some(value) = read_env("SALESLENS_NORMALIZE_MISSING_MARKERS") {
            self.normalize.missing_markers = value
                .split(',')
                .map(str::trim)
                .filter(|marker| !marker.is_empty())
                .map(str::to_string)
                .collect();
        }

        if let Some(value) = read_env("SALESLENS_ANALYSIS_TOP_N") {
            self.analysis.top_n = top_n_from_signed(parse_i64("SALESLENS_ANALYSIS_TOP_N", &value)?);
        }
        if let Some(value) = read_env("SALESLENS_ANALYSIS_MAX_DISTINCT_PRODUCTS") {
            self.analysis.max_distinct_products_per_customer =
                parse_usize("SALESLENS_ANALYSIS_MAX_DISTINCT_PRODUCTS", &value)?;
        }

        let log_level =
            read_env("SALESLENS_LOGGING_LEVEL").or_else(|| read_env("SALESLENS_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SALESLENS_LOGGING_FORMAT").or_else(|| read_env("SALESLENS_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(date_format) = overrides.date_format {
            self.normalize.date_format = date_format;
        }
        if let Some(top_n) = overrides.top_n {
            self.analysis.top_n = top_n_from_signed(top_n);
        }
        if let Some(max_distinct) = overrides.max_distinct_products_per_customer {
            self.analysis.max_distinct_products_per_customer = max_distinct;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_normalize(&self.normalize)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("saleslens.toml"), PathBuf::from("config/saleslens.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_normalize(normalize: &NormalizeConfig) -> Result<(), ConfigError> {
    let format = normalize.date_format.trim();
    if format.is_empty() {
        return Err(ConfigError::Validation("normalize.date_format must not be empty".to_string()));
    }

    let has_year = format.contains("%Y") || format.contains("%y");
    let has_month = ["%m", "%b", "%B"].iter().any(|spec| format.contains(spec));
    let has_day = format.contains("%d") || format.contains("%e");
    if !(has_year && has_month && has_day) {
        return Err(ConfigError::Validation(format!(
            "normalize.date_format `{format}` must contain year, month and day specifiers"
        )));
    }

    // Must survive a render/parse round trip.
    let sample = NaiveDate::from_ymd_opt(2024, 1, 31)
        .ok_or_else(|| ConfigError::Validation("date sample is invalid".to_string()))?;
    let mut rendered = String::new();
    if write!(rendered, "{}", sample.format(format)).is_err() {
        return Err(ConfigError::Validation(format!(
            "normalize.date_format `{format}` is not a valid date format"
        )));
    }
    if NaiveDate::parse_from_str(&rendered, format).ok() != Some(sample) {
        return Err(ConfigError::Validation(format!(
            "normalize.date_format `{format}` cannot parse the dates it formats"
        )));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    if logging.level.trim().parse::<tracing::Level>().is_err() {
        return Err(ConfigError::Validation(format!(
            "logging.level `{}` is not one of trace|debug|info|warn|error",
            logging.level
        )));
    }

    Ok(())
}

/// Trimmed value of an environment variable. Unset and blank count as absent.
pub fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().map(|value| value.trim().to_string()).filter(|value| !value.is_empty())
}

fn parse_i64(key: &str, value: &str) -> Result<i64, ConfigError> {
    value
        .parse::<i64>()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .parse::<usize>()
        .map_err(|_| ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    normalize: Option<NormalizePatch>,
    analysis: Option<AnalysisPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct NormalizePatch {
    date_format: Option<String>,
    missing_markers: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct AnalysisPatch {
    top_n: Option<i64>,
    max_distinct_products_per_customer: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
