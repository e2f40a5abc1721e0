use serde::Serialize;
use thiserror::Error;

/// Structural problems with the input table. Fatal: normalization does not run.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("input is missing required column(s) {}; {rows} row(s) were not processed", .columns.join(", "))]
    MissingColumns { columns: Vec<String>, rows: usize },
}

/// A single analysis could not produce a result. Never escapes the analysis it
/// belongs to; the assembler records it next to the sibling results.
#[derive(Clone, Debug, Error, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ComputationError {
    #[error("group `{key}` has no transactions, {metric} is undefined")]
    EmptyGroup { key: String, metric: &'static str },
    #[error("{metric} overflowed while reducing group `{key}`")]
    Overflow { key: String, metric: &'static str },
    #[error("{metric} division failed for group `{key}`")]
    DivisionFailed { key: String, metric: &'static str },
    #[error("analysis panicked: {message}")]
    Panicked { message: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl EngineError {
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Schema(_) => "schema",
            Self::Configuration(_) => "config_validation",
        }
    }

    /// Process exit code used by the command line surface.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Schema(_) | Self::Configuration(_) => 2,
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Schema(_) => {
                "The input is missing required columns. Check the file header and try again."
            }
            Self::Configuration(_) => "The engine configuration is invalid.",
        }
    }
}

/// Why a raw row was dropped during normalization.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    InvalidDate,
    Duplicate,
    MissingField,
    InvalidValue,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidDate => "invalid_date",
            Self::Duplicate => "duplicate",
            Self::MissingField => "missing_field",
            Self::InvalidValue => "invalid_value",
        }
    }
}

/// Non-fatal row-level finding. `row` is the zero-based data row index
/// (header excluded).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ParseWarning {
    pub row: usize,
    pub column: Option<String>,
    pub kind: WarningKind,
    pub detail: String,
}
