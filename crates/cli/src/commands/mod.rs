pub mod analyze;
pub mod config;
pub mod input;
pub mod products;
pub mod search;

use std::path::{Path, PathBuf};

use saleslens_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use saleslens_core::{Engine, EngineError, Normalized};
use serde::Serialize;

pub const EXIT_OK: u8 = 0;
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_PARTIAL: u8 = 3;
pub const EXIT_INPUT: u8 = 4;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome<'a, T: Serialize> {
    command: &'a str,
    status: &'a str,
    error_class: Option<&'a str>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::with_data::<()>(command, "ok", None, message, None, EXIT_OK)
    }

    pub fn report<T: Serialize>(command: &str, message: impl Into<String>, data: T) -> Self {
        Self::with_data(command, "ok", None, message, Some(data), EXIT_OK)
    }

    /// Some analyses failed; the data that could be computed is still emitted.
    pub fn partial<T: Serialize>(command: &str, message: impl Into<String>, data: T) -> Self {
        Self::with_data(command, "partial", Some("computation"), message, Some(data), EXIT_PARTIAL)
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        Self::with_data::<()>(command, "error", Some(error_class), message, None, exit_code)
    }

    fn with_data<T: Serialize>(
        command: &str,
        status: &str,
        error_class: Option<&str>,
        message: impl Into<String>,
        data: Option<T>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome { command, status, error_class, message: message.into(), data };
        Self { exit_code, output: serialize_payload(&payload) }
    }
}

fn serialize_payload<T: Serialize>(payload: &T) -> String {
    serde_json::to_string_pretty(payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

pub fn load_options(config_path: Option<&Path>, overrides: ConfigOverrides) -> LoadOptions {
    LoadOptions {
        config_path: config_path.map(Path::to_path_buf),
        require_file: config_path.is_some(),
        overrides,
    }
}

pub(crate) fn load_config(
    command: &str,
    config_path: Option<&Path>,
    overrides: ConfigOverrides,
) -> Result<AppConfig, CommandResult> {
    AppConfig::load(load_options(config_path, overrides)).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })
}

pub(crate) fn engine_failure(command: &str, error: &EngineError) -> CommandResult {
    CommandResult::failure(
        command,
        error.error_class(),
        format!("{} ({error})", error.user_message()),
        error.exit_code(),
    )
}

/// Loads config, reads the CSV and normalizes it. Shared by the query commands.
pub(crate) fn load_records(
    command: &str,
    config_path: Option<&Path>,
    csv_path: &Path,
) -> Result<Normalized, CommandResult> {
    let config = load_config(command, config_path, ConfigOverrides::default())?;
    let engine = Engine::from_config(&config).map_err(|error| engine_failure(command, &error))?;
    let table = input::read_table(csv_path).map_err(|error| input_failure(command, &error))?;
    engine
        .normalizer()
        .normalize(&table)
        .map_err(|error| engine_failure(command, &EngineError::from(error)))
}

pub(crate) fn input_failure(command: &str, error: &anyhow::Error) -> CommandResult {
    CommandResult::failure(command, "input", format!("{error:#}"), EXIT_INPUT)
}

/// Config file locations checked when no `--config` is given.
pub(crate) fn default_config_paths() -> [PathBuf; 2] {
    [PathBuf::from("saleslens.toml"), PathBuf::from("config/saleslens.toml")]
}
