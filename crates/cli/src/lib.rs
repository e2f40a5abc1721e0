pub mod commands;

use clap::{Parser, Subcommand};
use saleslens_core::config::{AppConfig, ConfigOverrides, LoggingConfig};
use saleslens_core::panic_message;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(
    name = "saleslens",
    about = "SalesLens sales analytics CLI",
    long_about = "Normalize a retail transaction CSV and print ranked sales summaries, product tables and product searches as JSON.",
    after_help = "Examples:\n  saleslens analyze sales.csv --top-n 5\n  saleslens products sales.csv\n  saleslens search sales.csv milk\n  saleslens config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Config file to load instead of saleslens.toml")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Run every analysis and print the report")]
    Analyze {
        path: PathBuf,
        #[arg(long, allow_negative_numbers = true, help = "Entries kept per capped view; 0 or less keeps all")]
        top_n: Option<i64>,
        #[arg(long, help = "Include the normalized records in the report")]
        include_records: bool,
    },
    #[command(about = "Print the product catalog with quantity and sales totals")]
    Products { path: PathBuf },
    #[command(about = "Search products by name with regional and monthly breakdowns")]
    Search { path: PathBuf, term: String },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
}

impl Cli {
    pub fn config_path(&self) -> Option<&Path> {
        self.config.as_deref()
    }
}

/// Logging settings resolved the same way the commands resolve config. Falls
/// back to defaults when loading fails; the command reports that error itself.
pub fn logging_config(config_path: Option<&Path>) -> LoggingConfig {
    AppConfig::load(commands::load_options(config_path, ConfigOverrides::default()))
        .map(|config| config.logging)
        .unwrap_or_else(|_| AppConfig::default().logging)
}

/// Replaces the default panic hook so panic reports, including those from
/// analyses the engine isolates, go to the configured log output.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|location| format!("{}:{}", location.file(), location.line()))
            .unwrap_or_default();
        tracing::error!(
            event_name = "process.panic",
            location = %location,
            reason = %panic_message(info.payload()),
            "panicked"
        );
    }));
}

pub fn execute(cli: &Cli) -> ExitCode {
    let config_path = cli.config_path();

    let result = match &cli.command {
        Command::Analyze { path, top_n, include_records } => commands::analyze::run(
            path,
            config_path,
            &commands::analyze::AnalyzeOptions { top_n: *top_n, include_records: *include_records },
        ),
        Command::Products { path } => commands::products::run(path, config_path),
        Command::Search { path, term } => commands::search::run(path, config_path, term),
        Command::Config => commands::config::run(config_path),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
