use std::process::ExitCode;

use clap::Parser;
use saleslens_cli::Cli;
use saleslens_core::config::LoggingConfig;

fn init_logging(logging: &LoggingConfig) {
    use saleslens_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    match logging.format {
        Compact => builder.compact().init(),
        Pretty => builder.pretty().init(),
        Json => builder.json().init(),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&saleslens_cli::logging_config(cli.config_path()));
    saleslens_cli::install_panic_hook();

    saleslens_cli::execute(&cli)
}
