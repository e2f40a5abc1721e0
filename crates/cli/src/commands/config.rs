use std::fs;
use std::path::{Path, PathBuf};

use saleslens_core::config::{read_env, AppConfig, ConfigOverrides, LogFormat};
use toml::Value;

use crate::commands::{default_config_paths, load_config, CommandResult};

pub fn run(config_path: Option<&Path>) -> CommandResult {
    let config = match load_config("config", config_path, ConfigOverrides::default()) {
        Ok(config) => config,
        Err(result) => return result,
    };

    let file_path = detect_config_path(config_path);
    let file_doc = load_config_file_doc(file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, file_doc.as_ref(), file_path.as_deref())
    };

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in entries(&config) {
        lines.push(render_line(key, &value, source(key, env_keys)));
    }

    CommandResult::success("config", lines.join("\n"))
}

fn entries(config: &AppConfig) -> Vec<(&'static str, String, &'static [&'static str])> {
    let top_n = match config.analysis.top_n {
        0 => "0 (all)".to_string(),
        n => n.to_string(),
    };
    let max_distinct = match config.analysis.max_distinct_products_per_customer {
        0 => "0 (unlimited)".to_string(),
        n => n.to_string(),
    };
    let log_format = match config.logging.format {
        LogFormat::Compact => "compact",
        LogFormat::Pretty => "pretty",
        LogFormat::Json => "json",
    };

    let entries: [(&'static str, String, &'static [&'static str]); 6] = [
        (
            "normalize.date_format",
            config.normalize.date_format.clone(),
            &["SALESLENS_NORMALIZE_DATE_FORMAT"],
        ),
        (
            "normalize.missing_markers",
            format!("[{}]", config.normalize.missing_markers.join(", ")),
            &["SALESLENS_NORMALIZE_MISSING_MARKERS"],
        ),
        ("analysis.top_n", top_n, &["SALESLENS_ANALYSIS_TOP_N"]),
        (
            "analysis.max_distinct_products_per_customer",
            max_distinct,
            &["SALESLENS_ANALYSIS_MAX_DISTINCT_PRODUCTS"],
        ),
        (
            "logging.level",
            config.logging.level.clone(),
            &["SALESLENS_LOGGING_LEVEL", "SALESLENS_LOG_LEVEL"],
        ),
        (
            "logging.format",
            log_format.to_string(),
            &["SALESLENS_LOGGING_FORMAT", "SALESLENS_LOG_FORMAT"],
        ),
    ];
    entries.into()
}

fn detect_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return path.exists().then(|| path.to_path_buf());
    }
    default_config_paths().into_iter().find(|path| path.exists())
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    if let Some(env_key) = env_keys.iter().find(|key| read_env(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

#[cfg(test)]
mod tests {
    use super::contains_path;

    #[test]
    fn contains_path_walks_nested_tables() {
        let doc: toml::Value = "[analysis]\ntop_n = 5\n".parse().expect("valid toml");
        assert!(contains_path(&doc, "analysis.top_n"));
        assert!(!contains_path(&doc, "analysis.max_distinct_products_per_customer"));
        assert!(!contains_path(&doc, "logging.level"));
    }
}
