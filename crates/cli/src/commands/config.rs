use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use kitfinder_core::config::{AppConfig, LoadOptions};
use toml::Value;

pub fn run(json_output: bool) -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return format!("config validation failed: {error}"),
    };

    if json_output {
        return serde_json::to_string_pretty(&config.redacted())
            .unwrap_or_else(|error| format!("config serialization failed: {error}"));
    }

    let config_file_path = detect_config_path();
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());
    let source = |key_path: &str, env_keys: &[&str]| {
        field_source(key_path, env_keys, config_file_doc.as_ref(), config_file_path.as_deref())
    };

    let model_keys =
        config.catalog.models.iter().map(|model| model.key.as_str()).collect::<Vec<_>>();
    let llm_api_key = if config.llm.api_key.is_some() { "<redacted>" } else { "<unset>" };

    let fields: Vec<(&str, String, Vec<&str>)> = vec![
        ("catalog.base_url", config.catalog.base_url.clone(), vec!["KITFINDER_CATALOG_BASE_URL"]),
        (
            "catalog.timeout_secs",
            config.catalog.timeout_secs.to_string(),
            vec!["KITFINDER_CATALOG_TIMEOUT_SECS"],
        ),
        (
            "catalog.cache_ttl_secs",
            config.catalog.cache_ttl_secs.to_string(),
            vec!["KITFINDER_CATALOG_CACHE_TTL_SECS"],
        ),
        (
            "catalog.strategy",
            config.catalog.strategy.as_str().to_string(),
            vec!["KITFINDER_CATALOG_STRATEGY"],
        ),
        (
            "catalog.image_base_url",
            config.catalog.image_base_url.clone(),
            vec!["KITFINDER_CATALOG_IMAGE_BASE_URL"],
        ),
        (
            "catalog.description_limit",
            config.catalog.description_limit.to_string(),
            vec!["KITFINDER_CATALOG_DESCRIPTION_LIMIT"],
        ),
        ("catalog.models", model_keys.join(", "), vec![]),
        (
            "sessions.idle_ttl_secs",
            config.sessions.idle_ttl_secs.to_string(),
            vec!["KITFINDER_SESSIONS_IDLE_TTL_SECS"],
        ),
        (
            "sessions.sweep_interval_secs",
            config.sessions.sweep_interval_secs.to_string(),
            vec!["KITFINDER_SESSIONS_SWEEP_INTERVAL_SECS"],
        ),
        ("llm.provider", config.llm.provider.as_str().to_string(), vec!["KITFINDER_LLM_PROVIDER"]),
        ("llm.model", config.llm.model.clone(), vec!["KITFINDER_LLM_MODEL"]),
        (
            "llm.base_url",
            config.llm.base_url.clone().unwrap_or_else(|| "<unset>".to_string()),
            vec!["KITFINDER_LLM_BASE_URL"],
        ),
        ("llm.api_key", llm_api_key.to_string(), vec!["KITFINDER_LLM_API_KEY"]),
        ("llm.max_retries", config.llm.max_retries.to_string(), vec!["KITFINDER_LLM_MAX_RETRIES"]),
        (
            "server.bind_address",
            config.server.bind_address.clone(),
            vec!["KITFINDER_SERVER_BIND_ADDRESS"],
        ),
        ("server.port", config.server.port.to_string(), vec!["KITFINDER_SERVER_PORT", "PORT"]),
        (
            "logging.level",
            config.logging.level.clone(),
            vec!["KITFINDER_LOGGING_LEVEL", "KITFINDER_LOG_LEVEL"],
        ),
        (
            "logging.format",
            format!("{:?}", config.logging.format).to_lowercase(),
            vec!["KITFINDER_LOGGING_FORMAT", "KITFINDER_LOG_FORMAT"],
        ),
    ];

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for (key, value, env_keys) in fields {
        lines.push(render_line(key, &value, source(key, env_keys.as_slice())));
    }
    lines.join("\n")
}

fn detect_config_path() -> Option<PathBuf> {
    [PathBuf::from("kitfinder.toml"), PathBuf::from("config/kitfinder.toml")]
        .into_iter()
        .find(|path| path.exists())
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
    if let Some(env_key) = env_keys.iter().find(|key| env::var_os(key).is_some()) {
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
