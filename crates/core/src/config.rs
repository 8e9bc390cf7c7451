use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::model::{default_models, ModelSpec};

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub catalog: CatalogConfig,
    pub sessions: SessionConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub base_url: String,
    pub timeout_secs: u64,
    pub cache_ttl_secs: u64,
    pub strategy: CatalogStrategy,
    pub image_base_url: String,
    pub description_limit: usize,
    pub models: Vec<ModelSpec>,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub idle_ttl_secs: u64,
    pub sweep_interval_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// How facet names are produced after the bulk accessory fetch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogStrategy {
    /// Derive type and subtype names from the fetched records.
    #[default]
    Bulk,
    /// Name facets from the backend's type and subtype reference lists.
    Endpoint,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    Disabled,
    Ollama,
    #[serde(rename = "openai")]
    OpenAi,
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
    pub catalog_base_url: Option<String>,
    pub catalog_strategy: Option<CatalogStrategy>,
    pub log_level: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub server_port: Option<u16>,
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
            catalog: CatalogConfig {
                base_url: "http://localhost:8080/api".to_string(),
                timeout_secs: 15,
                cache_ttl_secs: 300,
                strategy: CatalogStrategy::Bulk,
                image_base_url: "http://localhost:8080/images".to_string(),
                description_limit: 150,
                models: default_models(),
            },
            sessions: SessionConfig { idle_ttl_secs: 1_800, sweep_interval_secs: 60 },
            llm: LlmConfig {
                provider: LlmProvider::Disabled,
                api_key: None,
                base_url: Some("http://localhost:11434".to_string()),
                model: "llama3.1".to_string(),
                timeout_secs: 30,
                max_retries: 2,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 4000,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl CatalogStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bulk => "bulk",
            Self::Endpoint => "endpoint",
        }
    }
}

impl std::str::FromStr for CatalogStrategy {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "bulk" => Ok(Self::Bulk),
            "endpoint" => Ok(Self::Endpoint),
            other => Err(ConfigError::Validation(format!(
                "unsupported catalog strategy `{other}` (expected bulk|endpoint)"
            ))),
        }
    }
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "disabled" | "none" => Ok(Self::Disabled),
            "ollama" => Ok(Self::Ollama),
            "openai" => Ok(Self::OpenAi),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected disabled|ollama|openai)"
            ))),
        }
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

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("kitfinder.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(catalog) = patch.catalog {
            if let Some(base_url) = catalog.base_url {
                self.catalog.base_url = base_url;
            }
            if let Some(timeout_secs) = catalog.timeout_secs {
                self.catalog.timeout_secs = timeout_secs;
            }
            if let Some(cache_ttl_secs) = catalog.cache_ttl_secs {
                self.catalog.cache_ttl_secs = cache_ttl_secs;
            }
            if let Some(strategy) = catalog.strategy {
                self.catalog.strategy = strategy;
            }
            if let Some(image_base_url) = catalog.image_base_url {
                self.catalog.image_base_url = image_base_url;
            }
            if let Some(description_limit) = catalog.description_limit {
                self.catalog.description_limit = description_limit;
            }
            if let Some(models) = catalog.models {
                self.catalog.models = models
                    .into_iter()
                    .map(|model| ModelSpec::new(model.key, model.catalog_id, model.years))
                    .collect();
            }
        }

        if let Some(sessions) = patch.sessions {
            if let Some(idle_ttl_secs) = sessions.idle_ttl_secs {
                self.sessions.idle_ttl_secs = idle_ttl_secs;
            }
            if let Some(sweep_interval_secs) = sessions.sweep_interval_secs {
                self.sessions.sweep_interval_secs = sweep_interval_secs;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(model) = llm.model {
                self.llm.model = model;
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = timeout_secs;
            }
            if let Some(max_retries) = llm.max_retries {
                self.llm.max_retries = max_retries;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
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
        if let Some(value) = read_env("KITFINDER_CATALOG_BASE_URL") {
            self.catalog.base_url = value;
        }
        if let Some(value) = read_env("KITFINDER_CATALOG_TIMEOUT_SECS") {
            self.catalog.timeout_secs = parse_u64("KITFINDER_CATALOG_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("KITFINDER_CATALOG_CACHE_TTL_SECS") {
            self.catalog.cache_ttl_secs = parse_u64("KITFINDER_CATALOG_CACHE_TTL_SECS", &value)?;
        }
        if let Some(value) = read_env("KITFINDER_CATALOG_STRATEGY") {
            self.catalog.strategy = value.parse()?;
        }
        if let Some(value) = read_env("KITFINDER_CATALOG_IMAGE_BASE_URL") {
            self.catalog.image_base_url = value;
        }
        if let Some(value) = read_env("KITFINDER_CATALOG_DESCRIPTION_LIMIT") {
            self.catalog.description_limit =
                parse_usize("KITFINDER_CATALOG_DESCRIPTION_LIMIT", &value)?;
        }

        if let Some(value) = read_env("KITFINDER_SESSIONS_IDLE_TTL_SECS") {
            self.sessions.idle_ttl_secs = parse_u64("KITFINDER_SESSIONS_IDLE_TTL_SECS", &value)?;
        }
        if let Some(value) = read_env("KITFINDER_SESSIONS_SWEEP_INTERVAL_SECS") {
            self.sessions.sweep_interval_secs =
                parse_u64("KITFINDER_SESSIONS_SWEEP_INTERVAL_SECS", &value)?;
        }

        if let Some(value) = read_env("KITFINDER_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("KITFINDER_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("KITFINDER_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("KITFINDER_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("KITFINDER_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("KITFINDER_LLM_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("KITFINDER_LLM_MAX_RETRIES") {
            self.llm.max_retries = parse_u32("KITFINDER_LLM_MAX_RETRIES", &value)?;
        }

        if let Some(value) = read_env("KITFINDER_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("KITFINDER_SERVER_PORT").or_else(|| read_env("PORT")) {
            self.server.port = parse_u16("KITFINDER_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("KITFINDER_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("KITFINDER_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level =
            read_env("KITFINDER_LOGGING_LEVEL").or_else(|| read_env("KITFINDER_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("KITFINDER_LOGGING_FORMAT").or_else(|| read_env("KITFINDER_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(base_url) = overrides.catalog_base_url {
            self.catalog.base_url = base_url;
        }
        if let Some(strategy) = overrides.catalog_strategy {
            self.catalog.strategy = strategy;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(port) = overrides.server_port {
            self.server.port = port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_catalog(&self.catalog)?;
        validate_sessions(&self.sessions)?;
        validate_llm(&self.llm)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }

    /// Effective configuration as JSON with secrets replaced.
    pub fn redacted(&self) -> serde_json::Value {
        serde_json::json!({
            "catalog": {
                "base_url": self.catalog.base_url,
                "timeout_secs": self.catalog.timeout_secs,
                "cache_ttl_secs": self.catalog.cache_ttl_secs,
                "strategy": self.catalog.strategy.as_str(),
                "image_base_url": self.catalog.image_base_url,
                "description_limit": self.catalog.description_limit,
                "models": self.catalog.models,
            },
            "sessions": {
                "idle_ttl_secs": self.sessions.idle_ttl_secs,
                "sweep_interval_secs": self.sessions.sweep_interval_secs,
            },
            "llm": {
                "provider": self.llm.provider.as_str(),
                "api_key": self.llm.api_key.as_ref().map(|_| "[redacted]"),
                "base_url": self.llm.base_url,
                "model": self.llm.model,
                "timeout_secs": self.llm.timeout_secs,
                "max_retries": self.llm.max_retries,
            },
            "server": {
                "bind_address": self.server.bind_address,
                "port": self.server.port,
                "graceful_shutdown_secs": self.server.graceful_shutdown_secs,
            },
            "logging": {
                "level": self.logging.level,
                "format": self.logging.format,
            },
        })
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("kitfinder.toml"), PathBuf::from("config/kitfinder.toml")]
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

fn validate_catalog(catalog: &CatalogConfig) -> Result<(), ConfigError> {
    validate_http_url("catalog.base_url", &catalog.base_url)?;
    validate_http_url("catalog.image_base_url", &catalog.image_base_url)?;

    if catalog.timeout_secs == 0 || catalog.timeout_secs > 120 {
        return Err(ConfigError::Validation(
            "catalog.timeout_secs must be in range 1..=120".to_string(),
        ));
    }

    if catalog.description_limit == 0 {
        return Err(ConfigError::Validation(
            "catalog.description_limit must be greater than zero".to_string(),
        ));
    }

    if catalog.models.is_empty() {
        return Err(ConfigError::Validation(
            "catalog.models must list at least one model".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for model in &catalog.models {
        let key = model.key.trim();
        if key.is_empty() || key != key.to_lowercase() {
            return Err(ConfigError::Validation(format!(
                "catalog.models key `{}` must be a non-empty lower-case token",
                model.key
            )));
        }
        if !seen.insert(key) {
            return Err(ConfigError::Validation(format!(
                "catalog.models key `{key}` is listed more than once"
            )));
        }
        if model.years.is_empty() {
            return Err(ConfigError::Validation(format!(
                "catalog.models entry `{key}` must list at least one year"
            )));
        }
    }

    Ok(())
}

fn validate_sessions(sessions: &SessionConfig) -> Result<(), ConfigError> {
    if sessions.idle_ttl_secs == 0 {
        return Err(ConfigError::Validation(
            "sessions.idle_ttl_secs must be greater than zero".to_string(),
        ));
    }

    if sessions.sweep_interval_secs == 0 {
        return Err(ConfigError::Validation(
            "sessions.sweep_interval_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if llm.timeout_secs == 0 || llm.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "llm.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    match llm.provider {
        LlmProvider::Disabled => {}
        LlmProvider::OpenAi => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for the openai provider".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for the ollama provider".to_string(),
                ));
            }
        }
    }

    if let Some(base_url) = &llm.base_url {
        validate_http_url("llm.base_url", base_url)?;
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    if value.starts_with("http://") || value.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::Validation(format!("{field} must start with http:// or https://")))
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    catalog: Option<CatalogPatch>,
    sessions: Option<SessionPatch>,
    llm: Option<LlmPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct CatalogPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
    cache_ttl_secs: Option<u64>,
    strategy: Option<CatalogStrategy>,
    image_base_url: Option<String>,
    description_limit: Option<usize>,
    models: Option<Vec<ModelPatch>>,
}

#[derive(Debug, Deserialize)]
struct ModelPatch {
    key: String,
    catalog_id: u32,
    years: Vec<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    idle_ttl_secs: Option<u64>,
    sweep_interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
    max_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{
        AppConfig, CatalogStrategy, ConfigError, ConfigOverrides, LlmProvider, LoadOptions,
        LogFormat,
    };

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_carry_the_six_known_models() -> Result<(), String> {
        let config = AppConfig::default();
        config.validate().map_err(|err| format!("defaults should validate: {err}"))?;

        let keys = config.catalog.models.iter().map(|model| model.key.as_str()).collect::<Vec<_>>();
        ensure(
            keys == ["alcazar", "i20", "creta", "venue", "aura", "nios"],
            "default model table should list the six models in match order",
        )?;
        ensure(config.catalog.timeout_secs == 15, "catalog timeout should default to 15s")?;
        ensure(config.catalog.cache_ttl_secs == 300, "cache ttl should default to five minutes")?;
        ensure(config.catalog.strategy == CatalogStrategy::Bulk, "bulk strategy by default")?;
        ensure(config.llm.provider == LlmProvider::Disabled, "llm disabled by default")
    }

    #[test]
    fn file_load_supports_env_interpolation_and_model_tables() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_KITFINDER_BACKEND", "https://catalog.example.test/api");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("kitfinder.toml");
            fs::write(
                &path,
                r#"
[catalog]
base_url = "${TEST_KITFINDER_BACKEND}"
strategy = "endpoint"

[[catalog.models]]
key = "creta"
catalog_id = 36
years = [2024, 2023]
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.catalog.base_url == "https://catalog.example.test/api",
                "base url should be interpolated from environment",
            )?;
            ensure(
                config.catalog.strategy == CatalogStrategy::Endpoint,
                "strategy should be read from file",
            )?;
            ensure(config.catalog.models.len() == 1, "file model table replaces defaults")?;
            ensure(
                config.catalog.models[0].years == vec![2023, 2024],
                "model years should be sorted",
            )?;
            Ok(())
        })();

        clear_vars(&["TEST_KITFINDER_BACKEND"]);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("KITFINDER_LOG_LEVEL", "warn");
        env::set_var("KITFINDER_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(&["KITFINDER_LOG_LEVEL", "KITFINDER_LOG_FORMAT"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("KITFINDER_CATALOG_BASE_URL", "http://from-env.test");
        env::set_var("KITFINDER_SERVER_PORT", "4100");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("kitfinder.toml");
            fs::write(
                &path,
                r#"
[catalog]
base_url = "http://from-file.test"
cache_ttl_secs = 60

[server]
port = 4200

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    catalog_base_url: Some("http://from-override.test".to_string()),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.catalog.base_url == "http://from-override.test",
                "override base url should win",
            )?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.server.port == 4100, "env port should win over file")?;
            ensure(config.catalog.cache_ttl_secs == 60, "file ttl should win over default")?;
            Ok(())
        })();

        clear_vars(&["KITFINDER_CATALOG_BASE_URL", "KITFINDER_SERVER_PORT"]);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("KITFINDER_CATALOG_TIMEOUT_SECS", "600");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("catalog.timeout_secs")
            );
            ensure(has_message, "validation failure should mention catalog.timeout_secs")
        })();

        clear_vars(&["KITFINDER_CATALOG_TIMEOUT_SECS"]);
        result
    }

    #[test]
    fn duplicate_model_keys_are_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
        let path = dir.path().join("kitfinder.toml");
        fs::write(
            &path,
            r#"
[[catalog.models]]
key = "creta"
catalog_id = 36
years = [2024]

[[catalog.models]]
key = "creta"
catalog_id = 40
years = [2023]
"#,
        )
        .map_err(|err| err.to_string())?;

        let result = AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() });
        ensure(
            matches!(result, Err(ConfigError::Validation(ref message)) if message.contains("more than once")),
            "duplicate model keys should fail validation",
        )
    }

    #[test]
    fn invalid_numeric_env_override_is_reported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("KITFINDER_CATALOG_CACHE_TTL_SECS", "five");

        let result = (|| -> Result<(), String> {
            let error = AppConfig::load(LoadOptions::default())
                .err()
                .ok_or_else(|| "expected invalid override failure".to_string())?;
            ensure(
                matches!(
                    error,
                    ConfigError::InvalidEnvOverride { ref key, .. }
                        if key == "KITFINDER_CATALOG_CACHE_TTL_SECS"
                ),
                "invalid override should name the variable",
            )
        })();

        clear_vars(&["KITFINDER_CATALOG_CACHE_TTL_SECS"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug_or_redaction() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("KITFINDER_LLM_PROVIDER", "openai");
        env::set_var("KITFINDER_LLM_API_KEY", "sk-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");
            let redacted = config.redacted().to_string();

            ensure(!debug.contains("sk-secret-value"), "debug output should not contain api key")?;
            ensure(
                !redacted.contains("sk-secret-value"),
                "redacted output should not contain api key",
            )?;
            ensure(
                config.llm.api_key.as_ref().map(|key| key.expose_secret() == "sk-secret-value")
                    == Some(true),
                "api key should still be readable when exposed",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["KITFINDER_LLM_PROVIDER", "KITFINDER_LLM_API_KEY"]);
        result
    }

    #[test]
    fn openai_without_key_fails_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let result = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                llm_provider: Some(LlmProvider::OpenAi),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        ensure(
            matches!(result, Err(ConfigError::Validation(ref message)) if message.contains("llm.api_key")),
            "openai provider without key should fail validation",
        )
    }
}
