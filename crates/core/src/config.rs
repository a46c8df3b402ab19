use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub automation: AutomationConfig,
    pub backend: BackendConfig,
    pub llm: LlmConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Remote automation service every state-changing operation goes through.
#[derive(Clone, Debug)]
pub struct AutomationConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

/// Authoritative entity source: credential exchange plus entity listing.
#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub base_url: String,
    pub email: Option<String>,
    pub password: Option<SecretString>,
    pub entity_limit: u32,
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub max_upload_mb: u32,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    OpenAi,
    Anthropic,
    Ollama,
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
    pub log_level: Option<String>,
    pub automation_base_url: Option<String>,
    pub backend_base_url: Option<String>,
    pub backend_email: Option<String>,
    pub backend_password: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_model: Option<String>,
    pub llm_api_key: Option<String>,
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
            automation: AutomationConfig {
                base_url: "http://localhost:3000".to_string(),
                timeout_secs: 60,
            },
            backend: BackendConfig {
                base_url: "http://localhost:4000".to_string(),
                email: None,
                password: None,
                entity_limit: 100,
            },
            llm: LlmConfig {
                provider: LlmProvider::Ollama,
                api_key: None,
                base_url: Some("http://localhost:11434".to_string()),
                model: "llama3.1".to_string(),
                timeout_secs: 120,
            },
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8000,
                allowed_origins: vec!["http://localhost:8000".to_string()],
                max_upload_mb: 25,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|anthropic|ollama)"
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
    /// Precedence, lowest to highest: defaults, TOML patch file, `SCRIVEN_*`
    /// environment overrides, programmatic overrides. Validation runs last.
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("scriven.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(automation) = patch.automation {
            if let Some(base_url) = automation.base_url {
                self.automation.base_url = base_url;
            }
            if let Some(timeout_secs) = automation.timeout_secs {
                self.automation.timeout_secs = timeout_secs;
            }
        }

        if let Some(backend) = patch.backend {
            if let Some(base_url) = backend.base_url {
                self.backend.base_url = base_url;
            }
            if let Some(email) = backend.email {
                self.backend.email = Some(email);
            }
            if let Some(password) = backend.password {
                self.backend.password = Some(password.into());
            }
            if let Some(entity_limit) = backend.entity_limit {
                self.backend.entity_limit = entity_limit;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(api_key) = llm.api_key {
                self.llm.api_key = Some(api_key.into());
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
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(allowed_origins) = server.allowed_origins {
                self.server.allowed_origins = allowed_origins;
            }
            if let Some(max_upload_mb) = server.max_upload_mb {
                self.server.max_upload_mb = max_upload_mb;
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
        if let Some(value) = read_env("SCRIVEN_AUTOMATION_BASE_URL") {
            self.automation.base_url = value;
        }
        if let Some(value) = read_env("SCRIVEN_AUTOMATION_TIMEOUT_SECS") {
            self.automation.timeout_secs = parse_u64("SCRIVEN_AUTOMATION_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SCRIVEN_BACKEND_BASE_URL") {
            self.backend.base_url = value;
        }
        if let Some(value) = read_env("SCRIVEN_BACKEND_EMAIL") {
            self.backend.email = Some(value);
        }
        if let Some(value) = read_env("SCRIVEN_BACKEND_PASSWORD") {
            self.backend.password = Some(value.into());
        }
        if let Some(value) = read_env("SCRIVEN_BACKEND_ENTITY_LIMIT") {
            self.backend.entity_limit = parse_u32("SCRIVEN_BACKEND_ENTITY_LIMIT", &value)?;
        }

        if let Some(value) = read_env("SCRIVEN_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("SCRIVEN_LLM_API_KEY") {
            self.llm.api_key = Some(value.into());
        }
        if let Some(value) = read_env("SCRIVEN_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("SCRIVEN_LLM_MODEL") {
            self.llm.model = value;
        }
        if let Some(value) = read_env("SCRIVEN_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = parse_u64("SCRIVEN_LLM_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SCRIVEN_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SCRIVEN_SERVER_PORT") {
            self.server.port = parse_u16("SCRIVEN_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("SCRIVEN_SERVER_ALLOWED_ORIGINS") {
            self.server.allowed_origins =
                value.split(',').map(|origin| origin.trim().to_string()).collect();
        }
        if let Some(value) = read_env("SCRIVEN_SERVER_MAX_UPLOAD_MB") {
            self.server.max_upload_mb = parse_u32("SCRIVEN_SERVER_MAX_UPLOAD_MB", &value)?;
        }

        let log_level =
            read_env("SCRIVEN_LOGGING_LEVEL").or_else(|| read_env("SCRIVEN_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SCRIVEN_LOGGING_FORMAT").or_else(|| read_env("SCRIVEN_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(automation_base_url) = overrides.automation_base_url {
            self.automation.base_url = automation_base_url;
        }
        if let Some(backend_base_url) = overrides.backend_base_url {
            self.backend.base_url = backend_base_url;
        }
        if let Some(backend_email) = overrides.backend_email {
            self.backend.email = Some(backend_email);
        }
        if let Some(backend_password) = overrides.backend_password {
            self.backend.password = Some(backend_password.into());
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_model) = overrides.llm_model {
            self.llm.model = llm_model;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(llm_api_key.into());
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_automation(&self.automation)?;
        validate_backend(&self.backend)?;
        validate_llm(&self.llm)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("scriven.toml"), PathBuf::from("config/scriven.toml")]
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

fn validate_automation(automation: &AutomationConfig) -> Result<(), ConfigError> {
    if !is_http_url(&automation.base_url) {
        return Err(ConfigError::Validation(
            "automation.base_url must start with http:// or https://".to_string(),
        ));
    }
    if automation.timeout_secs == 0 || automation.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "automation.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    Ok(())
}

fn validate_backend(backend: &BackendConfig) -> Result<(), ConfigError> {
    if !is_http_url(&backend.base_url) {
        return Err(ConfigError::Validation(
            "backend.base_url must start with http:// or https://".to_string(),
        ));
    }
    if backend.entity_limit == 0 || backend.entity_limit > 1000 {
        return Err(ConfigError::Validation(
            "backend.entity_limit must be in range 1..=1000".to_string(),
        ));
    }

    // Credentials are optional (the engine degrades to an empty entity
    // cache), but a lone email or password is a misconfiguration.
    let has_email = backend.email.as_deref().is_some_and(|email| !email.trim().is_empty());
    let has_password = backend
        .password
        .as_ref()
        .is_some_and(|password| !password.expose_secret().trim().is_empty());
    if has_email != has_password {
        return Err(ConfigError::Validation(
            "backend.email and backend.password must be configured together".to_string(),
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
        LlmProvider::OpenAi | LlmProvider::Anthropic => {
            let missing = llm
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().trim().is_empty())
                .unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.api_key is required for openai/anthropic providers".to_string(),
                ));
            }
        }
        LlmProvider::Ollama => {
            let missing =
                llm.base_url.as_ref().map(|value| value.trim().is_empty()).unwrap_or(true);
            if missing {
                return Err(ConfigError::Validation(
                    "llm.base_url is required for ollama provider".to_string(),
                ));
            }
        }
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }
    if server.allowed_origins.is_empty() {
        return Err(ConfigError::Validation(
            "server.allowed_origins must list at least one origin".to_string(),
        ));
    }
    for origin in &server.allowed_origins {
        if origin != "*" && !is_http_url(origin) {
            return Err(ConfigError::Validation(format!(
                "server.allowed_origins entry `{origin}` must be `*` or an http(s) origin"
            )));
        }
    }
    if server.max_upload_mb == 0 || server.max_upload_mb > 100 {
        return Err(ConfigError::Validation(
            "server.max_upload_mb must be in range 1..=100".to_string(),
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

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
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

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    automation: Option<AutomationPatch>,
    backend: Option<BackendPatch>,
    llm: Option<LlmPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct AutomationPatch {
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct BackendPatch {
    base_url: Option<String>,
    email: Option<String>,
    password: Option<String>,
    entity_limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    allowed_origins: Option<Vec<String>>,
    max_upload_mb: Option<u32>,
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

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    #[test]
    fn defaults_validate_without_any_configuration() {
        let _guard = env_lock().lock().expect("env lock");
        let config = AppConfig::load(LoadOptions::default()).expect("defaults should validate");
        assert_eq!(config.automation.base_url, "http://localhost:3000");
        assert_eq!(config.backend.entity_limit, 100);
        assert!(config.backend.email.is_none());
    }

    #[test]
    fn file_load_supports_env_interpolation() {
        let _guard = env_lock().lock().expect("env lock");
        env::set_var("TEST_BACKEND_PASSWORD", "hunter2-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("scriven.toml");
            fs::write(
                &path,
                r#"
[backend]
email = "assistant@example.com"
password = "${TEST_BACKEND_PASSWORD}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            let password = config.backend.password.as_ref().ok_or("password missing")?;
            if password.expose_secret() != "hunter2-from-env" {
                return Err("password should be loaded from environment".to_string());
            }
            Ok(())
        })();

        clear_vars(&["TEST_BACKEND_PASSWORD"]);
        result.expect("interpolated config should load");
    }

    #[test]
    fn precedence_defaults_file_env_overrides() {
        let _guard = env_lock().lock().expect("env lock");
        env::set_var("SCRIVEN_AUTOMATION_BASE_URL", "http://from-env:3000");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("scriven.toml");
            fs::write(
                &path,
                r#"
[automation]
base_url = "http://from-file:3000"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            if config.automation.base_url != "http://from-env:3000" {
                return Err("env automation url should win over file".to_string());
            }
            if config.logging.level != "debug" {
                return Err("programmatic log level should win over file".to_string());
            }
            Ok(())
        })();

        clear_vars(&["SCRIVEN_AUTOMATION_BASE_URL"]);
        result.expect("layered config should load");
    }

    #[test]
    fn lone_backend_credential_fails_validation() {
        let _guard = env_lock().lock().expect("env lock");

        let error = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                backend_email: Some("assistant@example.com".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .err()
        .expect("lone email should fail validation");

        assert!(matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("backend.email")
        ));
    }

    #[test]
    fn openai_provider_requires_api_key() {
        let _guard = env_lock().lock().expect("env lock");

        let error = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                llm_provider: Some(super::LlmProvider::OpenAi),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .err()
        .expect("openai without key should fail validation");

        assert!(matches!(
            error,
            ConfigError::Validation(ref message) if message.contains("llm.api_key")
        ));
    }

    #[test]
    fn logging_env_aliases_are_supported() {
        let _guard = env_lock().lock().expect("env lock");
        env::set_var("SCRIVEN_LOG_LEVEL", "warn");
        env::set_var("SCRIVEN_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            if config.logging.level != "warn" {
                return Err("log level alias should apply".to_string());
            }
            if !matches!(config.logging.format, LogFormat::Pretty) {
                return Err("log format alias should apply".to_string());
            }
            Ok(())
        })();

        clear_vars(&["SCRIVEN_LOG_LEVEL", "SCRIVEN_LOG_FORMAT"]);
        result.expect("alias config should load");
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() {
        let _guard = env_lock().lock().expect("env lock");

        let config = AppConfig::load(LoadOptions {
            overrides: ConfigOverrides {
                backend_email: Some("assistant@example.com".to_string()),
                backend_password: Some("secret-password-value".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .expect("config should load");

        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-password-value"));
    }
}
