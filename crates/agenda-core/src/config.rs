//! Configuration management
//!
//! Settings are resolved in this order:
//! 1. Environment variables (a `.env` file is loaded by the binary)
//! 2. `agenda.toml`
//! 3. Defaults
//!
//! `${VAR_NAME}` inside the TOML file is replaced with the environment value.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::dispatcher::{PollPolicy, UnknownFunctionPolicy};
use crate::error::Error;

/// Default config file looked up by [`Config::load`]
pub const DEFAULT_CONFIG_FILE: &str = "agenda.toml";

/// Assistant service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    /// API key
    pub api_key: String,

    /// Model used when the assistant is first created
    pub model: String,

    /// Base URL of the assistant service
    pub base_url: String,

    /// Per-request timeout
    pub request_timeout_secs: u64,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_model(),
            base_url: default_base_url(),
            request_timeout_secs: 120,
        }
    }
}

fn default_model() -> String {
    "gpt-3.5-turbo-1106".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

/// Run polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Delay before the first re-poll
    pub interval_ms: u64,

    /// Multiplier applied to the delay after every pending poll
    pub backoff_factor: f64,

    /// Upper bound for the delay
    pub max_interval_ms: u64,

    /// Give up after this many pending polls
    pub max_attempts: Option<u32>,

    /// Give up after this much wall-clock time
    pub timeout_secs: Option<u64>,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 2000,
            backoff_factor: 1.0,
            max_interval_ms: 30_000,
            max_attempts: None,
            timeout_secs: None,
        }
    }
}

impl PollingConfig {
    /// Convert into the dispatcher's polling policy
    ///
    /// `max_interval_ms` below `interval_ms` is raised to it.
    pub fn policy(&self) -> PollPolicy {
        let mut policy = PollPolicy::exponential(
            Duration::from_millis(self.interval_ms),
            self.backoff_factor,
            Duration::from_millis(self.max_interval_ms),
        );
        if let Some(attempts) = self.max_attempts {
            policy = policy.with_max_attempts(attempts);
        }
        if let Some(secs) = self.timeout_secs {
            policy = policy.with_timeout(Duration::from_secs(secs));
        }
        policy
    }
}

/// Tool dispatch configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// What to do with a tool call naming an unregistered function
    pub unknown_function: UnknownFunctionPolicy,
}

/// Credential store backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// Whole-file JSON object (`tokens.json`)
    #[default]
    Json,
    /// SQLite database
    Sqlite,
}

impl std::str::FromStr for StoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(Error::Config(format!("unknown store backend: {}", other))),
        }
    }
}

/// Calendar configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// User whose credentials are used
    pub user_id: String,

    /// Calendar to operate on
    pub calendar_id: String,

    /// Time zone attached to created events
    pub timezone: String,

    /// OAuth client secrets downloaded from the cloud console
    pub client_secrets_path: String,

    /// JSON credential store (json backend)
    pub token_store_path: String,

    /// SQLite database (sqlite backend)
    pub db_path: String,

    /// Credential store backend
    pub store_backend: StoreBackend,

    /// Calendar REST API base URL
    pub base_url: String,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            calendar_id: "primary".to_string(),
            timezone: "America/Sao_Paulo".to_string(),
            client_secrets_path: "data/credentials.json".to_string(),
            token_store_path: "data/tokens.json".to_string(),
            db_path: "data/agenda.db".to_string(),
            store_backend: StoreBackend::Json,
            base_url: "https://www.googleapis.com/calendar/v3".to_string(),
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub assistant: AssistantConfig,
    pub polling: PollingConfig,
    pub dispatch: DispatchConfig,
    pub calendar: CalendarConfig,

    /// Directory holding the assistant identity file
    pub data_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            assistant: AssistantConfig::default(),
            polling: PollingConfig::default(),
            dispatch: DispatchConfig::default(),
            calendar: CalendarConfig::default(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> String {
    "data".to_string()
}

impl Config {
    /// Replace `${VAR_NAME}` with environment values
    ///
    /// Unset variables expand to an empty string.
    fn expand_env_vars(value: &str) -> String {
        let mut result = String::new();
        let mut chars = value.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '$' && chars.peek() == Some(&'{') {
                chars.next();

                let mut var_name = String::new();
                while let Some(c) = chars.next() {
                    if c == '}' {
                        break;
                    }
                    var_name.push(c);
                }

                if let Ok(env_value) = std::env::var(&var_name) {
                    result.push_str(&env_value);
                }
            } else {
                result.push(c);
            }
        }

        result
    }

    /// Load from a TOML file, then apply environment overrides
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();

        let toml_content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;

        let mut cfg = Self::from_toml_str(&toml_content)?;
        cfg.apply_env_overrides()?;
        cfg.validate()?;

        Ok(cfg)
    }

    /// Parse TOML content (with `${VAR}` expansion) without env overrides
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let expanded_content = Self::expand_env_vars(content);

        let toml: TomlConfig = toml::from_str(&expanded_content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;

        Ok(Self {
            assistant: toml.assistant.unwrap_or_default(),
            polling: toml.polling.unwrap_or_default(),
            dispatch: toml.dispatch.unwrap_or_default(),
            calendar: toml.calendar.unwrap_or_default(),
            data_dir: toml.data_dir.unwrap_or_else(default_data_dir),
        })
    }

    /// Load from `agenda.toml` if present, otherwise from the environment
    pub fn load() -> crate::Result<Self> {
        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            return Self::from_toml_file(DEFAULT_CONFIG_FILE);
        }

        Self::from_env()
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> crate::Result<Self> {
        let mut cfg = Self::default();
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Override settings with environment variables that are set and non-empty
    fn apply_env_overrides(&mut self) -> crate::Result<()> {
        // Assistant
        if let Some(api_key) = env_non_empty("OPENAI_API_KEY") {
            self.assistant.api_key = api_key;
        }
        if let Some(model) = env_non_empty("ASSISTANT_MODEL") {
            self.assistant.model = model;
        }
        if let Some(base_url) = env_non_empty("ASSISTANT_BASE_URL") {
            self.assistant.base_url = base_url;
        }
        if let Some(dir) = env_non_empty("DATA_DIR") {
            self.data_dir = dir;
        }

        // Polling
        if let Some(ms) = env_parse("POLL_INTERVAL_MS")? {
            self.polling.interval_ms = ms;
        }
        if let Some(factor) = env_parse("POLL_BACKOFF_FACTOR")? {
            self.polling.backoff_factor = factor;
        }
        if let Some(ms) = env_parse("POLL_MAX_INTERVAL_MS")? {
            self.polling.max_interval_ms = ms;
        }
        if let Some(attempts) = env_parse("POLL_MAX_ATTEMPTS")? {
            self.polling.max_attempts = Some(attempts);
        }
        if let Some(secs) = env_parse("POLL_TIMEOUT_SECS")? {
            self.polling.timeout_secs = Some(secs);
        }

        // Dispatch
        if let Some(policy) = env_parse("UNKNOWN_FUNCTION_POLICY")? {
            self.dispatch.unknown_function = policy;
        }

        // Calendar
        if let Some(user_id) = env_non_empty("CALENDAR_USER_ID") {
            self.calendar.user_id = user_id;
        }
        if let Some(calendar_id) = env_non_empty("CALENDAR_ID") {
            self.calendar.calendar_id = calendar_id;
        }
        if let Some(tz) = env_non_empty("CALENDAR_TIMEZONE") {
            self.calendar.timezone = tz;
        }
        if let Some(path) = env_non_empty("CALENDAR_CLIENT_SECRETS") {
            self.calendar.client_secrets_path = path;
        }
        if let Some(path) = env_non_empty("CALENDAR_TOKEN_STORE") {
            self.calendar.token_store_path = path;
        }
        if let Some(path) = env_non_empty("CALENDAR_DB_PATH") {
            self.calendar.db_path = path;
        }
        if let Some(backend) = env_parse("CALENDAR_STORE_BACKEND")? {
            self.calendar.store_backend = backend;
        }

        Ok(())
    }

    /// Reject configurations that cannot work
    pub fn validate(&self) -> crate::Result<()> {
        if self.assistant.api_key.is_empty() {
            return Err(Error::Config("OPENAI_API_KEY not set".to_string()));
        }
        if !self.polling.backoff_factor.is_finite() || self.polling.backoff_factor < 1.0 {
            return Err(Error::Config(format!(
                "polling.backoff_factor must be >= 1.0, got {}",
                self.polling.backoff_factor
            )));
        }
        Ok(())
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(key: &str) -> crate::Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env_non_empty(key)
        .map(|v| {
            v.trim()
                .parse()
                .map_err(|e| Error::Config(format!("invalid {}: {}", key, e)))
        })
        .transpose()
}

// ============================================================================
// TOML file layout
// ============================================================================

#[derive(Debug, Deserialize)]
struct TomlConfig {
    assistant: Option<AssistantConfig>,
    polling: Option<PollingConfig>,
    dispatch: Option<DispatchConfig>,
    calendar: Option<CalendarConfig>,
    data_dir: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assistant_config_default() {
        let config = AssistantConfig::default();
        assert_eq!(config.model, "gpt-3.5-turbo-1106");
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn test_polling_default_matches_fixed_interval() {
        let policy = PollingConfig::default().policy();
        assert_eq!(policy.interval, Duration::from_secs(2));
        assert_eq!(policy.backoff_factor, 1.0);
        assert!(policy.max_attempts.is_none());
        assert!(policy.timeout.is_none());
    }

    #[test]
    fn test_calendar_config_default() {
        let config = CalendarConfig::default();
        assert_eq!(config.calendar_id, "primary");
        assert_eq!(config.timezone, "America/Sao_Paulo");
        assert_eq!(config.store_backend, StoreBackend::Json);
        assert_eq!(config.token_store_path, "data/tokens.json");
    }

    #[test]
    fn test_store_backend_from_str() {
        assert_eq!("SQLite".parse::<StoreBackend>().unwrap(), StoreBackend::Sqlite);
        assert_eq!("json".parse::<StoreBackend>().unwrap(), StoreBackend::Json);
        assert!("redis".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_expand_env_vars() {
        unsafe {
            std::env::set_var("AGENDA_TEST_VAR", "test_value");
        }

        let result = Config::expand_env_vars("prefix_${AGENDA_TEST_VAR}_suffix");
        assert_eq!(result, "prefix_test_value_suffix");

        let result = Config::expand_env_vars("prefix_${AGENDA_NONEXISTENT_VAR}_suffix");
        assert_eq!(result, "prefix__suffix");

        unsafe {
            std::env::remove_var("AGENDA_TEST_VAR");
        }
    }

    #[test]
    fn test_expand_env_vars_no_braces() {
        assert_eq!(Config::expand_env_vars("no_vars_here $HOME"), "no_vars_here $HOME");
    }

    #[test]
    fn test_toml_config_parsing() {
        let toml_content = r#"
data_dir = "/var/lib/agenda"

[assistant]
api_key = "sk-test"
model = "gpt-4o-mini"

[polling]
interval_ms = 500
backoff_factor = 2.0
max_attempts = 10

[dispatch]
unknown_function = "report_error"

[calendar]
user_id = "11996046537"
store_backend = "sqlite"
"#;

        let config = Config::from_toml_str(toml_content).unwrap();

        assert_eq!(config.data_dir, "/var/lib/agenda");
        assert_eq!(config.assistant.api_key, "sk-test");
        assert_eq!(config.assistant.model, "gpt-4o-mini");
        assert_eq!(config.assistant.base_url, "https://api.openai.com/v1");
        assert_eq!(config.polling.interval_ms, 500);
        assert_eq!(config.polling.max_attempts, Some(10));
        assert_eq!(config.polling.max_interval_ms, 30_000);
        assert_eq!(config.dispatch.unknown_function, UnknownFunctionPolicy::ReportError);
        assert_eq!(config.calendar.user_id, "11996046537");
        assert_eq!(config.calendar.store_backend, StoreBackend::Sqlite);
        assert_eq!(config.calendar.calendar_id, "primary");
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config.data_dir, "data");
        assert_eq!(config.dispatch.unknown_function, UnknownFunctionPolicy::FailFast);
    }

    #[test]
    fn test_validate_requires_api_key() {
        let config = Config::default();
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.assistant.api_key = "sk-test".to_string();
        assert!(config.validate().is_ok());

        config.polling.backoff_factor = 0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_non_finite_backoff() {
        let mut config = Config::default();
        config.assistant.api_key = "sk-test".to_string();

        for factor in [f64::NAN, f64::INFINITY] {
            config.polling.backoff_factor = factor;
            assert!(matches!(config.validate(), Err(Error::Config(_))));
        }

        config.polling.backoff_factor = 1e30;
        assert!(config.validate().is_ok());
        let policy = config.polling.policy();
        assert_eq!(policy.next_delay(policy.interval), policy.max_interval);
    }

    #[test]
    fn test_policy_raises_max_interval_to_interval() {
        let polling = PollingConfig {
            interval_ms: 5000,
            backoff_factor: 2.0,
            max_interval_ms: 1000,
            max_attempts: Some(10),
            timeout_secs: Some(60),
        };
        let policy = polling.policy();
        assert_eq!(policy.max_interval, Duration::from_secs(5));
        assert_eq!(policy.next_delay(policy.interval), Duration::from_secs(5));
        assert_eq!(policy.max_attempts, Some(10));
        assert_eq!(policy.timeout, Some(Duration::from_secs(60)));
    }
}
