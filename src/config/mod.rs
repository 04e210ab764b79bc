//! Service configuration
//!
//! Configuration is read once at process start, from a file (TOML, YAML or JSON),
//! from environment variables, or from a file merged with environment overrides.
//! The resulting [`QuipConfig`] is immutable and shared read-only by every request.

use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    env, fs,
    path::Path,
    time::Duration,
};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Environment variable parsing error: {0}")]
    EnvVarParse(String),
    #[error("File parsing error: {0}")]
    FileParse(String),
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QuipConfig {
    /// Agents platform configuration
    #[serde(default)]
    pub agents: AgentsConfig,
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Span export configuration
    #[serde(default)]
    pub telemetry: TelemetryConfig,
    /// Log output configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Agents platform configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentsConfig {
    /// Project endpoint of the agents platform
    #[serde(default)]
    pub endpoint: String,
    /// Agent that tells fresh jokes
    #[serde(default)]
    pub joke_agent_id: String,
    /// Agent that answers feedback; the joke agent when unset
    #[serde(default)]
    pub feedback_agent_id: Option<String>,
    /// Bearer credential sent with every platform request
    #[serde(default)]
    pub api_key: Option<String>,
    /// `api-version` query parameter
    #[serde(default = "default_api_version")]
    pub api_version: String,
    /// Per-request HTTP timeout
    #[serde(with = "duration_seconds", default = "default_request_timeout")]
    pub request_timeout: Duration,
    /// Run polling behavior
    #[serde(default)]
    pub poll: PollConfig,
}

/// Polling behavior of the poll-until-terminal primitive
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay before the first status check
    #[serde(with = "duration_millis", default = "default_poll_interval")]
    pub interval: Duration,
    /// Upper bound for the delay between checks
    #[serde(with = "duration_millis", default = "default_poll_max_interval")]
    pub max_interval: Duration,
    /// Growth factor applied to the delay after each check
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Give up waiting for a terminal status after this long
    #[serde(with = "duration_seconds", default = "default_poll_timeout")]
    pub timeout: Duration,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address
    #[serde(default = "default_host")]
    pub host: String,
    /// Listening port
    #[serde(default = "default_port")]
    pub port: u16,
    /// Allowed CORS origins; `["*"]` allows any origin
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

/// Span export configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Whether spans are exported at all
    #[serde(default)]
    pub enabled: bool,
    /// OTLP/HTTP endpoint (without the `/v1/traces` suffix)
    pub otlp_endpoint: Option<String>,
    /// Extra headers sent with every OTLP export
    #[serde(default)]
    pub otlp_headers: HashMap<String, String>,
    /// Log finished spans to the console
    #[serde(default)]
    pub console_export: bool,
    /// `service.name` resource attribute
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// How often queued spans are flushed to the exporter
    #[serde(default = "default_flush_interval")]
    pub flush_interval_ms: u64,
    /// Timeout of a single export request
    #[serde(default = "default_export_timeout")]
    pub export_timeout_ms: u64,
}

/// Log output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter used when `RUST_LOG` is not set
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

/// Log line format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable lines
    #[default]
    Pretty,
    /// One JSON object per line
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: {}", s)),
        }
    }
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            joke_agent_id: String::new(),
            feedback_agent_id: None,
            api_key: None,
            api_version: default_api_version(),
            request_timeout: default_request_timeout(),
            poll: PollConfig::default(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            max_interval: default_poll_max_interval(),
            backoff_multiplier: default_backoff_multiplier(),
            timeout: default_poll_timeout(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            otlp_endpoint: None,
            otlp_headers: HashMap::new(),
            console_export: false,
            service_name: default_service_name(),
            flush_interval_ms: default_flush_interval(),
            export_timeout_ms: default_export_timeout(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            format: LogFormat::default(),
        }
    }
}

impl AgentsConfig {
    /// Agent used for feedback turns, falling back to the joke agent
    pub fn feedback_agent(&self) -> &str {
        self.feedback_agent_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .unwrap_or(&self.joke_agent_id)
    }
}

impl ServerConfig {
    /// Whether any origin is allowed
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }

    /// Socket address string to bind
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl QuipConfig {
    /// Load configuration from a file (supports TOML, YAML, JSON)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let extension = path.extension().and_then(|s| s.to_str());

        match extension {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| ConfigError::FileParse(e.to_string()))
            }
            Some("yaml") | Some("yml") => {
                serde_yaml::from_str(&content).map_err(|e| ConfigError::FileParse(e.to_string()))
            }
            Some("json") => {
                serde_json::from_str(&content).map_err(|e| ConfigError::FileParse(e.to_string()))
            }
            _ => Err(ConfigError::FileParse(
                "Unsupported file format. Use .toml, .yaml, .yml, or .json".to_string(),
            )),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().merge_with_env()
    }

    /// Merge configuration with environment variable overrides
    ///
    /// Only variables that are set override the current values.
    pub fn merge_with_env(mut self) -> Result<Self, ConfigError> {
        // Agents platform
        if let Ok(endpoint) = env::var("PROJECT_ENDPOINT") {
            self.agents.endpoint = endpoint;
        }
        if let Ok(agent_id) = env::var("AGENT_ID") {
            self.agents.joke_agent_id = agent_id;
        }
        if let Ok(agent_id) = env::var("FEEDBACK_AGENT_ID") {
            self.agents.feedback_agent_id = Some(agent_id).filter(|id| !id.is_empty());
        }
        if let Ok(api_key) = env::var("AGENTS_API_KEY") {
            self.agents.api_key = Some(api_key).filter(|key| !key.is_empty());
        }
        if let Ok(api_version) = env::var("AGENTS_API_VERSION") {
            self.agents.api_version = api_version;
        }
        if let Ok(interval) = env::var("AGENTS_POLL_INTERVAL_MS") {
            self.agents.poll.interval = Duration::from_millis(interval.parse().map_err(|e| {
                ConfigError::EnvVarParse(format!("AGENTS_POLL_INTERVAL_MS: {}", e))
            })?);
        }
        if let Ok(timeout) = env::var("AGENTS_POLL_TIMEOUT_SECS") {
            self.agents.poll.timeout = Duration::from_secs(timeout.parse().map_err(|e| {
                ConfigError::EnvVarParse(format!("AGENTS_POLL_TIMEOUT_SECS: {}", e))
            })?);
        }

        // Server
        if let Ok(port) = env::var("PORT") {
            self.server.port = port
                .parse()
                .map_err(|e| ConfigError::EnvVarParse(format!("PORT: {}", e)))?;
        }
        if let Ok(host) = env::var("HOST") {
            self.server.host = host;
        }
        if let Ok(origins) = env::var("CORS_ORIGINS") {
            self.server.cors_origins = parse_cors_origins(&origins);
        }

        // Telemetry
        if let Ok(endpoint) = env::var("OTEL_EXPORTER_OTLP_ENDPOINT") {
            self.telemetry.enabled = true;
            self.telemetry.otlp_endpoint = Some(endpoint);
        }
        if let Ok(headers_str) = env::var("OTEL_EXPORTER_OTLP_HEADERS") {
            self.telemetry.otlp_headers = parse_otlp_headers(&headers_str)?;
        }
        if let Ok(console_export) = env::var("QUIP_OTEL_CONSOLE_EXPORT") {
            self.telemetry.console_export = console_export == "true";
            if self.telemetry.console_export {
                self.telemetry.enabled = true;
            }
        }
        if let Ok(service_name) = env::var("OTEL_SERVICE_NAME") {
            self.telemetry.service_name = service_name;
        }
        if let Ok(enabled) = env::var("OTEL_ENABLED") {
            if enabled.to_lowercase() == "false" || enabled == "0" {
                self.telemetry.enabled = false;
            }
        }

        // Logging
        if let Ok(format) = env::var("QUIP_LOG_FORMAT") {
            self.logging.format = format
                .parse()
                .map_err(|e: String| ConfigError::EnvVarParse(format!("QUIP_LOG_FORMAT: {}", e)))?;
        }

        Ok(self)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Agents platform
        if self.agents.endpoint.is_empty() {
            return Err(ConfigError::Validation(
                "Agents endpoint cannot be empty (set PROJECT_ENDPOINT)".to_string(),
            ));
        }
        url::Url::parse(&self.agents.endpoint).map_err(|e| {
            ConfigError::Validation(format!(
                "Agents endpoint '{}' is not a valid URL: {}",
                self.agents.endpoint, e
            ))
        })?;
        if self.agents.joke_agent_id.is_empty() {
            return Err(ConfigError::Validation(
                "Joke agent id cannot be empty (set AGENT_ID)".to_string(),
            ));
        }
        if self.agents.request_timeout.is_zero() {
            return Err(ConfigError::Validation(
                "Request timeout must be greater than 0".to_string(),
            ));
        }
        if self.agents.poll.interval.is_zero() || self.agents.poll.timeout.is_zero() {
            return Err(ConfigError::Validation(
                "Poll interval and timeout must be greater than 0".to_string(),
            ));
        }
        if self.agents.poll.backoff_multiplier < 1.0 {
            return Err(ConfigError::Validation(
                "Poll backoff multiplier must be at least 1.0".to_string(),
            ));
        }

        // Server
        if self.server.port == 0 {
            return Err(ConfigError::Validation(
                "Server port must be greater than 0".to_string(),
            ));
        }
        if !self.server.allows_any_origin() {
            for origin in &self.server.cors_origins {
                url::Url::parse(origin).map_err(|e| {
                    ConfigError::Validation(format!("Invalid CORS origin '{}': {}", origin, e))
                })?;
            }
        }

        // Telemetry
        if self.telemetry.enabled
            && self.telemetry.otlp_endpoint.is_none()
            && !self.telemetry.console_export
        {
            return Err(ConfigError::Validation(
                "OTLP endpoint or console export required when telemetry is enabled".to_string(),
            ));
        }
        if self.telemetry.flush_interval_ms == 0 || self.telemetry.export_timeout_ms == 0 {
            return Err(ConfigError::Validation(
                "Telemetry flush interval and export timeout must be greater than 0".to_string(),
            ));
        }
        if self.telemetry.service_name.is_empty() {
            return Err(ConfigError::Validation(
                "Service name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parse the CORS origin list: `*` or `a,b,c`
fn parse_cors_origins(origins: &str) -> Vec<String> {
    origins
        .split(',')
        .map(|o| o.trim().to_string())
        .filter(|o| !o.is_empty())
        .collect()
}

/// Parse OTLP headers from environment variable format
/// Expected format: "key1=value1,key2=value2"
fn parse_otlp_headers(headers_str: &str) -> Result<HashMap<String, String>, ConfigError> {
    let mut headers = HashMap::new();

    for pair in headers_str.split(',') {
        let parts: Vec<&str> = pair.trim().splitn(2, '=').collect();
        if parts.len() == 2 {
            headers.insert(parts[0].to_string(), parts[1].to_string());
        } else {
            return Err(ConfigError::EnvVarParse(format!(
                "Invalid OTLP header format: {}",
                pair
            )));
        }
    }

    Ok(headers)
}

/// Custom serialization for Duration as seconds
mod duration_seconds {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

/// Custom serialization for Duration as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        (duration.as_millis() as u64).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

// Default value functions for serde
fn default_api_version() -> String {
    "2025-05-01".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(500)
}

fn default_poll_max_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_backoff_multiplier() -> f64 {
    1.5
}

fn default_poll_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_service_name() -> String {
    "quip".to_string()
}

fn default_flush_interval() -> u64 {
    5000
}

fn default_export_timeout() -> u64 {
    10_000
}

fn default_log_filter() -> String {
    "quip=info,tower_http=info,warn".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::NamedTempFile;

    fn valid_config() -> QuipConfig {
        let mut config = QuipConfig::default();
        config.agents.endpoint = "https://example.services.ai.azure.com/api/projects/jokes".into();
        config.agents.joke_agent_id = "asst_joke".into();
        config
    }

    #[test]
    fn test_default_config() {
        let config = QuipConfig::default();
        assert_eq!(config.server.port, 8000);
        assert!(config.server.allows_any_origin());
        assert!(!config.telemetry.enabled);
        assert_eq!(config.agents.poll.timeout, Duration::from_secs(300));
    }

    #[test]
    fn test_config_validation() {
        let mut config = valid_config();
        assert!(config.validate().is_ok());

        config.agents.joke_agent_id = String::new();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.agents.endpoint = "not a url".into();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.telemetry.enabled = true;
        assert!(config.validate().is_err());
        config.telemetry.console_export = true;
        assert!(config.validate().is_ok());

        let mut config = valid_config();
        config.telemetry.flush_interval_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = valid_config();
        config.telemetry.export_timeout_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_feedback_agent_falls_back_to_joke_agent() {
        let mut config = valid_config();
        assert_eq!(config.agents.feedback_agent(), "asst_joke");

        config.agents.feedback_agent_id = Some(String::new());
        assert_eq!(config.agents.feedback_agent(), "asst_joke");

        config.agents.feedback_agent_id = Some("asst_feedback".into());
        assert_eq!(config.agents.feedback_agent(), "asst_feedback");
    }

    #[test]
    fn test_toml_config_loading() {
        let toml_content = r#"
[agents]
endpoint = "https://example.services.ai.azure.com/api/projects/jokes"
joke_agent_id = "asst_joke"
feedback_agent_id = "asst_feedback"

[agents.poll]
interval = 250
timeout = 60

[server]
port = 9000
cors_origins = ["https://jokes.example.com"]

[telemetry]
enabled = true
console_export = true
service_name = "quip-test"
"#;

        let temp_file = NamedTempFile::with_suffix(".toml").unwrap();
        std::fs::write(temp_file.path(), toml_content).unwrap();

        let config = QuipConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.agents.feedback_agent(), "asst_feedback");
        assert_eq!(config.agents.poll.interval, Duration::from_millis(250));
        assert_eq!(config.agents.poll.timeout, Duration::from_secs(60));
        assert_eq!(config.server.port, 9000);
        assert!(!config.server.allows_any_origin());
        assert!(config.telemetry.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_yaml_config_loading() {
        let yaml_content = r#"
agents:
  endpoint: "https://example.com/api"
  joke_agent_id: "asst_joke"
logging:
  format: json
"#;

        let temp_file = NamedTempFile::with_suffix(".yaml").unwrap();
        std::fs::write(temp_file.path(), yaml_content).unwrap();

        let config = QuipConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.agents.joke_agent_id, "asst_joke");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.server.port, 8000);
    }

    #[test]
    fn test_unsupported_extension() {
        let temp_file = NamedTempFile::with_suffix(".ini").unwrap();
        std::fs::write(temp_file.path(), "x=1").unwrap();
        assert!(matches!(
            QuipConfig::from_file(temp_file.path()),
            Err(ConfigError::FileParse(_))
        ));
    }

    #[test]
    fn test_env_var_loading() {
        env::set_var("PROJECT_ENDPOINT", "https://env.example.com/api");
        env::set_var("AGENT_ID", "asst_env");
        env::set_var("PORT", "8123");
        env::set_var("CORS_ORIGINS", "https://a.example.com, https://b.example.com");

        let config = QuipConfig::from_env().unwrap();
        assert_eq!(config.agents.endpoint, "https://env.example.com/api");
        assert_eq!(config.agents.joke_agent_id, "asst_env");
        assert_eq!(config.server.port, 8123);
        assert_eq!(
            config.server.cors_origins,
            vec!["https://a.example.com", "https://b.example.com"]
        );

        // Clean up
        env::remove_var("PROJECT_ENDPOINT");
        env::remove_var("AGENT_ID");
        env::remove_var("PORT");
        env::remove_var("CORS_ORIGINS");
    }

    #[test]
    fn test_otlp_headers_parsing() {
        let headers = parse_otlp_headers("authorization=Bearer token123,x-tenant=jokes").unwrap();

        assert_eq!(
            headers.get("authorization"),
            Some(&"Bearer token123".to_string())
        );
        assert_eq!(headers.get("x-tenant"), Some(&"jokes".to_string()));
        assert!(parse_otlp_headers("missing-equals").is_err());
    }

    #[test]
    fn test_cors_origin_parsing() {
        assert_eq!(parse_cors_origins("*"), vec!["*"]);
        assert_eq!(parse_cors_origins("a, ,b"), vec!["a", "b"]);
    }
}
