//! Agent configuration loading.
//!
//! TOML is the sole config source; no environment variable overrides.
//! Default config path: `/etc/simbridge/agent.toml`.
//!
//! # Required fields
//! - `schema_version = 1`
//! - `gateway.ip`
//! - `gateway.username`
//! - `gateway.password_file`
//! - `datastore.base_url`
//! - `datastore.api_key_file`
//!
//! # Secret file format
//! Raw string on a single line; trimmed on read.

use serde::Deserialize;
use std::path::Path;

// ---------------------------------------------------------------------------
// Config types (deserialized from TOML)
// ---------------------------------------------------------------------------

/// Top-level agent configuration.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub schema_version: u32,
    /// Optional human-readable name for this agent (e.g. "Rack 2 gateway").
    pub agent_name: Option<String>,
    pub gateway: GatewayConfig,
    pub datastore: DatastoreConfig,
    pub poll: PollConfig,
    pub status_http: StatusHttpConfig,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Gateway host or host:port; scheme is always http.
    pub ip: String,
    pub username: String,
    /// The Basic auth password (read from the password file, not the file path).
    pub password: String,
    /// SIM ports to poll, 1-based.
    pub ports: Vec<u16>,
    /// Delete messages from the gateway after a confirmed datastore write.
    pub acknowledge: bool,
}

#[derive(Debug, Clone)]
pub struct DatastoreConfig {
    pub base_url: String,
    /// The API key (read from the key file, not the file path).
    pub api_key: String,
}

#[derive(Debug, Clone)]
pub struct PollConfig {
    pub interval_secs: u64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct StatusHttpConfig {
    pub bind: String,
}

// ---------------------------------------------------------------------------
// Raw TOML deserialization types (with Option for optional fields)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawConfig {
    schema_version: Option<u32>,
    agent_name: Option<String>,
    gateway: Option<RawGatewayConfig>,
    datastore: Option<RawDatastoreConfig>,
    poll: Option<RawPollConfig>,
    status_http: Option<RawStatusHttpConfig>,
}

#[derive(Debug, Deserialize)]
struct RawGatewayConfig {
    ip: Option<String>,
    username: Option<String>,
    password_file: Option<String>,
    ports: Option<Vec<u16>>,
    acknowledge: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawDatastoreConfig {
    base_url: Option<String>,
    api_key_file: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawPollConfig {
    interval_secs: Option<u64>,
    request_timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawStatusHttpConfig {
    bind: Option<String>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Load agent config from a custom path.
pub fn load_config_from_path(path: &Path) -> Result<AgentConfig, ConfigError> {
    let toml_str = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("reading config file '{}': {}", path.display(), e)))?;
    load_config_from_str(&toml_str, path)
}

/// Load agent config from the default path `/etc/simbridge/agent.toml`.
pub fn load_config() -> Result<AgentConfig, ConfigError> {
    load_config_from_path(Path::new("/etc/simbridge/agent.toml"))
}

/// Load agent config from a TOML string.
///
/// `config_file_path` is available for relative-path resolution (not used
/// currently); secret file paths from the TOML are used directly.
pub fn load_config_from_str(
    toml_str: &str,
    _config_file_path: &Path,
) -> Result<AgentConfig, ConfigError> {
    let raw: RawConfig = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;

    // Validate schema_version
    let schema_version = raw
        .schema_version
        .ok_or_else(|| ConfigError::MissingField("schema_version".to_owned()))?;
    if schema_version != 1 {
        return Err(ConfigError::InvalidValue(format!(
            "schema_version must be 1, got {}",
            schema_version
        )));
    }

    // Validate gateway + read password file
    let raw_gateway = raw
        .gateway
        .ok_or_else(|| ConfigError::MissingField("gateway".to_owned()))?;
    let ip = raw_gateway
        .ip
        .ok_or_else(|| ConfigError::MissingField("gateway.ip".to_owned()))?;
    let username = raw_gateway
        .username
        .ok_or_else(|| ConfigError::MissingField("gateway.username".to_owned()))?;
    let password_file = raw_gateway
        .password_file
        .ok_or_else(|| ConfigError::MissingField("gateway.password_file".to_owned()))?;
    let password = read_secret_file(&password_file)?;
    let ports = raw_gateway.ports.unwrap_or_else(|| vec![1, 2, 3, 4]);
    if ports.is_empty() {
        return Err(ConfigError::InvalidValue(
            "gateway.ports must list at least one port".to_owned(),
        ));
    }
    if let Some(p) = ports.iter().find(|p| **p == 0) {
        return Err(ConfigError::InvalidValue(format!(
            "gateway.ports entries are 1-based, got {}",
            p
        )));
    }

    // Validate datastore + read API key file
    let raw_datastore = raw
        .datastore
        .ok_or_else(|| ConfigError::MissingField("datastore".to_owned()))?;
    let base_url = raw_datastore
        .base_url
        .ok_or_else(|| ConfigError::MissingField("datastore.base_url".to_owned()))?;
    let api_key_file = raw_datastore
        .api_key_file
        .ok_or_else(|| ConfigError::MissingField("datastore.api_key_file".to_owned()))?;
    let api_key = read_secret_file(&api_key_file)?;

    // Poll defaults
    let poll = match raw.poll {
        Some(p) => PollConfig {
            interval_secs: p.interval_secs.unwrap_or(30),
            request_timeout_secs: p.request_timeout_secs.unwrap_or(10),
        },
        None => PollConfig {
            interval_secs: 30,
            request_timeout_secs: 10,
        },
    };
    if poll.interval_secs == 0 {
        return Err(ConfigError::InvalidValue(
            "poll.interval_secs must be greater than 0".to_owned(),
        ));
    }

    // Status HTTP defaults
    let status_http = match raw.status_http {
        Some(s) => StatusHttpConfig {
            bind: s.bind.unwrap_or_else(|| "0.0.0.0:8081".to_owned()),
        },
        None => StatusHttpConfig {
            bind: "0.0.0.0:8081".to_owned(),
        },
    };

    Ok(AgentConfig {
        schema_version,
        agent_name: raw.agent_name,
        gateway: GatewayConfig {
            ip,
            username,
            password,
            ports,
            acknowledge: raw_gateway.acknowledge.unwrap_or(false),
        },
        datastore: DatastoreConfig { base_url, api_key },
        poll,
        status_http,
    })
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    MissingField(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(s) => write!(f, "IO error: {}", s),
            ConfigError::Parse(s) => write!(f, "Parse error: {}", s),
            ConfigError::MissingField(s) => write!(f, "Missing required field: {}", s),
            ConfigError::InvalidValue(s) => write!(f, "Invalid config value: {}", s),
        }
    }
}

impl std::error::Error for ConfigError {}

// ---------------------------------------------------------------------------
// Secret file reader
// ---------------------------------------------------------------------------

fn read_secret_file(path: &str) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("reading secret file '{}': {}", path, e)))?;
    Ok(content.trim().to_owned())
}
