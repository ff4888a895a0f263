//! Configuration management for polydns
//!
//! This module defines the `Config` struct and its sections. Settings are
//! layered with `figment`: built-in defaults, then an optional TOML file,
//! then `POLYDNS_` environment variables, then command-line flags.

use anyhow::{bail, Context, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use hickory_resolver::proto::rr::RecordType;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};

pub use crate::cli::Cli;
use crate::dns::{
    config::{DEFAULT_RETRIES, DEFAULT_TIMEOUT},
    ClientConfig, Protocol, ProxyCredentials, ProxyKind, ProxySettings, TlsSettings,
};

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub core: CoreConfig,
    pub query: QueryConfig,
    pub proxy: ProxyConfig,
    pub tls: TlsSettings,
    pub output: OutputConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct CoreConfig {
    /// Logging filter directive for `tracing-subscriber`.
    pub log_level: String,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Query parameters.
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct QueryConfig {
    pub protocol: Protocol,
    /// Servers to query. Empty selects the protocol's default list.
    pub servers: Vec<String>,
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    pub retries: u32,
    /// Record type name or numeric code.
    pub record_type: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            protocol: Protocol::Udp,
            servers: Vec::new(),
            timeout_ms: DEFAULT_TIMEOUT.as_millis() as u64,
            retries: DEFAULT_RETRIES,
            record_type: "A".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct ProxyConfig {
    pub kind: ProxyKind,
    pub address: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// The format for stdout output.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    Json,
    #[default]
    PlainText,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Json => write!(f, "JSON"),
            OutputFormat::PlainText => write!(f, "Plain Text"),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

impl Config {
    /// Loads the configuration for a parsed command line.
    ///
    /// Fails if `--config-file` names a file that does not exist, or if any
    /// layer holds a value of the wrong type.
    pub fn load_from_cli(cli: Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(path) = &cli.config_file {
            if !path.exists() {
                bail!("Config file not found at specified path: {}", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }

        let config: Config = figment
            // e.g. POLYDNS_QUERY__TIMEOUT_MS=2000
            .merge(Env::prefixed("POLYDNS_").split("__"))
            .merge(cli)
            .extract()?;
        Ok(config)
    }

    /// The record type to query.
    pub fn record_type(&self) -> Result<RecordType> {
        let raw = self.query.record_type.trim();
        if let Ok(code) = raw.parse::<u16>() {
            return Ok(RecordType::from(code));
        }
        RecordType::from_str(&raw.to_ascii_uppercase())
            .with_context(|| format!("unknown record type '{}'", raw))
    }

    /// Builds the client configuration these settings describe.
    pub fn client_config(&self) -> Result<ClientConfig> {
        let mut builder = ClientConfig::builder()
            .protocol(self.query.protocol)
            .timeout(Duration::from_millis(self.query.timeout_ms))
            .retries(self.query.retries);

        if !self.query.servers.is_empty() {
            builder = builder.servers(self.query.servers.iter().cloned());
        }

        let credentials = match (&self.proxy.username, &self.proxy.password) {
            (Some(user), Some(password)) => Some(ProxyCredentials::new(user.clone(), password.clone())),
            (None, None) => None,
            _ => bail!("proxy username and password must be set together"),
        };
        if self.proxy.kind != ProxyKind::None {
            if self.proxy.address.is_empty() {
                bail!("a {} proxy needs an address", self.proxy.kind);
            }
            builder = builder.proxy(ProxySettings::new(
                self.proxy.kind,
                self.proxy.address.clone(),
                credentials,
            ));
        }

        if self.tls.insecure || self.tls.server_name.is_some() {
            builder = builder.tls(self.tls.clone());
        }

        Ok(builder.build())
    }
}
