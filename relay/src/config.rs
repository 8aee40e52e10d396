//! Configuration loading and default template generation.
//!
//! This module provides:
//!
//! - [`Config`] — server and provider settings parsed from TOML.
//! - [`Config::load_or_default`] — reads a TOML configuration file, falling
//!   back to defaults plus environment variables when the file is absent.
//! - [`generate_default_config`] — produces a commented TOML template.
//!
//! # Configuration File Format
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 3000
//!
//! [providers.moralis]
//! base_url = "https://deep-index.moralis.io/api/v2"
//! api_key = "$MORALIS_API"
//! ```
//!
//! Provider values support environment variable references (`$VAR` or
//! `${VAR}`), resolved once at startup. A credential reference to an unset
//! variable leaves that provider unconfigured instead of failing: the
//! server still starts and `/status` reports which credentials are present.

use std::net::{IpAddr, Ipv4Addr};
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::RelayError;

/// Top-level relay configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Bind address. Falls back to the `HOST` environment variable, then
    /// `0.0.0.0`.
    pub host: IpAddr,
    /// Listen port. Falls back to the `PORT` environment variable, then 3000.
    pub port: u16,
    /// Optional directory of static client files served at the root.
    pub static_dir: Option<PathBuf>,
    /// Optional timeout for outbound provider calls, in seconds. Outbound
    /// calls run without a deadline when unset.
    pub request_timeout_secs: Option<u64>,
    /// Cross-origin policy.
    pub cors: CorsConfig,
    /// Upstream provider entries.
    pub providers: ProvidersConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
            request_timeout_secs: None,
            cors: CorsConfig::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file at the given path.
    ///
    /// A missing file is not an error: the original deployment style
    /// configures everything through the environment, so defaults apply.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load_or_default(path: &Path) -> Result<Self, RelayError> {
        if !path.exists() {
            tracing::info!(path = %path.display(), "config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| {
            RelayError::config_with(format!("failed to read config file '{}'", path.display()), e)
        })?;
        let config = toml::from_str(&content).map_err(|e| {
            RelayError::config_with(format!("failed to parse TOML config '{}'", path.display()), e)
        })?;
        Ok(config)
    }
}

/// Cross-origin policy section.
///
/// An empty origin list allows any origin (the default deployment); a
/// non-empty list restricts cross-origin requests to exactly those origins.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    /// Origins allowed to call the relay cross-origin.
    pub allowed_origins: Vec<String>,
}

/// The `[providers]` table: one entry per upstream.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProvidersConfig {
    /// Moralis blockchain-indexing API.
    pub moralis: ProviderEntry,
    /// Alchemy node-RPC provider (block-lookup fallback tier).
    pub alchemy: ProviderEntry,
    /// Transak fiat on-ramp API.
    pub transak: ProviderEntry,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            moralis: ProviderEntry {
                base_url: "https://deep-index.moralis.io/api/v2".to_owned(),
                api_key: Some("$MORALIS_API".to_owned()),
            },
            alchemy: ProviderEntry {
                base_url: "https://{network}.g.alchemy.com/v2".to_owned(),
                api_key: Some("$ALCHEMY_API".to_owned()),
            },
            transak: ProviderEntry {
                base_url: "https://api.transak.com/api/v2".to_owned(),
                api_key: Some("$TRANSAK_API".to_owned()),
            },
        }
    }
}

/// One provider entry as written in TOML; `api_key` may be an env reference.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderEntry {
    /// Base URL. Alchemy's entry carries a `{network}` placeholder.
    pub base_url: String,
    /// Credential, or a `$VAR`/`${VAR}` reference to one.
    #[serde(default)]
    pub api_key: Option<String>,
}

/// Resolve an environment-variable reference (`$VAR` or `${VAR}`) through
/// `lookup`, returning the literal string unchanged if it does not match
/// either pattern and `None` if the referenced variable is unset.
pub fn resolve_ref(value: &str, lookup: &dyn Fn(&str) -> Option<String>) -> Option<String> {
    // ${VAR} syntax
    if let Some(name) = value.strip_prefix("${").and_then(|v| v.strip_suffix('}')) {
        return lookup(name);
    }
    // $VAR syntax
    if let Some(name) = value.strip_prefix('$')
        && !name.is_empty()
        && name.chars().all(|c| c.is_alphanumeric() || c == '_')
    {
        return lookup(name);
    }
    // Literal value
    Some(value.to_owned())
}

fn default_host() -> IpAddr {
    std::env::var("HOST")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

fn default_port() -> u16 {
    std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000)
}

/// Generate a default TOML configuration template.
#[must_use]
pub fn generate_default_config() -> String {
    r#"# Relay Configuration

# Server bind address and port.
# Can also be set via HOST / PORT environment variables.
host = "0.0.0.0"
port = 3000

# Cross-origin policy. Omit (or leave empty) to allow any origin; list
# specific origins to restrict to the app domain plus local development.
# [cors]
# allowed_origins = ["https://app.example.com", "http://localhost:5173"]

# Optional directory of static client files served at the root.
# static_dir = "client"

# Optional timeout for outbound provider calls, in seconds. Off by default.
# request_timeout_secs = 30

# ── Providers ───────────────────────────────────────────────────────
# api_key values support environment variable references: "$VAR" or "${VAR}".
# A reference to an unset variable leaves that provider unconfigured;
# GET /status reports which credentials are present.

[providers.moralis]
base_url = "https://deep-index.moralis.io/api/v2"
api_key = "$MORALIS_API"

[providers.alchemy]
# "{network}" is replaced with the resolved network slug; the credential
# becomes the final path segment of the RPC URL.
base_url = "https://{network}.g.alchemy.com/v2"
api_key = "$ALCHEMY_API"

[providers.transak]
base_url = "https://api.transak.com/api/v2"
api_key = "$TRANSAK_API"
"#
    .to_owned()
}
