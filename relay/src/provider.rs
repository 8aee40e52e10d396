//! Provider resolution and URL construction.
//!
//! Providers are plain data (a base URL plus an optional credential),
//! resolved once at startup from the `[providers]` config table. Request
//! shaping and outbound calls live in [`crate::relay`].

use url::Url;

use crate::config::{ProviderEntry, ProvidersConfig, resolve_ref};
use crate::error::RelayError;

/// Placeholder substituted with the network slug in the Alchemy base URL.
const NETWORK_PLACEHOLDER: &str = "{network}";

/// A single resolved provider.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    base_url: String,
    api_key: Option<String>,
}

impl ProviderConfig {
    fn resolve(
        name: &str,
        entry: &ProviderEntry,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, RelayError> {
        let base_url = resolve_ref(&entry.base_url, lookup).ok_or_else(|| {
            RelayError::config(format!(
                "provider '{name}': base_url references an unset variable"
            ))
        })?;
        let api_key = entry.api_key.as_deref().and_then(|raw| {
            let resolved = resolve_ref(raw, lookup);
            if resolved.is_none() {
                tracing::warn!(
                    provider = name,
                    reference = raw,
                    "credential variable unset, provider unconfigured"
                );
            }
            resolved
        });
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            api_key,
        })
    }

    /// The credential, when configured.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// Whether a credential is present.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Joins a path (starting with `/`) onto the base URL.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Resolved provider registry shared by the relay.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    moralis: ProviderConfig,
    alchemy: ProviderConfig,
    transak: ProviderConfig,
}

impl ProviderRegistry {
    /// Resolves every provider entry through `lookup` and validates the base
    /// URLs.
    ///
    /// Missing credentials are not errors: the server must come up with any
    /// subset of providers configured, and `/status` reports which are.
    ///
    /// # Errors
    ///
    /// Returns an error if a base URL references an unset variable or does
    /// not parse as an absolute URL.
    pub fn from_config(
        providers: &ProvidersConfig,
        lookup: &dyn Fn(&str) -> Option<String>,
    ) -> Result<Self, RelayError> {
        let moralis = ProviderConfig::resolve("moralis", &providers.moralis, lookup)?;
        let alchemy = ProviderConfig::resolve("alchemy", &providers.alchemy, lookup)?;
        let transak = ProviderConfig::resolve("transak", &providers.transak, lookup)?;

        validate_base_url("moralis", &moralis.base_url)?;
        validate_base_url(
            "alchemy",
            &alchemy.base_url.replace(NETWORK_PLACEHOLDER, "eth-mainnet"),
        )?;
        validate_base_url("transak", &transak.base_url)?;

        Ok(Self {
            moralis,
            alchemy,
            transak,
        })
    }

    /// Moralis blockchain-indexing API.
    #[must_use]
    pub const fn moralis(&self) -> &ProviderConfig {
        &self.moralis
    }

    /// Alchemy node-RPC provider.
    #[must_use]
    pub const fn alchemy(&self) -> &ProviderConfig {
        &self.alchemy
    }

    /// Transak fiat on-ramp API.
    #[must_use]
    pub const fn transak(&self) -> &ProviderConfig {
        &self.transak
    }

    /// Alchemy JSON-RPC endpoint for a network slug: the `{network}`
    /// placeholder is substituted and the credential becomes the final path
    /// segment.
    ///
    /// # Errors
    ///
    /// Returns an upstream error when no Alchemy credential is configured.
    pub fn alchemy_rpc_url(&self, network: &str) -> Result<String, RelayError> {
        let key = self
            .alchemy
            .api_key()
            .ok_or_else(|| RelayError::upstream("alchemy credential not configured"))?;
        Ok(format!(
            "{}/{key}",
            self.alchemy.base_url.replace(NETWORK_PLACEHOLDER, network)
        ))
    }
}

fn validate_base_url(name: &str, url: &str) -> Result<(), RelayError> {
    Url::parse(url).map(|_| ()).map_err(|e| {
        RelayError::config_with(format!("provider '{name}': invalid base_url '{url}'"), e)
    })
}
