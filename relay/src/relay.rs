//! The request relay core.
//!
//! Each operation shapes one outbound provider call and passes the payload
//! through untouched inside the [`Relayed`] envelope. Block lookup is the
//! one two-tier operation: Moralis first, then exactly one Alchemy JSON-RPC
//! fallback. No retries, no caching; every call is a fresh attempt.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde_json::{Value, json};

use crate::chain::ChainId;
use crate::error::RelayError;
use crate::provider::ProviderRegistry;

/// Which provider produced a relayed payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Primary tier for blockchain-data endpoints.
    Moralis,
    /// Fallback tier for block lookup.
    Alchemy,
}

/// Uniform success envelope: the provider's payload plus its origin.
#[derive(Debug, Clone, Serialize)]
pub struct Relayed {
    /// Provider response body, passed through verbatim.
    pub data: Value,
    /// Provider that answered.
    pub source: Source,
}

/// Reshaped reply for an on-ramp order.
#[derive(Debug, Clone, Serialize)]
pub struct OnrampOrder {
    /// Order status reported by the on-ramp provider.
    pub status: Value,
    /// Hosted checkout link (`transactionLink` upstream).
    pub url: Value,
}

/// Owns the outbound HTTP client and the resolved provider registry.
#[derive(Debug)]
pub struct Relay {
    http: Client,
    providers: ProviderRegistry,
}

impl Relay {
    /// Creates the relay with one shared HTTP client.
    ///
    /// Outbound calls carry no deadline unless `request_timeout` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(
        providers: ProviderRegistry,
        request_timeout: Option<Duration>,
    ) -> Result<Self, RelayError> {
        let mut builder = Client::builder();
        if let Some(timeout) = request_timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| RelayError::server_with("failed to build HTTP client", e))?;
        Ok(Self { http, providers })
    }

    /// The resolved provider registry (credential presence for `/status`).
    #[must_use]
    pub const fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    /// Latest-block lookup: Moralis first, one Alchemy fallback.
    ///
    /// # Errors
    ///
    /// Returns an upstream error only once both tiers have failed.
    pub async fn block(&self, chain: ChainId) -> Result<Relayed, RelayError> {
        let primary = self
            .moralis_get(&format!("/block/{chain}"), &[("chain", chain.hex())])
            .await;
        match primary {
            Ok(data) => Ok(Relayed {
                data,
                source: Source::Moralis,
            }),
            Err(error) => {
                tracing::warn!(
                    %error,
                    network = %chain.alchemy_network(),
                    "moralis block lookup failed, falling back to alchemy"
                );
                let data = self
                    .alchemy_rpc(chain, "eth_getBlockByNumber", json!(["latest", true]))
                    .await?;
                Ok(Relayed {
                    data,
                    source: Source::Alchemy,
                })
            }
        }
    }

    /// ERC-20 balances for an address.
    ///
    /// # Errors
    ///
    /// Returns an upstream error if the Moralis call fails.
    pub async fn token_balances(
        &self,
        address: &str,
        chain: ChainId,
    ) -> Result<Relayed, RelayError> {
        let data = self
            .moralis_get(
                &format!("/erc20/{address}/balance"),
                &[("chain", chain.moralis_slug())],
            )
            .await?;
        Ok(Relayed {
            data,
            source: Source::Moralis,
        })
    }

    /// ERC-20 metadata for a comma-joined list of contract addresses.
    ///
    /// # Errors
    ///
    /// Returns an upstream error if the Moralis call fails.
    pub async fn token_metadata(
        &self,
        addresses: &str,
        chain: ChainId,
    ) -> Result<Relayed, RelayError> {
        let data = self
            .moralis_get(
                "/erc20/metadata",
                &[
                    ("chain", chain.moralis_slug()),
                    ("addresses", addresses.to_owned()),
                ],
            )
            .await?;
        Ok(Relayed {
            data,
            source: Source::Moralis,
        })
    }

    /// Metadata for one NFT.
    ///
    /// # Errors
    ///
    /// Returns an upstream error if the Moralis call fails.
    pub async fn nft_metadata(
        &self,
        address: &str,
        token_id: &str,
        chain: ChainId,
    ) -> Result<Relayed, RelayError> {
        let data = self
            .moralis_get(
                &format!("/nft/{address}/{token_id}"),
                &[("chain", chain.moralis_slug())],
            )
            .await?;
        Ok(Relayed {
            data,
            source: Source::Moralis,
        })
    }

    /// Creates a fiat on-ramp order: the client body is forwarded verbatim
    /// with the credential header attached server-side, and the reply is
    /// reshaped to `{status, url}`.
    ///
    /// # Errors
    ///
    /// Returns an upstream error if no credential is configured or the
    /// Transak call fails.
    pub async fn onramp_order(&self, order: Value) -> Result<OnrampOrder, RelayError> {
        let transak = self.providers.transak();
        let key = transak
            .api_key()
            .ok_or_else(|| RelayError::upstream("transak credential not configured"))?;

        let request = self
            .http
            .post(transak.endpoint("/order"))
            .header("apiKey", key)
            .json(&order);
        let body = Self::send("transak", request).await?;
        Ok(OnrampOrder {
            status: body.get("status").cloned().unwrap_or(Value::Null),
            url: body.get("transactionLink").cloned().unwrap_or(Value::Null),
        })
    }

    /// One Moralis GET. The credential header is attached when configured;
    /// without it the provider's rejection surfaces through the usual
    /// upstream error path.
    async fn moralis_get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Value, RelayError> {
        let moralis = self.providers.moralis();
        let mut request = self.http.get(moralis.endpoint(path)).query(query);
        if let Some(key) = moralis.api_key() {
            request = request.header("X-API-Key", key);
        }
        Self::send("moralis", request).await
    }

    /// One Alchemy JSON-RPC call against the network resolved from `chain`.
    async fn alchemy_rpc(
        &self,
        chain: ChainId,
        method: &str,
        params: Value,
    ) -> Result<Value, RelayError> {
        let url = self.providers.alchemy_rpc_url(&chain.alchemy_network())?;
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        Self::send("alchemy", self.http.post(url).json(&body)).await
    }

    /// Issues a request and reads the JSON body, collapsing transport
    /// failures, non-2xx statuses, and malformed bodies into one upstream
    /// error named after the provider.
    async fn send(provider: &str, request: RequestBuilder) -> Result<Value, RelayError> {
        let response = request
            .send()
            .await
            .map_err(|e| RelayError::upstream_with(provider, e))?
            .error_for_status()
            .map_err(|e| RelayError::upstream_with(provider, e))?;
        response
            .json()
            .await
            .map_err(|e| RelayError::upstream_with(provider, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serializes_with_lowercase_source() {
        let relayed = Relayed {
            data: json!({"number": "0x10"}),
            source: Source::Alchemy,
        };
        let value = serde_json::to_value(&relayed).unwrap();
        assert_eq!(value, json!({"data": {"number": "0x10"}, "source": "alchemy"}));
    }

    #[test]
    fn onramp_order_serializes_status_and_url() {
        let order = OnrampOrder {
            status: json!("PROCESSING"),
            url: json!("https://global.transak.com/?id=1"),
        };
        let value = serde_json::to_value(&order).unwrap();
        assert_eq!(value["status"], "PROCESSING");
        assert_eq!(value["url"], "https://global.transak.com/?id=1");
    }
}
