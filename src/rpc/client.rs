use alloy::primitives::Address;
use alloy::providers::{Provider, ProviderBuilder};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

use crate::error::{Result, WalletError};
use crate::precision;

/// Decimals of the chain's native token.
const NATIVE_DECIMALS: u8 = 18;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    pub rpc_url: String,
    pub chain_id: u64,
    pub block_number: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub native_balance: Option<Decimal>,
}

/// Read-only view of the chain.
#[async_trait]
pub trait ChainProvider: Send + Sync {
    async fn chain_id(&self) -> Result<u64>;

    async fn block_number(&self) -> Result<u64>;

    async fn native_balance(&self, address: &str) -> Result<Decimal>;

    fn rpc_url(&self) -> &str;

    /// Chain id, head block and, for `address`, its native balance.
    async fn network_status(&self, address: Option<&str>) -> Result<NetworkStatus> {
        let chain_id = self.chain_id().await?;
        let block_number = self.block_number().await?;
        let native_balance = match address {
            Some(address) => Some(self.native_balance(address).await?),
            None => None,
        };

        Ok(NetworkStatus {
            rpc_url: self.rpc_url().to_string(),
            chain_id,
            block_number,
            address: address.map(str::to_string),
            native_balance,
        })
    }
}

/// RPC Client for chain reads over HTTP
#[derive(Clone)]
pub struct RpcClient {
    inner: Arc<RpcClientInner>,
}

struct RpcClientInner {
    provider_url: String,
    timeout: Duration,
}

impl RpcClient {
    /// Create a new RPC client
    pub fn new(rpc_url: String, timeout: Duration) -> Result<Self> {
        rpc_url
            .parse::<url::Url>()
            .map_err(|_| WalletError::ConfigError("Invalid RPC URL format".to_string()))?;

        debug!("Using RPC endpoint: {}", rpc_url);

        Ok(RpcClient {
            inner: Arc::new(RpcClientInner {
                provider_url: rpc_url,
                timeout,
            }),
        })
    }

    fn provider_url(&self) -> Result<url::Url> {
        self.inner
            .provider_url
            .parse()
            .map_err(|_| WalletError::ConfigError("Invalid RPC URL".to_string()))
    }

    /// Runs one RPC call under the configured timeout.
    async fn with_timeout<T, E, F>(&self, what: &str, call: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, E>>,
        E: std::fmt::Display,
    {
        match tokio::time::timeout(self.inner.timeout, call).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => {
                error!("Failed to get {}: {}", what, e);
                Err(WalletError::ExternalCallFailure(format!(
                    "Failed to get {}: {}",
                    what, e
                )))
            }
            Err(_) => {
                error!("Timed out getting {}", what);
                Err(WalletError::ExternalCallFailure(format!(
                    "Timed out getting {} after {:?}",
                    what, self.inner.timeout
                )))
            }
        }
    }
}

#[async_trait]
impl ChainProvider for RpcClient {
    async fn chain_id(&self) -> Result<u64> {
        debug!("Getting chain id");
        let provider = ProviderBuilder::new().on_http(self.provider_url()?);
        self.with_timeout("chain id", async { provider.get_chain_id().await })
            .await
    }

    async fn block_number(&self) -> Result<u64> {
        debug!("Getting block number");
        let provider = ProviderBuilder::new().on_http(self.provider_url()?);
        self.with_timeout("block number", async { provider.get_block_number().await })
            .await
    }

    async fn native_balance(&self, address: &str) -> Result<Decimal> {
        debug!("Getting native balance for: {}", address);

        let address = address
            .parse::<Address>()
            .map_err(|_| WalletError::InvalidArguments(format!("Invalid address: {}", address)))?;
        let provider = ProviderBuilder::new().on_http(self.provider_url()?);

        let raw = self
            .with_timeout("balance", async { provider.get_balance(address).await })
            .await?;
        precision::to_decimal(raw, NATIVE_DECIMALS)
    }

    fn rpc_url(&self) -> &str {
        &self.inner.provider_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_client_rejects_bad_url() {
        let result = RpcClient::new("not a url".to_string(), Duration::from_secs(1));
        assert!(matches!(result, Err(WalletError::ConfigError(_))));
    }

    #[test]
    fn test_rpc_client_keeps_url() {
        let client =
            RpcClient::new("https://spicy-rpc.chiliz.com".to_string(), Duration::from_secs(1)).unwrap();
        assert_eq!(client.rpc_url(), "https://spicy-rpc.chiliz.com");
    }

    #[tokio::test]
    async fn test_invalid_address_is_rejected_before_any_call() {
        let client =
            RpcClient::new("http://127.0.0.1:9".to_string(), Duration::from_secs(1)).unwrap();
        let err = client.native_balance("0x1234").await.unwrap_err();
        assert_eq!(err.code(), "InvalidArguments");
    }

    #[tokio::test]
    async fn test_rpc_error_maps_to_external_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = RpcClient::new(server.url(), Duration::from_secs(5)).unwrap();
        let err = client.block_number().await.unwrap_err();
        assert_eq!(err.code(), "ExternalCallFailure");
    }

    #[tokio::test]
    async fn test_chain_id_from_rpc() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"jsonrpc":"2.0","id":0,"result":"0x15b32"}"#)
            .create_async()
            .await;

        let client = RpcClient::new(server.url(), Duration::from_secs(5)).unwrap();
        assert_eq!(client.chain_id().await.unwrap(), 88882);
    }
}
