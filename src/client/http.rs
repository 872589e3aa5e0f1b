//! HTTP client for the coin backend (`/coins/*`).

use std::time::Duration;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use crate::client::{sort_newest_first, CheckBalanceRequest, WalletApi, WalletResponse, WalletSnapshot};
use crate::core::transaction::Transaction;
use crate::core::validator::BalanceCheckResponse;
use crate::error::{Result, WalletError};

/// Wallet API over HTTP. Every request carries the client's timeout; there are no retries.
#[derive(Debug, Clone)]
pub struct HttpWalletClient {
    http_client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl HttpWalletClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration, auth_token: Option<String>) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WalletError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self::with_http_client(http_client, base_url, auth_token))
    }

    /// Uses a caller-built `reqwest::Client`, which must carry its own timeout.
    pub fn with_http_client(
        http_client: Client,
        base_url: impl Into<String>,
        auth_token: Option<String>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http_client,
            base_url,
            auth_token,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.auth_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.authorize(request).send().await.map_err(|e| {
            warn!("wallet request failed: {}", e);
            WalletError::from(e)
        })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            warn!(%status, url = %response.url(), "wallet request rejected");
            return Err(WalletError::Auth(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            warn!(%status, url = %response.url(), "wallet request returned an error status");
            return Err(WalletError::Network(format!("HTTP {}", status)));
        }

        let bytes = response.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl WalletApi for HttpWalletClient {
    async fn get_wallet(&self) -> Result<WalletSnapshot> {
        let url = self.url("coins/wallet");
        debug!("fetching wallet from {}", url);
        let response: WalletResponse = self.send(self.http_client.get(&url)).await?;
        response.into_snapshot()
    }

    async fn get_transactions(&self, limit: usize) -> Result<Vec<Transaction>> {
        let url = self.url("coins/transactions");
        debug!(limit, "fetching transactions from {}", url);
        let request = self.http_client.get(&url).query(&[("limit", limit)]);
        let mut transactions: Vec<Transaction> = self.send(request).await?;
        sort_newest_first(&mut transactions);
        transactions.truncate(limit);
        Ok(transactions)
    }

    async fn check_balance(&self, amount: u64) -> Result<BalanceCheckResponse> {
        let url = self.url("coins/check-balance");
        debug!(amount, "checking balance at {}", url);
        let request = self.http_client.post(&url).json(&CheckBalanceRequest { amount });
        self.send(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_joining() {
        let client = HttpWalletClient::new("http://localhost:5000/api/v1/", Duration::from_secs(1), None).unwrap();
        assert_eq!(client.base_url(), "http://localhost:5000/api/v1");
        assert_eq!(client.url("/coins/wallet"), "http://localhost:5000/api/v1/coins/wallet");
        assert_eq!(client.url("coins/wallet"), "http://localhost:5000/api/v1/coins/wallet");
    }
}
