//! HTTP plumbing: per-request timeout, cancellation and provider fallback.

use heirvault_plan::Network;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::provider::Provider;
use crate::ExplorerError;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Explorer client settings
#[derive(Debug, Clone)]
pub struct ExplorerConfig {
    /// Bound on every single HTTP request, body included
    pub timeout: Duration,
    /// Replaces the mempool.space API root (self-hosted instance)
    pub mempool_api: Option<ApiOverride>,
    /// Replaces the blockstream.info API root (self-hosted instance)
    pub blockstream_api: Option<ApiOverride>,
}

/// A self-hosted API root. It serves exactly one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiOverride {
    pub network: Network,
    pub url: String,
}

impl ApiOverride {
    pub fn new(network: Network, url: impl Into<String>) -> Self {
        Self {
            network,
            url: url.into(),
        }
    }
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            mempool_api: None,
            blockstream_api: None,
        }
    }
}

/// Esplora client. Holds nothing but an HTTP connection pool and settings.
#[derive(Debug, Clone)]
pub struct ExplorerClient {
    http: reqwest::Client,
    config: ExplorerConfig,
}

impl ExplorerClient {
    pub fn new(config: ExplorerConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("heirvault/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();

        Self { http, config }
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    /// API root for a provider, honouring overrides.
    ///
    /// Regtest is refused even with an override. An override configured for
    /// another network is an error, never a silent switch to the public root.
    pub fn api_base(&self, provider: Provider, network: Network) -> Result<String, ExplorerError> {
        let default = provider.api_base(network)?;
        let custom = match provider {
            Provider::Mempool => self.config.mempool_api.as_ref(),
            Provider::Blockstream => self.config.blockstream_api.as_ref(),
        };
        match custom {
            None => Ok(default),
            Some(o) if o.network != network => Err(ExplorerError::OverrideNetworkMismatch {
                provider,
                configured: o.network,
                requested: network,
            }),
            Some(o) => Ok(o.url.trim_end_matches('/').to_string()),
        }
    }

    /// Run `op` on `primary`, then once on the other provider if allowed.
    ///
    /// Returns the value, the provider that produced it and whether that was
    /// the fallback. Cancellation is never retried. Without fallback the
    /// primary's error is returned as is.
    pub(crate) async fn with_fallback<T, F, Fut>(
        &self,
        primary: Provider,
        fallback: bool,
        op: F,
    ) -> Result<(T, Provider, bool), ExplorerError>
    where
        F: Fn(Provider) -> Fut,
        Fut: Future<Output = Result<T, ExplorerError>>,
    {
        let first_err = match op(primary).await {
            Ok(value) => return Ok((value, primary, false)),
            Err(ExplorerError::Cancelled) => return Err(ExplorerError::Cancelled),
            Err(e) if !fallback => return Err(e),
            Err(e) => e,
        };

        let secondary = primary.other();
        log::warn!(
            "{} failed ({}); falling back to {}",
            primary,
            first_err,
            secondary
        );

        match op(secondary).await {
            Ok(value) => Ok((value, secondary, true)),
            Err(ExplorerError::Cancelled) => Err(ExplorerError::Cancelled),
            Err(e) => {
                log::warn!("{} failed as well ({})", secondary, e);
                Err(ExplorerError::AllProvidersFailed { last: Box::new(e) })
            }
        }
    }

    /// Drive one HTTP exchange under the timeout and the cancel token
    async fn run<T, Fut>(
        &self,
        provider: Provider,
        exchange: Fut,
        cancel: &CancellationToken,
    ) -> Result<T, ExplorerError>
    where
        Fut: Future<Output = Result<T, reqwest::Error>>,
    {
        if cancel.is_cancelled() {
            return Err(ExplorerError::Cancelled);
        }
        let timed_out = ExplorerError::RequestTimeout {
            provider,
            secs: self.config.timeout.as_secs(),
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ExplorerError::Cancelled),
            res = tokio::time::timeout(self.config.timeout, exchange) => match res {
                Err(_) => Err(timed_out),
                Ok(Err(e)) if e.is_timeout() => Err(timed_out),
                Ok(Err(e)) => Err(ExplorerError::ProviderError {
                    provider,
                    message: e.to_string(),
                }),
                Ok(Ok(value)) => Ok(value),
            },
        }
    }

    /// GET and decode JSON; non-2xx is a provider error
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        provider: Provider,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<T, ExplorerError> {
        log::debug!("GET {}", url);
        let exchange = async {
            self.http
                .get(url)
                .send()
                .await?
                .error_for_status()?
                .json::<T>()
                .await
        };
        self.run(provider, exchange, cancel).await
    }

    /// GET a plain-text body
    pub(crate) async fn get_text(
        &self,
        provider: Provider,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<String, ExplorerError> {
        log::debug!("GET {}", url);
        let exchange = async {
            self.http
                .get(url)
                .send()
                .await?
                .error_for_status()?
                .text()
                .await
        };
        self.run(provider, exchange, cancel).await
    }

    /// POST a plain-text body. Relay rejections carry the reason in the
    /// body, so it is kept in the error.
    pub(crate) async fn post_text(
        &self,
        provider: Provider,
        url: &str,
        body: String,
        cancel: &CancellationToken,
    ) -> Result<String, ExplorerError> {
        log::debug!("POST {}", url);
        let exchange = async {
            let resp = self.http.post(url).body(body).send().await?;
            let status = resp.status();
            let text = resp.text().await?;
            Ok::<_, reqwest::Error>((status, text))
        };
        let (status, text) = self.run(provider, exchange, cancel).await?;
        if !status.is_success() {
            return Err(ExplorerError::ProviderError {
                provider,
                message: format!("HTTP {}: {}", status.as_u16(), text.trim()),
            });
        }
        Ok(text)
    }
}
