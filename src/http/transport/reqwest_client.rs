use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;

use crate::error::{AppError, AppResult, HttpError};
use crate::metrics::FailureClass;

use super::super::template::RequestTemplate;
use super::dns::ReqwestResolver;
use super::{ConnectionStats, Transport, TransportError};

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Alternative transport on top of reqwest. Connection gauges are not
/// observable through reqwest and always report zero.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
    timeout: Duration,
}

impl ReqwestTransport {
    /// Build the reqwest client.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built.
    pub fn new(timeout: Duration, keep_alive: bool) -> AppResult<Self> {
        let max_idle = if keep_alive { usize::MAX } else { 0 };
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .pool_max_idle_per_host(max_idle)
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .dns_resolver(Arc::new(ReqwestResolver))
            .build()
            .map_err(|source| AppError::http(HttpError::BuildClientFailed { source }))?;
        Ok(Self { client, timeout })
    }

    async fn exchange(&self, template: &RequestTemplate) -> Result<u16, reqwest::Error> {
        let response = self
            .client
            .request(template.method.clone(), template.url.clone())
            .headers(template.headers.clone())
            .body(template.body.clone())
            .send()
            .await?;
        let status = response.status().as_u16();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            chunk?;
        }
        Ok(status)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, template: &RequestTemplate) -> Result<u16, TransportError> {
        match tokio::time::timeout(self.timeout, self.exchange(template)).await {
            Ok(Ok(status)) => Ok(status),
            Ok(Err(err)) => Err(TransportError::classified(err)),
            Err(elapsed) => Err(TransportError::new(FailureClass::Timeout, elapsed)),
        }
    }

    fn connections(&self) -> ConnectionStats {
        ConnectionStats::default()
    }
}
