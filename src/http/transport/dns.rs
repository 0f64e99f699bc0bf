use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};

use hyper_util::client::legacy::connect::dns::Name;
use tower_service::Service;

use super::BoxError;

/// Name resolution failed; lets the classifier tell DNS errors apart.
#[derive(Debug, thiserror::Error)]
#[error("failed to resolve '{host}': {source}")]
pub struct DnsFailure {
    host: String,
    #[source]
    source: io::Error,
}

impl DnsFailure {
    #[must_use]
    pub fn new(host: impl Into<String>, source: io::Error) -> Self {
        Self {
            host: host.into(),
            source,
        }
    }

    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }
}

async fn lookup(host: String) -> Result<std::vec::IntoIter<SocketAddr>, DnsFailure> {
    let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host.as_str(), 0))
        .await
        .map_err(|source| DnsFailure::new(host.clone(), source))?
        .collect();
    if addrs.is_empty() {
        return Err(DnsFailure::new(
            host,
            io::Error::new(io::ErrorKind::NotFound, "no addresses returned"),
        ));
    }
    Ok(addrs.into_iter())
}

/// Resolver for the hyper connector.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingResolver;

impl Service<Name> for TracingResolver {
    type Response = std::vec::IntoIter<SocketAddr>;
    type Error = DnsFailure;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, name: Name) -> Self::Future {
        Box::pin(lookup(name.as_str().to_owned()))
    }
}

/// Resolver plugged into the reqwest client.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReqwestResolver;

impl reqwest::dns::Resolve for ReqwestResolver {
    fn resolve(&self, name: reqwest::dns::Name) -> reqwest::dns::Resolving {
        let host = name.as_str().to_owned();
        Box::pin(async move {
            let addrs: reqwest::dns::Addrs = match lookup(host).await {
                Ok(addrs) => Box::new(addrs),
                Err(err) => return Err(BoxError::from(err)),
            };
            Ok(addrs)
        })
    }
}
