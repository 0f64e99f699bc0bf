use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use http::Uri;
use http_body_util::{BodyExt, Full};
use hyper::rt::{Read, ReadBufCursor, Write};
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::{Connected, Connection, HttpConnector};
use hyper_util::rt::{TokioExecutor, TokioTimer};
use tower_service::Service;

use crate::error::{AppError, AppResult, HttpError};
use crate::metrics::FailureClass;

use super::super::template::RequestTemplate;
use super::dns::TracingResolver;
use super::{BoxError, ConnectionGauges, ConnectionStats, Transport, TransportError};

const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(30);
const TCP_KEEPALIVE: Duration = Duration::from_secs(30);

type Connector = TrackedConnector<HttpsConnector<HttpConnector<TracingResolver>>>;

/// Default transport: a pooled hyper client whose connector counts every
/// connection it opens and every connection that is dropped.
#[derive(Debug)]
pub struct TracingTransport {
    client: Client<Connector, Full<Bytes>>,
    gauges: Arc<ConnectionGauges>,
    timeout: Duration,
}

impl TracingTransport {
    /// Build the client with certificate verification disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS connector cannot be initialized.
    pub fn new(timeout: Duration, keep_alive: bool) -> AppResult<Self> {
        let mut http = HttpConnector::new_with_resolver(TracingResolver);
        http.enforce_http(false);
        http.set_nodelay(true);
        http.set_keepalive(Some(TCP_KEEPALIVE));
        http.set_connect_timeout(Some(timeout));

        let tls = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(true)
            .danger_accept_invalid_hostnames(true)
            .build()
            .map_err(|source| AppError::http(HttpError::TlsInit { source }))?;
        let https = HttpsConnector::from((http, tokio_native_tls::TlsConnector::from(tls)));

        let gauges = Arc::new(ConnectionGauges::default());
        let connector = TrackedConnector::new(https, gauges.clone());
        let max_idle = if keep_alive { usize::MAX } else { 0 };
        let client = Client::builder(TokioExecutor::new())
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(POOL_IDLE_TIMEOUT)
            .pool_max_idle_per_host(max_idle)
            .build(connector);

        Ok(Self {
            client,
            gauges,
            timeout,
        })
    }

    async fn exchange(&self, template: &RequestTemplate) -> Result<u16, BoxError> {
        let request = template.to_request(Full::new(template.body.clone()))?;
        let response = self.client.request(request).await?;
        let status = response.status().as_u16();
        let mut body = response.into_body();
        while let Some(frame) = body.frame().await {
            frame?;
        }
        Ok(status)
    }
}

#[async_trait]
impl Transport for TracingTransport {
    async fn execute(&self, template: &RequestTemplate) -> Result<u16, TransportError> {
        match tokio::time::timeout(self.timeout, self.exchange(template)).await {
            Ok(Ok(status)) => Ok(status),
            Ok(Err(err)) => Err(TransportError::classified(err)),
            Err(elapsed) => Err(TransportError::new(FailureClass::Timeout, elapsed)),
        }
    }

    fn connections(&self) -> ConnectionStats {
        self.gauges.stats()
    }
}

/// Connector wrapper that hands out [`TrackedStream`]s.
#[derive(Debug, Clone)]
pub struct TrackedConnector<C> {
    inner: C,
    gauges: Arc<ConnectionGauges>,
}

impl<C> TrackedConnector<C> {
    pub const fn new(inner: C, gauges: Arc<ConnectionGauges>) -> Self {
        Self { inner, gauges }
    }
}

impl<C> Service<Uri> for TrackedConnector<C>
where
    C: Service<Uri> + Send + 'static,
    C::Response: Read + Write + Connection + Unpin + Send + 'static,
    C::Future: Send + 'static,
    C::Error: Into<BoxError>,
{
    type Response = TrackedStream<C::Response>;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx).map_err(Into::into)
    }

    fn call(&mut self, uri: Uri) -> Self::Future {
        let connecting = self.inner.call(uri);
        let gauges = self.gauges.clone();
        Box::pin(async move {
            let stream = connecting.await.map_err(Into::into)?;
            gauges.opened();
            Ok(TrackedStream { inner: stream, gauges })
        })
    }
}

/// Connection that records its close when hyper drops it.
#[derive(Debug)]
pub struct TrackedStream<T> {
    inner: T,
    gauges: Arc<ConnectionGauges>,
}

impl<T> Drop for TrackedStream<T> {
    fn drop(&mut self) {
        self.gauges.closed();
    }
}

impl<T: Connection> Connection for TrackedStream<T> {
    fn connected(&self) -> Connected {
        self.inner.connected()
    }
}

impl<T: Read + Unpin> Read for TrackedStream<T> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: ReadBufCursor<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_read(cx, buf)
    }
}

impl<T: Write + Unpin> Write for TrackedStream<T> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }

    fn poll_write_vectored(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write_vectored(cx, bufs)
    }
}
