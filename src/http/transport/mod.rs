//! Request execution backends and transport failure classification.
mod dns;
mod reqwest_client;
mod tracing_client;

use std::error::Error as StdError;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::error::AppResult;
use crate::metrics::FailureClass;

use super::template::RequestTemplate;

pub use dns::DnsFailure;
pub use reqwest_client::ReqwestTransport;
pub use tracing_client::TracingTransport;

pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Executes one request template and reports the HTTP status.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, template: &RequestTemplate) -> Result<u16, TransportError>;

    fn connections(&self) -> ConnectionStats;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportKind {
    #[default]
    Tracing,
    Reqwest,
}

#[derive(Debug, Clone, Copy)]
pub struct TransportConfig {
    pub kind: TransportKind,
    pub timeout: Duration,
    pub keep_alive: bool,
}

/// Build the configured transport.
///
/// # Errors
///
/// Returns an error when the TLS connector or HTTP client cannot be built.
pub fn build_transport(config: TransportConfig) -> AppResult<Arc<dyn Transport>> {
    let transport: Arc<dyn Transport> = match config.kind {
        TransportKind::Tracing => {
            Arc::new(TracingTransport::new(config.timeout, config.keep_alive)?)
        }
        TransportKind::Reqwest => {
            Arc::new(ReqwestTransport::new(config.timeout, config.keep_alive)?)
        }
    };
    Ok(transport)
}

/// A failed exchange together with its failure class.
#[derive(Debug, thiserror::Error)]
#[error("{class}: {source}")]
pub struct TransportError {
    class: FailureClass,
    #[source]
    source: BoxError,
}

impl TransportError {
    pub fn new<E>(class: FailureClass, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self {
            class,
            source: source.into(),
        }
    }

    /// Wrap an error and derive its class from the source chain.
    pub fn classified<E>(source: E) -> Self
    where
        E: Into<BoxError>,
    {
        let source = source.into();
        let class = classify(source.as_ref());
        Self { class, source }
    }

    #[must_use]
    pub const fn class(&self) -> FailureClass {
        self.class
    }
}

/// Walk the error chain looking for a structural cause.
#[must_use]
pub fn classify(error: &(dyn StdError + 'static)) -> FailureClass {
    let mut current = Some(error);
    while let Some(err) = current {
        if err.is::<tokio::time::error::Elapsed>() {
            return FailureClass::Timeout;
        }
        if err.is::<DnsFailure>() {
            return FailureClass::DnsFailure;
        }
        if let Some(hyper_err) = err.downcast_ref::<hyper::Error>() {
            if hyper_err.is_timeout() {
                return FailureClass::Timeout;
            }
            if hyper_err.is_incomplete_message() {
                return FailureClass::Eof;
            }
        }
        if let Some(reqwest_err) = err.downcast_ref::<reqwest::Error>()
            && reqwest_err.is_timeout()
        {
            return FailureClass::Timeout;
        }
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            match io_err.kind() {
                io::ErrorKind::TimedOut => return FailureClass::Timeout,
                io::ErrorKind::ConnectionRefused => return FailureClass::ConnectionRefused,
                io::ErrorKind::UnexpectedEof => return FailureClass::Eof,
                #[expect(
                    clippy::wildcard_enum_match_arm,
                    reason = "Other kinds fall through to the wrapped error."
                )]
                _ => {}
            }
            // io::Error::source skips the wrapped error itself.
            if let Some(inner) = io_err.get_ref() {
                current = Some(inner as &(dyn StdError + 'static));
                continue;
            }
        }
        current = err.source();
    }
    FailureClass::Other
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionStats {
    pub current: u64,
    pub opened: u64,
    pub closed: u64,
}

/// Live connection counters shared between a transport and its streams.
#[derive(Debug, Default)]
pub struct ConnectionGauges {
    current: AtomicU64,
    opened: AtomicU64,
    closed: AtomicU64,
}

impl ConnectionGauges {
    pub fn opened(&self) {
        self.opened.fetch_add(1, Ordering::Relaxed);
        self.current.fetch_add(1, Ordering::Relaxed);
    }

    pub fn closed(&self) {
        self.closed.fetch_add(1, Ordering::Relaxed);
        let updated = self
            .current
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |value| {
                value.checked_sub(1)
            });
        if updated.is_err() {
            debug!("Connection closed while no connection was counted as open");
        }
    }

    #[must_use]
    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            current: self.current.load(Ordering::Relaxed),
            opened: self.opened.load(Ordering::Relaxed),
            closed: self.closed.load(Ordering::Relaxed),
        }
    }
}
