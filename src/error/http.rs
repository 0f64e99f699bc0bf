use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("Failed to build HTTP client: {source}")]
    BuildClientFailed {
        #[source]
        source: reqwest::Error,
    },
    #[error("Failed to initialize TLS: {source}")]
    TlsInit {
        #[source]
        source: native_tls::Error,
    },
}
