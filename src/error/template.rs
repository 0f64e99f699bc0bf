use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Failed to read request file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Request file '{path}' contains no requests.")]
    NoRequests { path: PathBuf },
    #[error("Request #{index} has an invalid URL '{url}': {source}")]
    InvalidUrl {
        index: usize,
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("Request #{index} has an invalid header '{name}'.")]
    InvalidHeader { index: usize, name: String },
    #[error("Request #{index} uses unsupported method '{method}'.")]
    UnsupportedMethod { index: usize, method: String },
}
