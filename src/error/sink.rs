use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("Failed to create request log '{path}': {source}")]
    CreateLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to write request log: {source}")]
    WriteLog {
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to flush request log: {source}")]
    FlushLog {
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to format log line: {source}")]
    WriteLine {
        #[source]
        source: std::fmt::Error,
    },
    #[error("Failed to create latency histogram: {source}")]
    Histogram {
        #[source]
        source: hdrhistogram::CreationError,
    },
    #[cfg(test)]
    #[error("Test expectation failed: {message}")]
    TestExpectation { message: &'static str },
    #[cfg(test)]
    #[error("Test expectation failed: {message}: {value}")]
    TestExpectationValue {
        message: &'static str,
        value: String,
    },
}
