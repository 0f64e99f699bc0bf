use thiserror::Error;

use super::{ConfigError, HttpError, SinkError, TemplateError, UiError, ValidationError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
    #[error("CLI error: {source}")]
    Clap {
        #[from]
        source: clap::Error,
    },
    #[error("Join error: {source}")]
    Join {
        #[from]
        source: tokio::task::JoinError,
    },
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("Request file error: {0}")]
    Template(#[from] TemplateError),
    #[error("HTTP error: {0}")]
    Http(#[from] HttpError),
    #[error("Log sink error: {0}")]
    Sink(#[from] SinkError),
    #[error("Terminal error: {0}")]
    Ui(#[from] UiError),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation<E>(error: E) -> Self
    where
        E: Into<ValidationError>,
    {
        error.into().into()
    }

    pub fn config<E>(error: E) -> Self
    where
        E: Into<ConfigError>,
    {
        error.into().into()
    }

    pub fn template<E>(error: E) -> Self
    where
        E: Into<TemplateError>,
    {
        error.into().into()
    }

    pub fn http<E>(error: E) -> Self
    where
        E: Into<HttpError>,
    {
        error.into().into()
    }

    pub fn sink<E>(error: E) -> Self
    where
        E: Into<SinkError>,
    {
        error.into().into()
    }

    pub fn ui<E>(error: E) -> Self
    where
        E: Into<UiError>,
    {
        error.into().into()
    }
}
