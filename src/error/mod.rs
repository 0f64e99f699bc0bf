mod app;
mod config;
mod http;
mod sink;
mod template;
mod ui;
mod validation;

#[cfg(test)]
mod test_support;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use http::HttpError;
pub use sink::SinkError;
pub use template::TemplateError;
pub use ui::UiError;
pub use validation::ValidationError;
