//! Request templates, `.http` file parsing, and the instrumented transports.
mod httpfile;
mod template;
pub mod transport;


pub use httpfile::{ParseOptions, load_templates, parse_templates};
pub use template::{RequestPool, RequestTemplate};
pub use transport::{
    ConnectionStats, Transport, TransportConfig, TransportError, TransportKind, build_transport,
};
