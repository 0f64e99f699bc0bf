use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Environment variables checked, in order, for a tracing filter.
const FILTER_ENV_VARS: [&str; 2] = ["SLAPPER_LOG", "RUST_LOG"];

fn default_filter(verbose: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    }
}

pub(crate) fn resolve_filter(value: Option<&str>, verbose: bool) -> EnvFilter {
    value.map_or_else(
        || default_filter(verbose),
        |value| EnvFilter::try_new(value).unwrap_or_else(|_| EnvFilter::new("info")),
    )
}

/// Install the global subscriber. Output goes to stderr so stdout stays
/// free for the dashboard and the final summary.
pub fn init_logging(verbose: bool) {
    let value = FILTER_ENV_VARS
        .iter()
        .find_map(|name| std::env::var(name).ok());
    let filter = resolve_filter(value.as_deref(), verbose);

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set global default subscriber: {}", err);
    }
}
