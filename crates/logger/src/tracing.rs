use std::env::var;

use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{
    Layer, filter::EnvFilter, layer::SubscriberExt, registry::Registry,
    util::{SubscriberInitExt, TryInitError},
};

/// Output format of the installed subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl LogFormat {
    /// Read the format from `RUST_LOG_FORMAT` (`json` or anything else for compact)
    pub fn from_env() -> Self {
        let raw = var("RUST_LOG_FORMAT")
            .inspect_err(|error| {
                warn!("Failed to read RUST_LOG_FORMAT, falling back to default: {error}")
            })
            .unwrap_or_default();
        Self::parse(&raw)
    }

    fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Compact,
        }
    }
}

/// Install the global subscriber with an INFO default, format taken from the environment.
///
/// Panics if a global subscriber is already set; use [`try_init`] where that can happen.
pub fn init() {
    init_with(LogFormat::from_env(), LevelFilter::INFO);
}

/// Install the global subscriber with an explicit format and default level.
pub fn init_with(format: LogFormat, level: LevelFilter) {
    registry(format, level).init();
}

/// Like [`init_with`] but reports an already-installed subscriber instead of panicking.
pub fn try_init(format: LogFormat, level: LevelFilter) -> Result<(), TryInitError> {
    registry(format, level).try_init()
}

fn registry(
    format: LogFormat,
    level: LevelFilter,
) -> tracing_subscriber::layer::Layered<Box<dyn Layer<Registry> + Send + Sync>, Registry> {
    let env_filter = EnvFilter::builder().with_default_directive(level.into()).from_env_lossy();

    let log_layer = match format {
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(false)
            .with_filter(env_filter)
            .boxed(),
        LogFormat::Compact => tracing_subscriber::fmt::layer()
            .compact()
            .without_time()
            .with_target(true)
            .with_filter(env_filter)
            .boxed(),
    };

    tracing_subscriber::registry().with(log_layer)
}
