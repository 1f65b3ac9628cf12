//! Shared tracing setup for the uppe binaries.

mod tracing;

pub use self::tracing::{LogFormat, init, init_with, try_init};
pub use ::tracing::level_filters::LevelFilter;
