pub mod common;
pub mod config;
pub mod logging;

pub use config::WatchConfig;
pub use logging::init_tracing;
