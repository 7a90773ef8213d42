//! Process-level plumbing: layered configuration and logging setup.

pub mod config;
pub mod home_dir;
pub mod logging;

pub use config::{AppConfig, CliArgs, LoggingConfig, Section, ServerConfig, StoreConfig};
pub use home_dir::resolve_home_dir;
pub use logging::init_logging_from_config;
