pub mod config;
pub mod observability;
pub mod wiring;

pub use config::AppConfig;
pub use observability::{apply_logging_level, init_tracing};
pub use wiring::{WiringError, build_deps};
