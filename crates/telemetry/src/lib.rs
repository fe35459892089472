pub mod logging;

pub use logging::{init_logging, init_with_service, LogConfig, LogFormat};
