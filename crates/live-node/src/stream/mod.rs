pub mod manager;
pub mod options;
pub(crate) mod relay;
pub mod session;

pub use manager::StreamManager;
pub use options::{OptionSet, StreamOptions};
pub use session::{SessionRuntime, SessionState, TranscoderSession};
