pub mod admission;
pub mod config;
pub mod error;
pub mod hub;
pub mod settings;
pub mod stream;

pub use admission::{AdmissionControl, TranscodeSlots};
pub use config::Config;
pub use error::SessionError;
pub use hub::StreamHub;
pub use settings::{InMemorySettings, SettingsProvider};
pub use stream::manager::StreamManager;
pub use stream::options::{OptionSet, StreamOptions};
pub use stream::session::{SessionRuntime, SessionState, TranscoderSession};
