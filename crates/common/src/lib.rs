pub mod camera;
pub mod settings;

pub use camera::CameraStreamConfig;
pub use settings::CameraSettings;
