use serde::{Deserialize, Serialize};

/// Declarative definition of one camera, fixed for the camera's lifetime.
/// Loaded from the node's camera file; runtime tuning happens through the
/// session's stream options, never by mutating this record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CameraStreamConfig {
  pub id: String,
  /// Transcoder input specification, e.g. "-rtsp_transport tcp -i rtsp://...".
  /// Must contain the "-i" input marker.
  pub input: String,
  pub max_width: u32,
  pub max_height: u32,
  /// Video bitrate cap, in the unit the transcoder expects for -b:v.
  pub max_bitrate: u32,
  pub max_fps: u32,
  #[serde(default = "default_preset")]
  pub encoder_preset: String,
  /// Input stream selector for video, e.g. "0:v:0".
  #[serde(default)]
  pub video_map: Option<String>,
  /// Input stream selector for audio, only consulted when audio is on.
  #[serde(default)]
  pub audio_map: Option<String>,
  #[serde(default)]
  pub video_filter: Option<String>,
  #[serde(default)]
  pub audio: bool,
  #[serde(default)]
  pub debug: bool,
}

fn default_preset() -> String {
  "ultrafast".to_string()
}
