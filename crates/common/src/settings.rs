use serde::{Deserialize, Serialize};

/// Persisted per-camera override record, keyed by camera name.
/// Both fields are optional: an absent field leaves the corresponding
/// stream option untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CameraSettings {
  pub name: String,
  /// Overrides the scaling flag when present, e.g. "640x480".
  #[serde(default)]
  pub resolution: Option<String>,
  /// Re-evaluates audio when present: true installs the audio bundle,
  /// false strips it and installs the explicit no-audio marker.
  #[serde(default)]
  pub audio: Option<bool>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn optional_fields_default_to_none() {
    let rec: CameraSettings = serde_json::from_str(r#"{"name":"cam-001"}"#).unwrap();
    assert_eq!(rec.name, "cam-001");
    assert!(rec.resolution.is_none());
    assert!(rec.audio.is_none());
  }
}
