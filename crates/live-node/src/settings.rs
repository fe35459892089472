use anyhow::Context;
use common::CameraSettings;

/// Read-only access to persisted per-camera settings. Lookups are idempotent
/// and may be repeated without side effects.
pub trait SettingsProvider: Send + Sync {
    fn camera_settings(&self, name: &str) -> Option<CameraSettings>;
}

/// Settings held as an ordered record list; the first record matching a
/// camera name wins, later duplicates are ignored.
#[derive(Debug, Default)]
pub struct InMemorySettings {
    records: Vec<CameraSettings>,
}

impl InMemorySettings {
    pub fn new(records: Vec<CameraSettings>) -> Self {
        Self { records }
    }

    pub fn from_yaml(text: &str) -> anyhow::Result<Self> {
        let records = serde_yaml::from_str(text).context("parsing camera settings")?;
        Ok(Self::new(records))
    }
}

impl SettingsProvider for InMemorySettings {
    fn camera_settings(&self, name: &str) -> Option<CameraSettings> {
        self.records.iter().find(|r| r.name == name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_match_wins() {
        let settings = InMemorySettings::new(vec![
            CameraSettings {
                name: "cam-001".to_string(),
                resolution: Some("640x480".to_string()),
                audio: None,
            },
            CameraSettings {
                name: "cam-001".to_string(),
                resolution: Some("1920x1080".to_string()),
                audio: Some(true),
            },
        ]);

        let rec = settings.camera_settings("cam-001").unwrap();
        assert_eq!(rec.resolution.as_deref(), Some("640x480"));
        assert!(rec.audio.is_none());
    }

    #[test]
    fn missing_camera_yields_none() {
        let settings = InMemorySettings::default();
        assert!(settings.camera_settings("cam-404").is_none());
    }

    #[test]
    fn loads_from_yaml() {
        let text = "
- name: cam-001
  resolution: 640x480
  audio: true
- name: cam-002
";
        let settings = InMemorySettings::from_yaml(text).unwrap();
        let rec = settings.camera_settings("cam-001").unwrap();
        assert_eq!(rec.resolution.as_deref(), Some("640x480"));
        assert_eq!(rec.audio, Some(true));

        let rec = settings.camera_settings("cam-002").unwrap();
        assert!(rec.resolution.is_none());
        assert!(rec.audio.is_none());
    }
}
