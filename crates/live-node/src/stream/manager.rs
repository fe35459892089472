use crate::admission::AdmissionControl;
use crate::hub::StreamHub;
use crate::settings::SettingsProvider;
use crate::stream::session::{SessionRuntime, TranscoderSession};
use common::CameraStreamConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Registry pairing cameras with their sessions. The slot pool and the
/// broadcast hub are shared across every session the manager creates;
/// everything else is per camera.
pub struct StreamManager {
    slots: Arc<dyn AdmissionControl>,
    hub: Arc<StreamHub>,
    runtime: SessionRuntime,
    sessions: Mutex<HashMap<String, Arc<TranscoderSession>>>,
}

impl StreamManager {
    pub fn new(
        slots: Arc<dyn AdmissionControl>,
        hub: Arc<StreamHub>,
        runtime: SessionRuntime,
    ) -> Self {
        Self {
            slots,
            hub,
            runtime,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn hub(&self) -> &Arc<StreamHub> {
        &self.hub
    }

    /// Create the session for a camera and apply its persisted overrides.
    /// Replacing an existing camera tears the old session down first.
    pub async fn add_camera(
        &self,
        config: &CameraStreamConfig,
        settings: &dyn SettingsProvider,
    ) -> Arc<TranscoderSession> {
        let session = TranscoderSession::new(
            config,
            Arc::clone(&self.slots),
            Arc::clone(&self.hub),
            self.runtime.clone(),
        );
        session.configure_stream_options(settings).await;

        let mut sessions = self.sessions.lock().await;
        if let Some(previous) = sessions.insert(config.id.clone(), Arc::clone(&session)) {
            warn!(camera = %config.id, "replacing existing camera session");
            previous.shutdown().await;
        }
        info!(camera = %config.id, "camera added");
        session
    }

    /// Tear the camera's session down and forget it. The pending restart
    /// timer (if any) is cancelled so the camera is not resurrected.
    pub async fn remove_camera(&self, camera_id: &str) {
        let session = self.sessions.lock().await.remove(camera_id);
        match session {
            Some(session) => {
                session.shutdown().await;
                info!(camera = %camera_id, "camera removed");
            }
            None => warn!(camera = %camera_id, "remove ignored, unknown camera"),
        }
    }

    pub async fn get(&self, camera_id: &str) -> Option<Arc<TranscoderSession>> {
        self.sessions.lock().await.get(camera_id).cloned()
    }

    pub async fn camera_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.sessions.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn shutdown_all(&self) {
        let sessions: Vec<Arc<TranscoderSession>> =
            self.sessions.lock().await.values().cloned().collect();
        for session in sessions {
            session.shutdown().await;
        }
    }
}
