use crate::admission::AdmissionControl;
use crate::error::SessionError;
use crate::hub::StreamHub;
use crate::settings::SettingsProvider;
use crate::stream::options::StreamOptions;
use crate::stream::relay;
use common::CameraStreamConfig;
use std::os::unix::process::ExitStatusExt;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const EXIT_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No process. The only state a start is accepted from.
    Idle,
    /// Process spawned, output flowing.
    Running,
    /// Kill signal sent, waiting for the exit watcher to observe the exit.
    Stopping,
}

/// Node-level knobs shared by every session the node creates.
#[derive(Debug, Clone)]
pub struct SessionRuntime {
    pub transcoder_bin: String,
    pub restart_delay: Duration,
}

impl Default for SessionRuntime {
    fn default() -> Self {
        Self {
            transcoder_bin: "ffmpeg".to_string(),
            restart_delay: Duration::from_millis(1500),
        }
    }
}

struct Inner {
    state: SessionState,
    child: Option<Child>,
    /// Bumped on every spawn; lets a stale exit watcher stand down.
    epoch: u64,
    restart_timer: Option<JoinHandle<()>>,
    options: StreamOptions,
}

/// One camera, at most one live transcoder process.
///
/// All mutation funnels through one async mutex, so no two operations or
/// callbacks for the same session ever interleave; sessions for different
/// cameras are fully independent apart from the shared admission slots.
pub struct TranscoderSession {
    camera_id: String,
    debug_output: bool,
    runtime: SessionRuntime,
    slots: Arc<dyn AdmissionControl>,
    hub: Arc<StreamHub>,
    inner: Mutex<Inner>,
}

impl TranscoderSession {
    pub fn new(
        config: &CameraStreamConfig,
        slots: Arc<dyn AdmissionControl>,
        hub: Arc<StreamHub>,
        runtime: SessionRuntime,
    ) -> Arc<Self> {
        Arc::new(Self {
            camera_id: config.id.clone(),
            debug_output: config.debug,
            runtime,
            slots,
            hub,
            inner: Mutex::new(Inner {
                state: SessionState::Idle,
                child: None,
                epoch: 0,
                restart_timer: None,
                options: StreamOptions::from_config(config),
            }),
        })
    }

    pub fn camera_id(&self) -> &str {
        &self.camera_id
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    pub async fn current_source(&self) -> String {
        self.inner.lock().await.options.source().to_string()
    }

    /// The argument list the next start would spawn with.
    pub async fn current_args(&self) -> Vec<String> {
        self.inner.lock().await.options.to_args()
    }

    /// Start the transcoder. Failures (denied admission, spawn error) are
    /// reported through the returned error and leave the session Idle; a
    /// start while Running or Stopping is a no-op.
    pub async fn try_start(self: &Arc<Self>) -> Result<(), SessionError> {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Idle {
            debug!(camera = %self.camera_id, state = ?inner.state, "start ignored, transcoder already active");
            return Ok(());
        }

        if !self.slots.try_acquire() {
            return Err(SessionError::CapacityExceeded);
        }

        let args = inner.options.to_args();
        debug!(camera = %self.camera_id, args = ?args, "launching transcoder");

        let mut child = match Command::new(&self.runtime.transcoder_bin)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) => {
                // the slot must not outlive a spawn that never happened
                self.slots.release();
                return Err(SessionError::Spawn(e));
            }
        };

        if let Some(stdout) = child.stdout.take() {
            relay::pump_output(
                self.camera_id.clone(),
                self.debug_output,
                stdout,
                Arc::clone(&self.hub),
            );
        }
        if let Some(stderr) = child.stderr.take() {
            relay::pump_diagnostics(self.camera_id.clone(), stderr);
        }

        inner.child = Some(child);
        inner.state = SessionState::Running;
        inner.epoch += 1;
        let epoch = inner.epoch;
        info!(camera = %self.camera_id, "transcoder started");

        let session = Arc::clone(self);
        tokio::spawn(async move {
            session.watch_exit(epoch).await;
        });
        Ok(())
    }

    /// Start, reducing every failure to a log entry as the caller-facing
    /// API requires.
    pub async fn start(self: &Arc<Self>) {
        match self.try_start().await {
            Ok(()) => {}
            Err(e @ SessionError::CapacityExceeded) => {
                error!(camera = %self.camera_id, "{e}, stream not started");
            }
            Err(e) => {
                error!(camera = %self.camera_id, error = %e, "transcoder failed to start");
            }
        }
    }

    /// Signal the transcoder to terminate. Fire-and-forget: the state
    /// transition to Idle happens only when the exit watcher observes the
    /// process exit. No-op while Idle.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        self.signal_stop(&mut inner);
    }

    fn signal_stop(&self, inner: &mut Inner) {
        match inner.child.as_mut() {
            None => {
                debug!(camera = %self.camera_id, "stop ignored, no transcoder running");
            }
            Some(child) => {
                if let Err(e) = child.start_kill() {
                    warn!(camera = %self.camera_id, error = %e, "failed to signal transcoder");
                } else {
                    info!(camera = %self.camera_id, "transcoder stop requested");
                    inner.state = SessionState::Stopping;
                }
            }
        }
    }

    /// Stop, then start again after the configured delay (long enough for
    /// the exit watcher to free the slot). From Idle this is a plain start.
    /// The deferred start is cancellable; a second restart supersedes it.
    pub async fn restart(self: &Arc<Self>) {
        let mut inner = self.inner.lock().await;
        match inner.state {
            SessionState::Idle => {
                drop(inner);
                self.start().await;
            }
            SessionState::Running | SessionState::Stopping => {
                self.signal_stop(&mut inner);
                if let Some(timer) = inner.restart_timer.take() {
                    timer.abort();
                }
                let session = Arc::clone(self);
                let delay = self.runtime.restart_delay;
                inner.restart_timer = Some(tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    session.start().await;
                }));
            }
        }
    }

    /// Replace the input source for the next start. Rejected with a warning
    /// (prior value kept) unless the value carries the "-i" input marker.
    /// Does not touch a running process; callers restart to apply it.
    pub async fn set_stream_source(&self, source: &str) {
        let mut inner = self.inner.lock().await;
        if inner.options.set_source(source) {
            debug!(camera = %self.camera_id, source, "stream source updated");
        } else {
            warn!(camera = %self.camera_id, source, "rejected stream source without -i input marker");
        }
    }

    /// Merge flag/value pairs into the option set, effective on next start.
    pub async fn set_stream_options<I>(&self, pairs: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut inner = self.inner.lock().await;
        inner.options.merge(pairs);
    }

    /// Remove named flags from the option set, effective on next start.
    pub async fn del_stream_options<I, S>(&self, flags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut inner = self.inner.lock().await;
        inner.options.remove_flags(flags);
    }

    /// Apply the persisted per-camera override record, if one exists.
    /// Absence is not an error; the options are simply left unchanged.
    pub async fn configure_stream_options(&self, settings: &dyn SettingsProvider) {
        let mut inner = self.inner.lock().await;
        if let Some(record) = settings.camera_settings(&self.camera_id) {
            inner.options.apply_settings(&record);
            info!(
                camera = %self.camera_id,
                resolution = ?record.resolution,
                audio = ?record.audio,
                "applied persisted stream settings"
            );
        }
    }

    /// Teardown for camera removal: cancel any pending deferred restart and
    /// signal the process. The exit watcher still performs the slot release
    /// once the process actually exits.
    pub async fn shutdown(&self) {
        let mut inner = self.inner.lock().await;
        if let Some(timer) = inner.restart_timer.take() {
            timer.abort();
        }
        if inner.child.is_some() {
            self.signal_stop(&mut inner);
        }
    }

    /// Poll the child until it exits, then release the slot, clear the
    /// handle and return to Idle. Runs once per spawned process; a stale
    /// watcher from a previous spawn stands down via the epoch guard.
    async fn watch_exit(self: Arc<Self>, epoch: u64) {
        loop {
            tokio::time::sleep(EXIT_POLL_INTERVAL).await;
            let mut inner = self.inner.lock().await;
            if inner.epoch != epoch {
                return;
            }
            let status = match inner.child.as_mut() {
                None => return,
                Some(child) => match child.try_wait() {
                    Ok(Some(status)) => status,
                    Ok(None) => continue,
                    Err(e) => {
                        warn!(camera = %self.camera_id, error = %e, "failed to poll transcoder status");
                        continue;
                    }
                },
            };

            inner.child = None;
            inner.state = SessionState::Idle;
            self.slots.release();
            drop(inner);

            match status.code() {
                Some(code) if code != 0 => {
                    error!(
                        camera = %self.camera_id,
                        code,
                        signal = ?status.signal(),
                        "transcoder exited abnormally"
                    );
                }
                _ => {
                    debug!(
                        camera = %self.camera_id,
                        signal = ?status.signal(),
                        "transcoder exited"
                    );
                }
            }
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::TranscodeSlots;
    use crate::settings::InMemorySettings;
    use common::CameraSettings;

    fn camera() -> CameraStreamConfig {
        CameraStreamConfig {
            id: "cam-001".to_string(),
            input: "-i rtsp://10.0.0.5/stream".to_string(),
            max_width: 1280,
            max_height: 720,
            max_bitrate: 300,
            max_fps: 15,
            encoder_preset: "ultrafast".to_string(),
            video_map: None,
            audio_map: None,
            video_filter: None,
            audio: false,
            debug: false,
        }
    }

    #[tokio::test]
    async fn denied_admission_keeps_session_idle() {
        let slots = TranscodeSlots::new(0);
        let hub = StreamHub::new(16);
        let session = TranscoderSession::new(
            &camera(),
            slots.clone(),
            hub,
            SessionRuntime::default(),
        );

        let result = session.try_start().await;
        assert!(matches!(result, Err(SessionError::CapacityExceeded)));
        assert_eq!(session.state().await, SessionState::Idle);
        assert_eq!(slots.available(), 0);
    }

    #[tokio::test]
    async fn spawn_failure_releases_the_slot() {
        let slots = TranscodeSlots::new(1);
        let hub = StreamHub::new(16);
        let runtime = SessionRuntime {
            transcoder_bin: "/nonexistent/transcoder".to_string(),
            ..SessionRuntime::default()
        };
        let session = TranscoderSession::new(&camera(), slots.clone(), hub, runtime);

        let result = session.try_start().await;
        assert!(matches!(result, Err(SessionError::Spawn(_))));
        assert_eq!(session.state().await, SessionState::Idle);
        assert_eq!(slots.available(), 1);
    }

    #[tokio::test]
    async fn stop_while_idle_is_a_no_op() {
        let slots = TranscodeSlots::new(1);
        let hub = StreamHub::new(16);
        let session =
            TranscoderSession::new(&camera(), slots.clone(), hub, SessionRuntime::default());

        session.stop().await;
        assert_eq!(session.state().await, SessionState::Idle);
        assert_eq!(slots.available(), 1);
    }

    #[tokio::test]
    async fn invalid_source_keeps_prior_value() {
        let slots = TranscodeSlots::new(1);
        let hub = StreamHub::new(16);
        let session =
            TranscoderSession::new(&camera(), slots, hub, SessionRuntime::default());

        session.set_stream_source("rtsp://missing-marker").await;
        assert_eq!(session.current_source().await, "-i rtsp://10.0.0.5/stream");

        session.set_stream_source("-i rtsp://other/live").await;
        assert_eq!(session.current_source().await, "-i rtsp://other/live");
    }

    #[tokio::test]
    async fn runtime_mutations_show_up_in_next_args() {
        let slots = TranscodeSlots::new(1);
        let hub = StreamHub::new(16);
        let session =
            TranscoderSession::new(&camera(), slots, hub, SessionRuntime::default());

        session
            .set_stream_options(vec![("-r".to_string(), "30".to_string())])
            .await;
        session.del_stream_options(["-threads"]).await;

        let joined = session.current_args().await.join(" ");
        assert!(joined.contains("-r 30"));
        assert!(!joined.contains("-threads"));
    }

    #[tokio::test]
    async fn persisted_settings_apply_by_camera_name() {
        let slots = TranscodeSlots::new(1);
        let hub = StreamHub::new(16);
        let session =
            TranscoderSession::new(&camera(), slots, hub, SessionRuntime::default());

        let settings = InMemorySettings::new(vec![CameraSettings {
            name: "cam-001".to_string(),
            resolution: Some("640x480".to_string()),
            audio: Some(true),
        }]);
        session.configure_stream_options(&settings).await;

        let joined = session.current_args().await.join(" ");
        assert!(joined.contains("-s 640x480"));
        assert!(joined.contains("-codec:a mp2"));
    }

    #[tokio::test]
    async fn absent_settings_change_nothing() {
        let slots = TranscodeSlots::new(1);
        let hub = StreamHub::new(16);
        let session =
            TranscoderSession::new(&camera(), slots, hub, SessionRuntime::default());

        let before = session.current_args().await;
        session
            .configure_stream_options(&InMemorySettings::default())
            .await;
        assert_eq!(session.current_args().await, before);
    }
}
