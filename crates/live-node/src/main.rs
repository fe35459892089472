use anyhow::Context;
use live_node::{
    Config, InMemorySettings, SessionRuntime, StreamHub, StreamManager, TranscodeSlots,
};
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    telemetry::init_with_service("live-node");

    let config = Config::from_env()?;

    let cameras_text = tokio::fs::read_to_string(&config.cameras_file)
        .await
        .with_context(|| format!("reading cameras file {}", config.cameras_file))?;
    let cameras: Vec<common::CameraStreamConfig> =
        serde_yaml::from_str(&cameras_text).context("parsing cameras file")?;

    let settings = match &config.settings_file {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("reading settings file {path}"))?;
            InMemorySettings::from_yaml(&text)?
        }
        None => InMemorySettings::default(),
    };

    let slots = TranscodeSlots::new(config.max_transcodes);
    let hub = StreamHub::new(config.broadcast_capacity);
    let runtime = SessionRuntime {
        transcoder_bin: config.transcoder_bin.clone(),
        restart_delay: Duration::from_millis(config.restart_delay_ms),
    };
    let manager = StreamManager::new(slots, hub, runtime);

    for camera in &cameras {
        let session = manager.add_camera(camera, &settings).await;
        session.start().await;
    }
    info!(cameras = cameras.len(), max_transcodes = config.max_transcodes, "live-node started");

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    manager.shutdown_all().await;

    Ok(())
}
