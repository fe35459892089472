use crate::hub::StreamHub;
use bytes::BytesMut;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{ChildStderr, ChildStdout};
use tracing::{debug, error, warn};

const CHUNK_CAPACITY: usize = 8 * 1024;

/// Forward transcoder stdout to the camera's broadcast channel, chunk by
/// chunk and in arrival order. Holds nothing beyond the in-flight chunk.
/// The task ends on its own at pipe EOF when the process dies.
pub(crate) fn pump_output(
    camera_id: String,
    echo_bytes: bool,
    mut stdout: ChildStdout,
    hub: Arc<StreamHub>,
) {
    tokio::spawn(async move {
        loop {
            let mut chunk = BytesMut::with_capacity(CHUNK_CAPACITY);
            match stdout.read_buf(&mut chunk).await {
                Ok(0) => break,
                Ok(n) => {
                    if echo_bytes {
                        debug!(camera = %camera_id, bytes = n, "transcoder output chunk");
                    }
                    hub.publish(&camera_id, chunk.freeze()).await;
                }
                Err(e) => {
                    warn!(camera = %camera_id, error = %e, "transcoder output read failed");
                    break;
                }
            }
        }
    });
}

/// Funnel transcoder stderr into the log at error severity, one line at a
/// time with line endings stripped.
pub(crate) fn pump_diagnostics(camera_id: String, stderr: ChildStderr) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => error!(camera = %camera_id, "transcoder: {line}"),
                Ok(None) => break,
                Err(e) => {
                    warn!(camera = %camera_id, error = %e, "transcoder diagnostics read failed");
                    break;
                }
            }
        }
    });
}
