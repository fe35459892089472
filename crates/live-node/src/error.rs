use thiserror::Error;

/// Failures a session reduces to a log entry plus a state transition.
/// None of these propagate out of the public start/stop/restart surface.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("transcoder capacity reached")]
    CapacityExceeded,

    #[error("failed to spawn transcoder: {0}")]
    Spawn(#[from] std::io::Error),
}
