use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

/// Per-camera broadcast fan-out for live transcoder output.
///
/// Channels are created lazily on first publish or subscribe. Publishing is
/// fire-and-forget: a channel with no subscribers drops the chunk, and slow
/// subscribers lag rather than backpressure the producer.
pub struct StreamHub {
    capacity: usize,
    channels: Mutex<HashMap<String, broadcast::Sender<Bytes>>>,
}

impl StreamHub {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(Self {
            capacity,
            channels: Mutex::new(HashMap::new()),
        })
    }

    async fn sender(&self, channel_id: &str) -> broadcast::Sender<Bytes> {
        let mut channels = self.channels.lock().await;
        channels
            .entry(channel_id.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    pub async fn publish(&self, channel_id: &str, bytes: Bytes) {
        let tx = self.sender(channel_id).await;
        // send only fails when nobody is subscribed
        let _ = tx.send(bytes);
    }

    pub async fn subscribe(&self, channel_id: &str) -> broadcast::Receiver<Bytes> {
        self.sender(channel_id).await.subscribe()
    }
}
