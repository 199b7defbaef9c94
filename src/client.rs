//! Collector RPC client.
//!
//! The collector contract is a single call: `collect(batch) -> ack`. The
//! trait seam lets the channel manager hand out whatever transport backs the
//! current connection, and lets tests substitute an in-memory client.

use crate::codec::{FrameCodec, WireResult};
use crate::wire::{CollectAck, MetricBatch};
use async_trait::async_trait;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;

/// One-method client for the collector's ingest contract.
#[async_trait]
pub trait CollectorClient: Send + Sync {
    /// Delivers one batch and waits for the collector's acknowledgement.
    ///
    /// The call blocks its own worker for the duration; callers must not
    /// share a worker with any producer schedule.
    async fn collect(&self, batch: MetricBatch) -> WireResult<CollectAck>;
}

/// [`CollectorClient`] over a framed TCP connection.
///
/// The stream and codec are guarded by one mutex so concurrent callers
/// cannot interleave frames. Handles are replaced wholesale on reconnect;
/// never cache one across channel status transitions.
pub struct TcpCollectorClient {
    inner: Mutex<(TcpStream, FrameCodec)>,
    io_timeout: Duration,
}

impl TcpCollectorClient {
    /// Wraps an established stream.
    pub fn new(stream: TcpStream, max_frame_len: usize, io_timeout: Duration) -> Self {
        Self {
            inner: Mutex::new((stream, FrameCodec::new(max_frame_len))),
            io_timeout,
        }
    }
}

#[async_trait]
impl CollectorClient for TcpCollectorClient {
    async fn collect(&self, batch: MetricBatch) -> WireResult<CollectAck> {
        let mut guard = self.inner.lock().await;
        let (stream, codec) = &mut *guard;

        codec.write_frame(stream, &batch, self.io_timeout).await?;
        codec.read_frame(stream, self.io_timeout).await
    }
}
