//! Framing for collector-bound protobuf messages.
//!
//! Every frame on the wire is `u32 length (LE) + u32 crc32 (LE) + N bytes of
//! prost-encoded message`. The checksum covers the message bytes only. A
//! zero-length body is a valid frame: messages whose fields are all at their
//! defaults, acknowledgements in particular, encode to nothing.

use bytes::{BufMut, BytesMut};
use prost::Message;
use std::io;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::{timeout, Duration};

/// Frame header size: message length plus checksum.
const HEADER_LEN: usize = 8;

/// Result type for wire operations.
pub type WireResult<T> = Result<T, WireError>;

/// Errors raised by the collector transport.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WireError {
    #[error("operation timed out")]
    Timeout,

    #[error("frame too large: {size} bytes (max: {max_size})")]
    TooLarge { size: usize, max_size: usize },

    #[error("crc32 mismatch: expected {expected:08x}, got {actual:08x}")]
    CrcMismatch { expected: u32, actual: u32 },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("protobuf decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("protobuf encode error: {0}")]
    Encode(String),

    #[error("peer closed the connection")]
    PeerClosed,
}

impl WireError {
    fn from_read(err: io::Error) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::PeerClosed
        } else {
            Self::Io(err)
        }
    }
}

/// Encoder/decoder for length + crc32 framed prost messages.
///
/// The codec owns a reusable read buffer; one codec instance services one
/// connection at a time.
pub struct FrameCodec {
    max_frame_len: usize,
    read_buf: BytesMut,
}

impl FrameCodec {
    /// Creates a codec that rejects frames larger than `max_frame_len`.
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            max_frame_len,
            read_buf: BytesMut::with_capacity(8192),
        }
    }

    /// Encodes `message` and writes one frame, bounded by `io_timeout`.
    pub async fn write_frame<T, W>(
        &mut self,
        writer: &mut W,
        message: &T,
        io_timeout: Duration,
    ) -> WireResult<()>
    where
        T: Message,
        W: AsyncWrite + Unpin,
    {
        let mut body = BytesMut::with_capacity(message.encoded_len());
        message
            .encode(&mut body)
            .map_err(|e| WireError::Encode(e.to_string()))?;

        if body.len() > self.max_frame_len {
            return Err(WireError::TooLarge {
                size: body.len(),
                max_size: self.max_frame_len,
            });
        }

        let mut frame = BytesMut::with_capacity(HEADER_LEN + body.len());
        frame.put_u32_le(body.len() as u32);
        frame.put_u32_le(checksum(&body));
        frame.extend_from_slice(&body);

        timeout(io_timeout, async {
            writer.write_all(&frame).await?;
            writer.flush().await
        })
        .await
        .map_err(|_| WireError::Timeout)?
        .map_err(WireError::Io)?;

        Ok(())
    }

    /// Reads one frame and decodes it, bounded by `io_timeout`.
    pub async fn read_frame<T, R>(&mut self, reader: &mut R, io_timeout: Duration) -> WireResult<T>
    where
        T: Message + Default,
        R: AsyncRead + Unpin,
    {
        let mut header = [0u8; HEADER_LEN];
        timeout(io_timeout, reader.read_exact(&mut header))
            .await
            .map_err(|_| WireError::Timeout)?
            .map_err(WireError::from_read)?;

        let body_len = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        let body_len = body_len as usize;
        if body_len > self.max_frame_len {
            return Err(WireError::TooLarge {
                size: body_len,
                max_size: self.max_frame_len,
            });
        }

        self.read_buf.clear();
        self.read_buf.resize(body_len, 0);
        timeout(io_timeout, reader.read_exact(&mut self.read_buf))
            .await
            .map_err(|_| WireError::Timeout)?
            .map_err(WireError::from_read)?;

        let actual_crc = checksum(&self.read_buf);
        if actual_crc != expected_crc {
            return Err(WireError::CrcMismatch {
                expected: expected_crc,
                actual: actual_crc,
            });
        }

        Ok(T::decode(&self.read_buf[..])?)
    }
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(1024 * 1024)
    }
}

fn checksum(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::{CollectAck, MetricBatch, MetricRecord};
    use tokio::io::duplex;

    fn test_batch() -> MetricBatch {
        MetricBatch {
            instance_id: 42,
            records: vec![MetricRecord {
                time_millis: 1_700_000_000_000,
                ..Default::default()
            }],
        }
    }

    #[tokio::test]
    async fn frame_roundtrip() {
        let mut codec = FrameCodec::new(1024);
        let (mut client, mut server) = duplex(1024);
        let io_timeout = Duration::from_secs(1);

        codec
            .write_frame(&mut client, &test_batch(), io_timeout)
            .await
            .expect("write frame");

        let decoded: MetricBatch = codec
            .read_frame(&mut server, io_timeout)
            .await
            .expect("read frame");

        assert_eq!(decoded, test_batch());
    }

    #[tokio::test]
    async fn oversized_frame_rejected_on_write() {
        let mut codec = FrameCodec::new(4);
        let (mut client, _server) = duplex(1024);

        let batch = MetricBatch {
            instance_id: 1,
            records: vec![MetricRecord::default(); 16],
        };

        let result = codec
            .write_frame(&mut client, &batch, Duration::from_secs(1))
            .await;

        match result {
            Err(WireError::TooLarge { size, max_size }) => {
                assert!(size > max_size);
                assert_eq!(max_size, 4);
            }
            other => panic!("expected TooLarge, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn corrupted_checksum_detected() {
        let mut codec = FrameCodec::new(1024);
        let (mut client, mut server) = duplex(1024);

        let body = {
            let mut buf = BytesMut::new();
            prost::Message::encode(&test_batch(), &mut buf).expect("encode");
            buf
        };

        let mut frame = BytesMut::new();
        frame.put_u32_le(body.len() as u32);
        frame.put_u32_le(checksum(&body).wrapping_add(1));
        frame.extend_from_slice(&body);
        client.write_all(&frame).await.expect("write raw frame");

        let result: WireResult<MetricBatch> =
            codec.read_frame(&mut server, Duration::from_secs(1)).await;

        assert!(matches!(result, Err(WireError::CrcMismatch { .. })));
    }

    #[tokio::test]
    async fn empty_body_ack_roundtrips() {
        // Acks carry no fields and encode to a zero-length body; the codec
        // must carry them rather than reject the frame.
        let mut codec = FrameCodec::new(1024);
        let (mut client, mut server) = duplex(64);
        let io_timeout = Duration::from_secs(1);

        codec
            .write_frame(&mut client, &CollectAck {}, io_timeout)
            .await
            .expect("write ack frame");

        let decoded: CollectAck = codec
            .read_frame(&mut server, io_timeout)
            .await
            .expect("read ack frame");

        assert_eq!(decoded, CollectAck {});
    }

    #[tokio::test]
    async fn read_times_out_without_data() {
        let mut codec = FrameCodec::new(1024);
        let (_client, mut server) = duplex(64);

        let result: WireResult<MetricBatch> = codec
            .read_frame(&mut server, Duration::from_millis(10))
            .await;

        assert!(matches!(result, Err(WireError::Timeout)));
    }

    #[tokio::test]
    async fn closed_peer_reported() {
        let mut codec = FrameCodec::new(1024);
        let (client, mut server) = duplex(64);
        drop(client);

        let result: WireResult<MetricBatch> =
            codec.read_frame(&mut server, Duration::from_secs(1)).await;

        assert!(matches!(result, Err(WireError::PeerClosed)));
    }
}
