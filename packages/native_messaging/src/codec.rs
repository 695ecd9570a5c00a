//! Length-prefixed framing over async byte streams.
//!
//! Wire format: `[4-byte little-endian length][JSON payload]`

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::io;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::length_delimited::LengthDelimitedCodecError;
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};
use tracing::{debug, warn};

use crate::error::ProtocolError;
use crate::message::{Inbound, OutboundMessage};

/// Largest frame a 4-byte length field can describe.
const MAX_WIRE_FRAME: usize = u32::MAX as usize;

fn codec(max_frame: usize) -> LengthDelimitedCodec {
    LengthDelimitedCodec::builder()
        .little_endian()
        .length_field_length(4)
        .max_frame_length(max_frame)
        .new_codec()
}

fn classify(err: io::Error, max: usize) -> ProtocolError {
    let too_large = err
        .get_ref()
        .is_some_and(|inner| inner.is::<LengthDelimitedCodecError>());
    if too_large {
        ProtocolError::FrameTooLarge { max }
    } else {
        ProtocolError::Framing(err)
    }
}

/// Reads frames from the inbound stream.
pub struct FrameReader<R> {
    inner: FramedRead<R, LengthDelimitedCodec>,
    max_frame: usize,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// `max_frame` caps the accepted payload length; it is clamped to what
    /// a 4-byte length can express.
    pub fn new(reader: R, max_frame: usize) -> Self {
        let max_frame = max_frame.min(MAX_WIRE_FRAME);
        Self {
            inner: FramedRead::new(reader, codec(max_frame)),
            max_frame,
        }
    }

    /// Read one raw frame payload.
    ///
    /// Returns `None` on a clean end of stream between frames. Running out of
    /// bytes inside a frame is a framing error.
    pub async fn read_frame(&mut self) -> Result<Option<Vec<u8>>, ProtocolError> {
        match self.inner.next().await {
            None => Ok(None),
            Some(Ok(frame)) => {
                debug!(len = frame.len(), "read frame");
                Ok(Some(frame.to_vec()))
            }
            Some(Err(e)) => Err(classify(e, self.max_frame)),
        }
    }

    /// Read and decode the next message. `None` means the peer hung up.
    pub async fn next_message(&mut self) -> Result<Option<Inbound>, ProtocolError> {
        let Some(frame) = self.read_frame().await? else {
            return Ok(None);
        };
        let msg = Inbound::decode(&frame)?;
        if let Inbound::Other(ref kind) = msg {
            warn!(msg_type = %kind, "ignoring unsupported message type");
        }
        Ok(Some(msg))
    }
}

/// Writes frames to the outbound stream, flushing after each one.
pub struct FrameWriter<W> {
    inner: FramedWrite<W, LengthDelimitedCodec>,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: FramedWrite::new(writer, codec(MAX_WIRE_FRAME)),
        }
    }

    /// Write one raw payload with its length prefix and flush.
    pub async fn write_frame(&mut self, payload: Vec<u8>) -> Result<(), ProtocolError> {
        let len = payload.len();
        if len > MAX_WIRE_FRAME {
            return Err(ProtocolError::FrameTooLarge {
                max: MAX_WIRE_FRAME,
            });
        }
        self.inner
            .send(Bytes::from(payload))
            .await
            .map_err(|e| classify(e, MAX_WIRE_FRAME))?;
        debug!(len, "sent frame");
        Ok(())
    }

    /// Serialize and write one message.
    pub async fn send(&mut self, msg: &OutboundMessage) -> Result<(), ProtocolError> {
        let bytes = serde_json::to_vec(msg)?;
        self.write_frame(bytes).await
    }
}
