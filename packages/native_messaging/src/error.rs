use thiserror::Error;

/// Failures of the framed channel. All of them end the read loop.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The stream ended in the middle of a frame, or the transport failed.
    #[error("framing error: {0}")]
    Framing(#[from] std::io::Error),

    /// A frame was (or would be) longer than the channel accepts.
    #[error("frame exceeds {max} bytes")]
    FrameTooLarge { max: usize },

    /// A frame's payload was not a valid message.
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
}
