//! Native Messaging - framed JSON messages over a byte stream
//!
//! Browsers talk to native helpers over the helper's stdin/stdout. Every
//! message is a 4-byte little-endian length followed by that many bytes of
//! UTF-8 JSON. This crate owns that framing and the message shapes; it knows
//! nothing about what a message asks the helper to do.
//!
//! # Example
//!
//! ```no_run
//! use native_messaging::{FrameReader, FrameWriter, Inbound, OutboundMessage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), native_messaging::ProtocolError> {
//!     let mut reader = FrameReader::new(tokio::io::stdin(), 64 * 1024 * 1024);
//!     let mut writer = FrameWriter::new(tokio::io::stdout());
//!
//!     while let Some(inbound) = reader.next_message().await? {
//!         if let Inbound::NewText(request) = inbound {
//!             writer.send(&OutboundMessage::death_notice(&request.id)).await?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

mod codec;
mod error;
pub mod message;

pub use codec::{FrameReader, FrameWriter};
pub use error::ProtocolError;
pub use message::{EditorPrefs, Inbound, NewText, OutboundMessage};
