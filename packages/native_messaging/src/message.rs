//! Message shapes exchanged with the browser extension.
//!
//! Every frame carries `{"type": "...", "payload": {...}}`. Inbound frames are
//! first read as a loose [`Envelope`] so that unknown types can be skipped
//! without failing the whole stream.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Wire envelope wrapping every inbound message.
#[derive(Debug, Deserialize)]
struct Envelope {
    /// Message type tag.
    #[serde(rename = "type", default)]
    msg_type: String,
    #[serde(default)]
    payload: serde_json::Value,
}

/// Editor preferences as nested by the mail-client extension.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorPrefs {
    #[serde(default)]
    pub editor: String,
    #[serde(default)]
    pub extension: String,
}

/// Request to open `text` in the user's editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewText {
    /// Client-assigned and opaque; correlates every message of one session.
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub text: String,
    /// Caret position as a character offset into `text`. May be out of range.
    #[serde(default)]
    pub caret: i64,
    #[serde(default)]
    pub subject: String,
    /// JSON-encoded array of argument-template strings.
    #[serde(default)]
    pub editor: String,
    #[serde(default)]
    pub extension: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefs: Option<EditorPrefs>,
}

impl NewText {
    /// The editor template, preferring the top-level field over `prefs`.
    pub fn editor_template(&self) -> &str {
        match &self.prefs {
            Some(prefs) if self.editor.is_empty() => &prefs.editor,
            _ => &self.editor,
        }
    }

    /// The file extension, preferring the top-level field over `prefs`.
    pub fn file_extension(&self) -> &str {
        match &self.prefs {
            Some(prefs) if self.extension.is_empty() => &prefs.extension,
            _ => &self.extension,
        }
    }
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    NewText(NewText),
    /// Any type this helper does not act on.
    Other(String),
}

impl Inbound {
    /// Decode one frame payload.
    pub fn decode(bytes: &[u8]) -> Result<Self, ProtocolError> {
        // Only a JSON object is an envelope; arrays must not decode positionally.
        let object: serde_json::Map<String, serde_json::Value> = serde_json::from_slice(bytes)?;
        let envelope: Envelope = serde_json::from_value(serde_json::Value::Object(object))?;
        match envelope.msg_type.as_str() {
            "new_text" => {
                let payload = if envelope.payload.is_null() {
                    NewText::default()
                } else {
                    serde_json::from_value(envelope.payload)?
                };
                Ok(Inbound::NewText(payload))
            }
            _ => Ok(Inbound::Other(envelope.msg_type)),
        }
    }
}

/// Messages the helper sends back to the extension.
///
/// Empty fields are left out of the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Current file contents after a detected change.
    TextUpdate {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        id: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        text: String,
    },
    /// The session has ended and released its resources.
    DeathNotice {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        id: String,
    },
    /// A fatal condition, human-readable.
    Error {
        #[serde(default, skip_serializing_if = "String::is_empty")]
        error: String,
    },
}

impl OutboundMessage {
    pub fn text_update(id: impl Into<String>, text: impl Into<String>) -> Self {
        Self::TextUpdate {
            id: id.into(),
            text: text.into(),
        }
    }

    pub fn death_notice(id: impl Into<String>) -> Self {
        Self::DeathNotice { id: id.into() }
    }

    pub fn error(error: impl std::fmt::Display) -> Self {
        Self::Error {
            error: error.to_string(),
        }
    }

    /// The session this message belongs to, if any.
    pub fn session_id(&self) -> Option<&str> {
        match self {
            Self::TextUpdate { id, .. } | Self::DeathNotice { id } => Some(id),
            Self::Error { .. } => None,
        }
    }
}
