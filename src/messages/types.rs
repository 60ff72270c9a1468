use crate::{EngenheiroError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sender {
    User,
    Bot,
}

/// A document handed to the model alongside a prompt.
///
/// Payload bytes are kept base64-encoded, exactly as they go over the wire.
/// Immutable once constructed from a user-selected file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attachment {
    pub mime_type: String,
    /// Base64-encoded file contents
    pub data: String,
    pub name: Option<String>,
}

impl Attachment {
    /// Build an attachment from raw file bytes, validating the MIME type.
    ///
    /// Accepted: `image/*`, `application/pdf`, `text/plain`.
    pub fn from_bytes(mime_type: &str, bytes: &[u8], name: Option<String>) -> Result<Self> {
        if !Self::is_supported(mime_type) {
            return Err(EngenheiroError::UnsupportedAttachment(mime_type.to_string()));
        }

        Ok(Self {
            mime_type: mime_type.to_string(),
            data: BASE64.encode(bytes),
            name,
        })
    }

    pub fn is_supported(mime_type: &str) -> bool {
        mime_type.starts_with("image/")
            || mime_type == "application/pdf"
            || mime_type == "text/plain"
    }
}

/// Which model configuration a generation request should use.
///
/// Deep reasoning and web grounding are mutually exclusive, so this is a
/// tagged choice rather than two independent flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationMode {
    #[default]
    Plain,
    Thinking,
    Search,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender: Sender,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    pub attachments: Vec<Attachment>,
    /// Unresolved placeholder for a bot turn still being generated
    pub is_thinking: bool,
}

impl Message {
    pub fn user(text: impl Into<String>, attachments: Vec<Attachment>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::User,
            text: text.into(),
            timestamp: Utc::now(),
            attachments,
            is_thinking: false,
        }
    }

    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::Bot,
            text: text.into(),
            timestamp: Utc::now(),
            attachments: Vec::new(),
            is_thinking: false,
        }
    }

    /// A pending bot turn, to be resolved in place once generation finishes
    pub fn thinking() -> Self {
        Self {
            id: Uuid::new_v4(),
            sender: Sender::Bot,
            text: String::new(),
            timestamp: Utc::now(),
            attachments: Vec::new(),
            is_thinking: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attachment_accepts_known_types() {
        assert!(Attachment::from_bytes("image/png", b"\x89PNG", None).is_ok());
        assert!(Attachment::from_bytes("image/jpeg", b"\xff\xd8", None).is_ok());
        assert!(Attachment::from_bytes("application/pdf", b"%PDF-1.4", None).is_ok());
        assert!(Attachment::from_bytes("text/plain", b"hello", Some("notas.txt".into())).is_ok());
    }

    #[test]
    fn test_attachment_rejects_unknown_types() {
        let err = Attachment::from_bytes("application/zip", b"PK", None).unwrap_err();
        assert!(matches!(err, EngenheiroError::UnsupportedAttachment(_)));
        assert_eq!(err.user_message(), "Formato não suportado.");
    }

    #[test]
    fn test_attachment_data_is_base64() {
        let att = Attachment::from_bytes("text/plain", b"abc", None).unwrap();
        assert_eq!(att.data, "YWJj");
    }

    #[test]
    fn test_thinking_placeholder() {
        let msg = Message::thinking();
        assert_eq!(msg.sender, Sender::Bot);
        assert!(msg.is_thinking);
        assert!(msg.text.is_empty());
    }
}
