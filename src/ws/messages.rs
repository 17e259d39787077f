//! Inbound WebSocket payload.

use serde::Deserialize;

use crate::error::RelayError;

/// What a client sends to publish on its channel.
///
/// Only `message` is read. Any `chat_id` or `timestamp` the client adds is
/// ignored; the server stamps both.
#[derive(Debug, Clone, Deserialize)]
pub struct InboundMessage {
    /// Text to broadcast.
    pub message: String,
}

impl InboundMessage {
    /// Decodes a JSON frame body.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MalformedPayload`] for anything that is not a
    /// JSON object with a string `message` field.
    pub fn decode(bytes: &[u8]) -> Result<Self, RelayError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn decodes_minimal_payload() {
        let Ok(msg) = InboundMessage::decode(br#"{"message":"hi"}"#) else {
            panic!("valid payload rejected");
        };
        assert_eq!(msg.message, "hi");
    }

    #[test]
    fn ignores_client_channel_and_timestamp() {
        let raw = br#"{"message":"hi","chat_id":"elsewhere","timestamp":1}"#;
        let Ok(msg) = InboundMessage::decode(raw) else {
            panic!("extra fields must be ignored");
        };
        assert_eq!(msg.message, "hi");
    }

    #[test]
    fn rejects_wrong_shapes() {
        let cases: [&[u8]; 5] = [
            b"not json",
            br#"{"msg":"hi"}"#,
            br#"{"message":42}"#,
            br#"["hi"]"#,
            b"\xff\xfe",
        ];
        for raw in cases {
            assert!(matches!(
                InboundMessage::decode(raw),
                Err(RelayError::MalformedPayload(_))
            ));
        }
    }
}
