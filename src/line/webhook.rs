//! Inbound webhook payloads and signature verification.
//!
//! LINE signs the raw request body with HMAC-SHA256 keyed by the channel
//! secret and sends the base64 digest in `X-Line-Signature`. The body is only
//! parsed once that digest checks out.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::error::RelayError;

pub const SIGNATURE_HEADER: &str = "x-line-signature";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Deserialize)]
pub struct WebhookBody {
    #[serde(default)]
    pub destination: Option<String>,
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: EventType,
    #[serde(default)]
    pub reply_token: Option<String>,
    #[serde(default)]
    pub source: Option<EventSource>,
    #[serde(default)]
    pub message: Option<MessageContent>,
    #[serde(default)]
    pub beacon: Option<Beacon>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    Message,
    Beacon,
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EventSource {
    #[serde(rename_all = "camelCase")]
    User { user_id: String },
    #[serde(rename_all = "camelCase")]
    Group {
        group_id: String,
        #[serde(default)]
        user_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Room {
        room_id: String,
        #[serde(default)]
        user_id: Option<String>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    Text {
        #[serde(default)]
        id: String,
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct Beacon {
    pub hwid: String,
    #[serde(rename = "type")]
    pub kind: BeaconKind,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BeaconKind {
    Enter,
    Leave,
    Banner,
    #[serde(other)]
    Other,
}

/// Compute the base64 signature LINE would send for `body`.
#[cfg(test)]
pub fn sign(channel_secret: &str, body: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(channel_secret.as_bytes())
        .expect("HMAC accepts keys of any length");
    mac.update(body);
    STANDARD.encode(mac.finalize().into_bytes())
}

/// Constant-time check of `signature` against the body digest.
pub fn verify_signature(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(expected) = STANDARD.decode(signature.trim()) else {
        return false;
    };
    let Ok(mut mac) = HmacSha256::new_from_slice(channel_secret.as_bytes()) else {
        return false;
    };
    mac.update(body);
    mac.verify_slice(&expected).is_ok()
}

/// Verify then parse a webhook request body.
pub fn parse_request(
    channel_secret: &str,
    body: &[u8],
    signature: Option<&str>,
) -> Result<WebhookBody, RelayError> {
    match signature {
        Some(sig) if verify_signature(channel_secret, body, sig) => {}
        _ => return Err(RelayError::InvalidSignature),
    }

    serde_json::from_slice(body).map_err(RelayError::Parse)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "channel-secret";

    const BODY: &str = r#"{
        "destination": "Uxxxxxxxx",
        "events": [
            {
                "type": "message",
                "replyToken": "rt-group",
                "timestamp": 1462629479859,
                "source": {"type": "group", "groupId": "C1", "userId": "U1"},
                "message": {"id": "100", "type": "text", "text": "hello"}
            },
            {
                "type": "message",
                "replyToken": "rt-user",
                "source": {"type": "user", "userId": "U2"},
                "message": {"id": "101", "type": "sticker", "packageId": "1", "stickerId": "1"}
            },
            {
                "type": "beacon",
                "replyToken": "rt-beacon",
                "source": {"type": "user", "userId": "U3"},
                "beacon": {"hwid": "d41d8cd98f", "type": "enter"}
            },
            {
                "type": "follow",
                "replyToken": "rt-follow",
                "source": {"type": "room", "roomId": "R1"}
            }
        ]
    }"#;

    #[test]
    fn test_sign_and_verify() {
        let signature = sign(SECRET, BODY.as_bytes());
        assert!(verify_signature(SECRET, BODY.as_bytes(), &signature));
        assert!(!verify_signature("other-secret", BODY.as_bytes(), &signature));
        assert!(!verify_signature(SECRET, b"tampered", &signature));
    }

    #[test]
    fn test_garbage_signature_is_rejected() {
        assert!(!verify_signature(SECRET, BODY.as_bytes(), "not base64!!"));
        assert!(!verify_signature(SECRET, BODY.as_bytes(), ""));
    }

    #[test]
    fn test_parse_event_batch() {
        let signature = sign(SECRET, BODY.as_bytes());
        let body = parse_request(SECRET, BODY.as_bytes(), Some(&signature)).unwrap();
        assert_eq!(body.destination.as_deref(), Some("Uxxxxxxxx"));
        let events = body.events;
        assert_eq!(events.len(), 4);

        assert_eq!(events[0].event_type, EventType::Message);
        assert_eq!(
            events[0].source,
            Some(EventSource::Group {
                group_id: "C1".into(),
                user_id: Some("U1".into())
            })
        );
        assert_eq!(
            events[0].message,
            Some(MessageContent::Text {
                id: "100".into(),
                text: "hello".into()
            })
        );

        assert_eq!(events[1].message, Some(MessageContent::Other));

        assert_eq!(events[2].event_type, EventType::Beacon);
        assert_eq!(
            events[2].beacon,
            Some(Beacon {
                hwid: "d41d8cd98f".into(),
                kind: BeaconKind::Enter
            })
        );

        assert_eq!(events[3].event_type, EventType::Other);
        assert!(matches!(events[3].source, Some(EventSource::Room { .. })));
    }

    #[test]
    fn test_missing_signature() {
        let err = parse_request(SECRET, BODY.as_bytes(), None).unwrap_err();
        assert!(matches!(err, RelayError::InvalidSignature));
    }

    #[test]
    fn test_signed_garbage_is_parse_error() {
        let body = b"{not json";
        let signature = sign(SECRET, body);
        let err = parse_request(SECRET, body, Some(&signature)).unwrap_err();
        assert!(matches!(err, RelayError::Parse(_)));
    }
}
