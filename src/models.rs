//! Data models for packet observations and replies.
//!
//! Field names follow the wire format used by the packet relay, which
//! serializes every field in PascalCase.

use serde::{Deserialize, Serialize};

/// Remote endpoint a packet was received from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Remote {
    /// Source address as reported by the relay. Not validated.
    pub ip_address: String,
}

/// Local endpoint a packet was received on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Local {
    pub domain: String,
    pub port: i64,
}

/// A single inbound packet observation.
///
/// Only `tag` and `remote` take part in tallying; the remaining fields are
/// part of the relay's message format, default to empty when absent, and
/// are carried untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InboundMessage {
    /// Opaque correlation tag, echoed back on the reply.
    pub tag: String,
    pub remote: Remote,
    #[serde(default)]
    pub local: Local,
    #[serde(default)]
    pub received_at: String,
    #[serde(default)]
    pub formatter: String,
    /// Opaque packet payload.
    #[serde(default)]
    pub data: String,
}

impl InboundMessage {
    /// Address the observation is tallied under.
    pub fn remote_address(&self) -> &str {
        &self.remote.ip_address
    }
}

/// One invocation's worth of inbound messages, in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InboundPackets {
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
}

/// A reply carrying the encoded packet count for one remote address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct OutboundPacket {
    /// RFC3339 UTC timestamp taken when the reply was built.
    pub generated_at: String,
    pub tag: String,
    /// Base64 of the decimal count followed by a newline.
    pub data: String,
}

/// Result of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Response {
    /// `null` and a missing field both read back as no replies.
    #[serde(default, deserialize_with = "nullable_vec")]
    pub replies: Vec<OutboundPacket>,
}

fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_inbound_payload() {
        let payload = r#"{
            "Messages": [{
                "Tag": "t-1",
                "Remote": {"IpAddress": "203.0.113.7"},
                "Local": {"Domain": "counter.example.com", "Port": 9000},
                "ReceivedAt": "2024-05-01T12:00:00Z",
                "Formatter": "raw",
                "Data": "cGFja2V0XzE="
            }]
        }"#;

        let inbound: InboundPackets = serde_json::from_str(payload).unwrap();
        assert_eq!(inbound.messages.len(), 1);

        let msg = &inbound.messages[0];
        assert_eq!(msg.tag, "t-1");
        assert_eq!(msg.remote_address(), "203.0.113.7");
        assert_eq!(msg.local.domain, "counter.example.com");
        assert_eq!(msg.local.port, 9000);
        assert_eq!(msg.formatter, "raw");
    }

    #[test]
    fn test_missing_messages_is_empty_batch() {
        let inbound: InboundPackets = serde_json::from_str("{}").unwrap();
        assert!(inbound.messages.is_empty());
    }

    #[test]
    fn test_passthrough_fields_are_optional() {
        let payload = r#"{"Messages": [{"Tag": "a", "Remote": {"IpAddress": "1.1.1.1"}}]}"#;

        let inbound: InboundPackets = serde_json::from_str(payload).unwrap();
        let msg = &inbound.messages[0];
        assert_eq!(msg.tag, "a");
        assert_eq!(msg.remote_address(), "1.1.1.1");
        assert_eq!(msg.local, Local::default());
        assert!(msg.received_at.is_empty());
        assert!(msg.formatter.is_empty());
        assert!(msg.data.is_empty());
    }

    #[test]
    fn test_missing_remote_is_rejected() {
        let payload = r#"{"Messages": [{"Tag": "t"}]}"#;
        assert!(serde_json::from_str::<InboundPackets>(payload).is_err());
    }

    #[test]
    fn test_reply_field_names() {
        let response = Response {
            replies: vec![OutboundPacket {
                generated_at: "2024-05-01T12:00:00Z".to_string(),
                tag: "t-1".to_string(),
                data: "MQo=".to_string(),
            }],
        };

        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"Replies\""));
        assert!(json.contains("\"GeneratedAt\""));
        assert!(json.contains("\"Tag\":\"t-1\""));
        assert!(json.contains("\"Data\":\"MQo=\""));
    }

    #[test]
    fn test_null_replies_read_as_empty() {
        let response: Response = serde_json::from_str(r#"{"Replies": null}"#).unwrap();
        assert!(response.replies.is_empty());

        let response: Response = serde_json::from_str("{}").unwrap();
        assert!(response.replies.is_empty());
    }
}
