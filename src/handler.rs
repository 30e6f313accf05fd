//! Invocation handler.
//!
//! Turns one raw JSON payload into one transform call and serializes the
//! result. Failures become a `{errorType, errorMessage}` envelope so the
//! caller always gets a JSON body back.

use crate::config::{EmptyReplies, OutputConfig};
use crate::counter::{process_with_clock, Clock};
use crate::models::{InboundPackets, Response};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while handling an invocation.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// The inbound payload is not valid JSON or does not match the schema.
    #[error("malformed payload: {0}")]
    MalformedPayload(#[source] serde_json::Error),

    /// The response could not be encoded.
    #[error("failed to encode response: {0}")]
    Serialize(#[source] serde_json::Error),
}

impl InvocationError {
    /// Error type reported in the failure envelope.
    pub fn error_type(&self) -> &'static str {
        match self {
            InvocationError::MalformedPayload(_) => "MalformedPayload",
            InvocationError::Serialize(_) => "ResponseError",
        }
    }
}

/// Body written in place of a response when an invocation fails.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureEnvelope {
    pub error_type: String,
    pub error_message: String,
}

impl From<&InvocationError> for FailureEnvelope {
    fn from(err: &InvocationError) -> Self {
        Self {
            error_type: err.error_type().to_string(),
            error_message: err.to_string(),
        }
    }
}

impl FailureEnvelope {
    /// Render the envelope as a single JSON line.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                "{{\"errorType\":\"{}\",\"errorMessage\":\"\"}}",
                self.error_type
            )
        })
    }
}

/// Handle one raw invocation payload, returning the serialized response.
///
/// Bytes that are not valid UTF-8 JSON are reported as a malformed payload.
pub fn handle<C: Clock + ?Sized>(
    payload: &[u8],
    clock: &C,
    output: &OutputConfig,
) -> Result<String, InvocationError> {
    let inbound: InboundPackets =
        serde_json::from_slice(payload).map_err(InvocationError::MalformedPayload)?;

    for msg in &inbound.messages {
        debug!("Message tag={} remote={}", msg.tag, msg.remote_address());
    }

    let response = process_with_clock(&inbound, clock);
    encode_response(&response, output)
}

/// Serialize a response, applying the empty-replies policy.
pub fn encode_response(
    response: &Response,
    output: &OutputConfig,
) -> Result<String, InvocationError> {
    let mut value = serde_json::to_value(response).map_err(InvocationError::Serialize)?;

    if response.replies.is_empty() {
        if let Value::Object(ref mut fields) = value {
            match output.empty_replies {
                EmptyReplies::Array => {}
                EmptyReplies::Omit => {
                    fields.remove("Replies");
                }
                EmptyReplies::Null => {
                    fields.insert("Replies".to_string(), Value::Null);
                }
            }
        }
    }

    let encoded = if output.pretty {
        serde_json::to_string_pretty(&value)
    } else {
        serde_json::to_string(&value)
    };
    encoded.map_err(InvocationError::Serialize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::decode_count;
    use crate::counter::transform::tests::fixed_clock;

    const PAYLOAD: &str = r#"{"Messages": [
        {"Tag": "a", "Remote": {"IpAddress": "1.1.1.1"}, "Local": {"Domain": "d", "Port": 1},
         "ReceivedAt": "2024-05-01T12:30:44Z", "Formatter": "raw", "Data": ""},
        {"Tag": "b", "Remote": {"IpAddress": "2.2.2.2"}, "Local": {"Domain": "d", "Port": 1},
         "ReceivedAt": "2024-05-01T12:30:44Z", "Formatter": "raw", "Data": ""},
        {"Tag": "c", "Remote": {"IpAddress": "1.1.1.1"}, "Local": {"Domain": "d", "Port": 1},
         "ReceivedAt": "2024-05-01T12:30:44Z", "Formatter": "raw", "Data": ""}
    ]}"#;

    #[test]
    fn test_handle_payload() {
        let out = handle(PAYLOAD.as_bytes(), &fixed_clock(), &OutputConfig::default()).unwrap();
        let response: Response = serde_json::from_str(&out).unwrap();

        assert_eq!(response.replies.len(), 2);
        assert_eq!(response.replies[0].tag, "a");
        assert_eq!(decode_count(&response.replies[0].data).unwrap(), 2);
        assert_eq!(response.replies[1].tag, "b");
        assert_eq!(decode_count(&response.replies[1].data).unwrap(), 1);
        assert_eq!(response.replies[0].generated_at, "2024-05-01T12:30:45Z");
    }

    #[test]
    fn test_empty_replies_policies() {
        let clock = fixed_clock();
        let payload = r#"{"Messages": []}"#;

        let mut output = OutputConfig::default();
        assert_eq!(handle(payload.as_bytes(), &clock, &output).unwrap(), r#"{"Replies":[]}"#);

        output.empty_replies = EmptyReplies::Omit;
        assert_eq!(handle(payload.as_bytes(), &clock, &output).unwrap(), "{}");

        output.empty_replies = EmptyReplies::Null;
        assert_eq!(handle(payload.as_bytes(), &clock, &output).unwrap(), r#"{"Replies":null}"#);
    }

    #[test]
    fn test_policy_ignored_when_replies_present() {
        let output = OutputConfig {
            pretty: false,
            empty_replies: EmptyReplies::Omit,
        };
        let out = handle(PAYLOAD.as_bytes(), &fixed_clock(), &output).unwrap();
        assert!(out.contains("\"Replies\":["));
    }

    #[test]
    fn test_pretty_output() {
        let output = OutputConfig {
            pretty: true,
            ..OutputConfig::default()
        };
        let out = handle(PAYLOAD.as_bytes(), &fixed_clock(), &output).unwrap();
        assert!(out.contains('\n'));
        assert!(out.contains("\"Replies\""));
    }

    #[test]
    fn test_malformed_payload() {
        let err = handle(b"{not json", &fixed_clock(), &OutputConfig::default()).unwrap_err();
        assert!(matches!(err, InvocationError::MalformedPayload(_)));
        assert_eq!(err.error_type(), "MalformedPayload");

        let err = handle(b"{\"Messages\": [\xff]}", &fixed_clock(), &OutputConfig::default())
            .unwrap_err();
        assert!(matches!(err, InvocationError::MalformedPayload(_)));
    }

    #[test]
    fn test_schema_violation() {
        let payload = r#"{"Messages": [{"Tag": "a", "Remote": {}}]}"#;
        let err = handle(payload.as_bytes(), &fixed_clock(), &OutputConfig::default()).unwrap_err();
        assert!(matches!(err, InvocationError::MalformedPayload(_)));
    }

    #[test]
    fn test_failure_envelope() {
        let err = handle(b"42", &fixed_clock(), &OutputConfig::default()).unwrap_err();
        let envelope = FailureEnvelope::from(&err);
        let json: Value = serde_json::from_str(&envelope.to_json()).unwrap();

        assert_eq!(json["errorType"], "MalformedPayload");
        assert!(json["errorMessage"]
            .as_str()
            .unwrap()
            .starts_with("malformed payload"));
    }
}
