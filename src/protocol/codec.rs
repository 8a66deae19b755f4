//! Outgoing command encoding.
//!
//! The codec owns the per-session id counter and renders the wire envelope
//! `{id, method, params, sessionId?}`. One codec exists per session; its
//! counter is never shared between exports.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::identifiers::{CommandId, CommandIdGenerator};

// ============================================================================
// Envelope
// ============================================================================

/// Wire envelope for an outgoing command.
#[derive(Debug, Serialize)]
struct Envelope<'a> {
    id: CommandId,
    method: &'a str,
    params: &'a Value,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    session_id: Option<&'a str>,
}

// ============================================================================
// Codec
// ============================================================================

/// Encoder for outgoing commands.
///
/// Each call to [`Codec::encode`] assigns a fresh monotonically increasing
/// id and returns it alongside the serialized frame, so the caller can
/// correlate the eventual result.
#[derive(Debug, Default)]
pub struct Codec {
    ids: CommandIdGenerator,
}

impl Codec {
    /// Creates a codec with a fresh id counter.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Encodes a command to its wire form.
    ///
    /// `session_id` is included only when the command targets an attached
    /// session; plain browser-level commands omit the field entirely.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if serialization fails.
    pub fn encode(
        &self,
        method: &str,
        params: Value,
        session_id: Option<&str>,
    ) -> Result<(CommandId, String)> {
        let id = self.ids.next();
        let text = serde_json::to_string(&Envelope {
            id,
            method,
            params: &params,
            session_id,
        })?;

        Ok((id, text))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_encode_create_target() {
        let codec = Codec::new();
        let (id, text) = codec
            .encode(
                "Target.createTarget",
                json!({"url": "https://example.com"}),
                None,
            )
            .expect("encode");

        assert_eq!(id, CommandId::new(1));

        let value: Value = serde_json::from_str(&text).expect("valid json");
        assert_eq!(value["id"], json!(1));
        assert_eq!(value["method"], json!("Target.createTarget"));
        assert_eq!(value["params"]["url"], json!("https://example.com"));
        assert!(value.get("sessionId").is_none());
    }

    #[test]
    fn test_encode_with_session_id() {
        let codec = Codec::new();
        let (_, text) = codec
            .encode(
                "Page.printToPDF",
                json!({"transferMode": "ReturnAsBase64"}),
                Some("S1"),
            )
            .expect("encode");

        let value: Value = serde_json::from_str(&text).expect("valid json");
        assert_eq!(value["sessionId"], json!("S1"));
    }

    #[test]
    fn test_ids_increase_per_encode() {
        let codec = Codec::new();
        let (a, _) = codec.encode("Target.createTarget", json!({}), None).unwrap();
        let (b, _) = codec.encode("Target.attachToTarget", json!({}), None).unwrap();
        let (c, _) = codec.encode("Page.printToPDF", json!({}), None).unwrap();

        assert_eq!(a.value(), 1);
        assert_eq!(b.value(), 2);
        assert_eq!(c.value(), 3);
    }

    #[test]
    fn test_codecs_do_not_share_counters() {
        let first = Codec::new();
        first.encode("Target.createTarget", json!({}), None).unwrap();

        let second = Codec::new();
        let (id, _) = second.encode("Target.createTarget", json!({}), None).unwrap();
        assert_eq!(id, CommandId::new(1));
    }
}
