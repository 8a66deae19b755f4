//! Incoming frame classification.
//!
//! Every inbound payload is classified into exactly one [`Frame`] variant
//! before the orchestrator acts on it. Classification is by content:
//!
//! | Carries | Classified as |
//! |---------|---------------|
//! | `result` | [`Frame::CommandResult`] |
//! | `error` | [`Frame::CommandError`] |
//! | `method` (neither of the above) | [`Frame::Event`] |
//! | none of the above | `UnrecognizedFrame` failure |
//!
//! Payloads that are not JSON objects fail as `MalformedFrame`; both
//! failures carry the raw payload for diagnosis.

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::CommandId;

// ============================================================================
// Frame
// ============================================================================

/// One classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Successful result for a previously sent command.
    CommandResult {
        /// Id of the command this result answers.
        id: CommandId,
        /// Result object, shape depends on the command.
        result: Value,
    },

    /// Browser-reported failure for a previously sent command.
    CommandError {
        /// Id of the command this error answers.
        id: CommandId,
        /// Error code from the browser.
        code: i64,
        /// Error message from the browser.
        message: String,
    },

    /// Asynchronous notification, not correlated to a command id.
    Event {
        /// Event name, e.g. `Target.attachedToTarget`.
        method: String,
        /// Event parameters.
        params: Value,
        /// Session the event belongs to, if any.
        session_id: Option<String>,
    },
}

impl Frame {
    /// Decodes and classifies one inbound payload.
    ///
    /// # Errors
    ///
    /// - [`Error::MalformedFrame`] if the payload is not a JSON object, or
    ///   a result/error frame lacks a usable integer `id`
    /// - [`Error::UnrecognizedFrame`] if the object matches no frame shape
    pub fn decode(payload: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(payload)
            .map_err(|_| Error::malformed_frame(payload))?;

        let object = value
            .as_object()
            .ok_or_else(|| Error::malformed_frame(payload))?;

        if let Some(result) = object.get("result") {
            let id = Self::require_id(object, payload)?;
            return Ok(Self::CommandResult {
                id,
                result: result.clone(),
            });
        }

        if let Some(error) = object.get("error") {
            let id = Self::require_id(object, payload)?;
            let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown error")
                .to_owned();
            return Ok(Self::CommandError { id, code, message });
        }

        if let Some(method) = object.get("method").and_then(Value::as_str) {
            let params = object.get("params").cloned().unwrap_or(Value::Null);
            let session_id = object
                .get("sessionId")
                .and_then(Value::as_str)
                .map(str::to_owned);
            return Ok(Self::Event {
                method: method.to_owned(),
                params,
                session_id,
            });
        }

        Err(Error::unrecognized_frame(payload))
    }

    /// Extracts the mandatory correlation id of a result/error frame.
    fn require_id(object: &serde_json::Map<String, Value>, payload: &str) -> Result<CommandId> {
        object
            .get("id")
            .and_then(Value::as_u64)
            .map(CommandId::new)
            .ok_or_else(|| Error::malformed_frame(payload))
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
    fn test_decode_command_result() {
        let frame = Frame::decode(r#"{"id":1,"result":{"targetId":"T1"}}"#).expect("decode");

        assert_eq!(
            frame,
            Frame::CommandResult {
                id: CommandId::new(1),
                result: json!({"targetId": "T1"}),
            }
        );
    }

    #[test]
    fn test_decode_command_error() {
        let frame = Frame::decode(r#"{"id":2,"error":{"code":-32000,"message":"Target closed"}}"#)
            .expect("decode");

        assert_eq!(
            frame,
            Frame::CommandError {
                id: CommandId::new(2),
                code: -32000,
                message: "Target closed".to_owned(),
            }
        );
    }

    #[test]
    fn test_decode_event() {
        let payload = r#"{"method":"Target.attachedToTarget","params":{"sessionId":"S1"},"sessionId":"S1"}"#;
        let frame = Frame::decode(payload).expect("decode");

        assert_eq!(
            frame,
            Frame::Event {
                method: "Target.attachedToTarget".to_owned(),
                params: json!({"sessionId": "S1"}),
                session_id: Some("S1".to_owned()),
            }
        );
    }

    #[test]
    fn test_event_without_session_id() {
        let frame = Frame::decode(r#"{"method":"Page.loadEventFired","params":{}}"#)
            .expect("decode");

        assert!(matches!(frame, Frame::Event { session_id: None, .. }));
    }

    #[test]
    fn test_result_wins_over_method_key() {
        // A frame carrying both `result` and `method` is a result.
        let frame = Frame::decode(r#"{"id":3,"method":"noise","result":{}}"#).expect("decode");
        assert!(matches!(frame, Frame::CommandResult { .. }));
    }

    #[test]
    fn test_not_json_is_malformed() {
        let err = Frame::decode("DevTools says hi").unwrap_err();
        assert!(matches!(err, Error::MalformedFrame { payload } if payload == "DevTools says hi"));
    }

    #[test]
    fn test_non_object_is_malformed() {
        let err = Frame::decode("[1,2,3]").unwrap_err();
        assert!(matches!(err, Error::MalformedFrame { .. }));
    }

    #[test]
    fn test_result_without_id_is_malformed() {
        let err = Frame::decode(r#"{"result":{}}"#).unwrap_err();
        assert!(matches!(err, Error::MalformedFrame { .. }));
    }

    #[test]
    fn test_unknown_shape_is_unrecognized() {
        let err = Frame::decode(r#"{"id":9,"status":"ok"}"#).unwrap_err();
        assert!(matches!(err, Error::UnrecognizedFrame { .. }));
    }
}
