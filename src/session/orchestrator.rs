//! Handshake state machine.
//!
//! One orchestrator per export. The machine advances one state per
//! correlated inbound frame; frames are dispatched by content (id for
//! results, method for events), never by arrival order, so a result that
//! overtakes the event it races with is buffered instead of misread.
//!
//! Terminal behavior: the orchestrator only produces the decoded bytes or
//! a classified error; closing the channel and terminating the process is
//! the facade's job and happens unconditionally around this call.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{Value, json};
use tracing::{debug, info, trace};

use crate::error::{Error, Result};
use crate::identifiers::CommandId;
use crate::protocol::{Codec, Frame};
use crate::session::state::SessionState;
use crate::transport::MessageChannel;

// ============================================================================
// Constants
// ============================================================================

const CREATE_TARGET: &str = "Target.createTarget";
const ATTACH_TO_TARGET: &str = "Target.attachToTarget";
const ATTACHED_TO_TARGET: &str = "Target.attachedToTarget";
const PRINT_TO_PDF: &str = "Page.printToPDF";

// ============================================================================
// State
// ============================================================================

/// Handshake states, advanced in strict order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    CreatingTarget,
    AttachingTarget,
    AwaitingAttachResult { attach_id: CommandId },
    Printing,
    Done,
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Runs the export handshake over one control channel.
///
/// Owns the codec (and with it the id counter), the write-once
/// [`SessionState`], and the dispatch buffers. Nothing here is shared
/// between sessions; concurrent exports each build their own instance.
pub struct Orchestrator {
    codec: Codec,
    state: SessionState,
    frame_deadline: Duration,
    /// Ids sent but not yet resolved.
    pending: FxHashSet<CommandId>,
    /// Results that arrived while something else was awaited.
    buffered_results: FxHashMap<CommandId, Value>,
    /// Events that arrived while a result was awaited.
    buffered_events: VecDeque<(String, Value)>,
}

impl Orchestrator {
    /// Creates an orchestrator with the given per-await deadline.
    #[must_use]
    pub fn new(frame_deadline: Duration) -> Self {
        Self {
            codec: Codec::new(),
            state: SessionState::new(),
            frame_deadline,
            pending: FxHashSet::default(),
            buffered_results: FxHashMap::default(),
            buffered_events: VecDeque::new(),
        }
    }

    /// Drives the handshake to completion and returns the PDF bytes.
    ///
    /// # Errors
    ///
    /// Any classified export error; none are retried. The caller must
    /// close the channel and terminate the process regardless of outcome.
    pub async fn run<C>(mut self, channel: &mut C, url: &str) -> Result<Vec<u8>>
    where
        C: MessageChannel + ?Sized,
    {
        debug!(url, "Starting export handshake");

        let mut state = State::CreatingTarget;
        while state != State::Done {
            state = self.advance(channel, state, url).await?;
        }

        let payload = self
            .state
            .pdf_base64()
            .ok_or_else(|| Error::protocol_violation("handshake finished without a payload"))?;

        let bytes = BASE64
            .decode(payload)
            .map_err(|e| Error::invalid_payload(format!("payload is not valid base64: {e}")))?;

        info!(bytes = bytes.len(), "Export handshake completed");
        Ok(bytes)
    }

    /// One state transition: send on entry, await the classified frame the
    /// state expects, record its extraction.
    async fn advance<C>(&mut self, channel: &mut C, state: State, url: &str) -> Result<State>
    where
        C: MessageChannel + ?Sized,
    {
        match state {
            State::CreatingTarget => {
                let id = self
                    .send(channel, CREATE_TARGET, json!({ "url": url }), None)
                    .await?;
                let result = self.await_result(channel, id).await?;
                let target_id = require_str(&result, "targetId", CREATE_TARGET)?;
                debug!(%target_id, "Target created");
                self.state.set_target_id(target_id)?;
                Ok(State::AttachingTarget)
            }

            State::AttachingTarget => {
                let target_id = self
                    .state
                    .target_id()
                    .ok_or_else(|| Error::protocol_violation("attaching without a target id"))?
                    .to_owned();
                let attach_id = self
                    .send(
                        channel,
                        ATTACH_TO_TARGET,
                        json!({ "targetId": target_id }),
                        None,
                    )
                    .await?;
                let params = self.await_event(channel, ATTACHED_TO_TARGET).await?;
                trace!(%params, "Attach event received");
                Ok(State::AwaitingAttachResult { attach_id })
            }

            State::AwaitingAttachResult { attach_id } => {
                let result = self.await_result(channel, attach_id).await?;
                let session_id = require_str(&result, "sessionId", ATTACH_TO_TARGET)?;
                debug!(%session_id, "Session attached");
                self.state.set_session_id(session_id)?;
                Ok(State::Printing)
            }

            State::Printing => {
                let session_id = self
                    .state
                    .session_id()
                    .ok_or_else(|| Error::protocol_violation("printing without a session id"))?
                    .to_owned();
                let id = self
                    .send(
                        channel,
                        PRINT_TO_PDF,
                        json!({ "transferMode": "ReturnAsBase64" }),
                        Some(&session_id),
                    )
                    .await?;
                let result = self.await_result(channel, id).await?;
                let payload = require_str(&result, "data", PRINT_TO_PDF)?;
                self.state.set_pdf_base64(payload)?;
                Ok(State::Done)
            }

            State::Done => Ok(State::Done),
        }
    }

    /// Encodes and sends one command, registering its id as pending.
    async fn send<C>(
        &mut self,
        channel: &mut C,
        method: &str,
        params: Value,
        session_id: Option<&str>,
    ) -> Result<CommandId>
    where
        C: MessageChannel + ?Sized,
    {
        let (id, text) = self.codec.encode(method, params, session_id)?;
        channel.send(text).await?;
        self.pending.insert(id);
        trace!(%id, method, "Command sent");
        Ok(id)
    }

    /// Awaits the result correlated to `id`, buffering events and results
    /// for other pending commands seen on the way.
    async fn await_result<C>(&mut self, channel: &mut C, id: CommandId) -> Result<Value>
    where
        C: MessageChannel + ?Sized,
    {
        loop {
            if let Some(result) = self.buffered_results.remove(&id) {
                self.pending.remove(&id);
                return Ok(result);
            }

            match self.next_frame(channel).await? {
                Frame::CommandResult { id: got, result } => self.accept_result(got, result)?,
                Frame::CommandError {
                    id: got,
                    code,
                    message,
                } => return Err(self.reject(got, code, message)),
                Frame::Event { method, params, .. } => {
                    trace!(%method, "Event buffered while awaiting result");
                    self.buffered_events.push_back((method, params));
                }
            }
        }
    }

    /// Awaits an event with the expected method, buffering results for
    /// pending commands seen on the way.
    async fn await_event<C>(&mut self, channel: &mut C, expected: &str) -> Result<Value>
    where
        C: MessageChannel + ?Sized,
    {
        loop {
            if let Some((method, params)) = self.buffered_events.pop_front() {
                return check_event(expected, &method, params);
            }

            match self.next_frame(channel).await? {
                Frame::Event { method, params, .. } => {
                    return check_event(expected, &method, params);
                }
                Frame::CommandResult { id, result } => self.accept_result(id, result)?,
                Frame::CommandError { id, code, message } => {
                    return Err(self.reject(id, code, message));
                }
            }
        }
    }

    /// Reads and classifies the next inbound frame.
    async fn next_frame<C>(&mut self, channel: &mut C) -> Result<Frame>
    where
        C: MessageChannel + ?Sized,
    {
        let text = channel.next_message(self.frame_deadline).await?;
        Frame::decode(&text)
    }

    /// Buffers a result for a pending command; anything else is a violation.
    fn accept_result(&mut self, id: CommandId, result: Value) -> Result<()> {
        if !self.pending.contains(&id) {
            return Err(Error::protocol_violation(format!(
                "result for unknown command id {id}"
            )));
        }
        self.buffered_results.insert(id, result);
        Ok(())
    }

    /// Converts a browser error frame into the session's fatal error.
    fn reject(&mut self, id: CommandId, code: i64, message: String) -> Error {
        if self.pending.remove(&id) {
            Error::command_failed(code, message)
        } else {
            Error::protocol_violation(format!("error for unknown command id {id}"))
        }
    }
}

/// Consumes an event, insisting on the awaited method.
fn check_event(expected: &str, method: &str, params: Value) -> Result<Value> {
    if method == expected {
        Ok(params)
    } else {
        Err(Error::protocol_violation(format!(
            "unexpected event {method} while awaiting {expected}"
        )))
    }
}

/// Extracts a mandatory string field from a command result.
fn require_str(result: &Value, key: &str, method: &str) -> Result<String> {
    result
        .get(key)
        .and_then(Value::as_str)
        .map(str::to_owned)
        .ok_or_else(|| Error::protocol_violation(format!("{method} result missing {key}")))
}

// ============================================================================
// Tests
// ============================================================================
